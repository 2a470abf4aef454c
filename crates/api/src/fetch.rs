//! Request helper shared by the Attendance API calls

use crate::error::{ApiError, Result};
use log::{debug, trace};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// Helper for building and executing a single API request
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a request for `path` (slash separated) below `base`
    pub fn new(client: &'a Client, base: &Url, path: &str, method: Method) -> Result<Self> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            url,
            method,
            headers,
            body: None,
        })
    }

    /// Add bearer token authentication when a token is present
    pub fn bearer_auth(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                self.headers.insert(AUTHORIZATION, value);
            }
        }
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Execute the request and parse a successful response as JSON
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T> {
        debug!("{} {}", self.method, self.url);

        let mut req = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers);
        if let Some(body) = self.body {
            req = req.body(body);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            debug!("{} {} failed with status {}", self.method, self.url, status);
            return Err(ApiError::from_response(status.as_u16(), text));
        }

        let bytes = response.bytes().await?;
        trace!("{} {} returned {} bytes", self.method, self.url, bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Helper for creating API requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(client: &'a Client, base: &Url, path: &str) -> Result<FetchBuilder<'a>> {
        FetchBuilder::new(client, base, path, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(client: &'a Client, base: &Url, path: &str) -> Result<FetchBuilder<'a>> {
        FetchBuilder::new(client, base, path, Method::POST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_appended_to_base_path() {
        let client = Client::new();
        let base = Url::parse("https://example.com/api/").unwrap();
        let fetch = Fetch::post(&client, &base, "attendance/clock-out").unwrap();
        assert_eq!(fetch.url.as_str(), "https://example.com/api/attendance/clock-out");
    }

    #[test]
    fn base_without_trailing_slash() {
        let client = Client::new();
        let base = Url::parse("https://example.com/api").unwrap();
        let fetch = Fetch::get(&client, &base, "attendance").unwrap();
        assert_eq!(fetch.url.as_str(), "https://example.com/api/attendance");
    }

    #[test]
    fn bearer_header_only_with_token() {
        let client = Client::new();
        let base = Url::parse("https://example.com").unwrap();
        let without = Fetch::get(&client, &base, "attendance").unwrap().bearer_auth(None);
        assert!(without.headers.get(AUTHORIZATION).is_none());

        let with = Fetch::get(&client, &base, "attendance")
            .unwrap()
            .bearer_auth(Some("abc"));
        assert_eq!(with.headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }
}
