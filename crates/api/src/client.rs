use crate::error::Result;
use crate::fetch::Fetch;
use crate::models::{
    AttendanceList, AttendanceRecord, ClockOutRequest, ClockOutResponse, MarkAttendanceRequest,
    MarkAttendanceResponse,
};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use url::Url;

/// The remote attendance operations the capture flow depends on.
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Submit an OTP with the caller's coordinates.
    async fn mark(&self, request: &MarkAttendanceRequest) -> Result<MarkAttendanceResponse>;

    /// Confirm presence at the end of a clock-in session.
    async fn clock_out(&self, request: &ClockOutRequest) -> Result<ClockOutResponse>;

    /// The caller's attendance history.
    async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>>;
}

/// HTTP client for the Attendance API
#[derive(Debug, Clone)]
pub struct AttendanceClient {
    base_url: Url,
    token: Option<String>,
    http_client: Client,
}

impl AttendanceClient {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str, http_client: Client) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token: None,
            http_client,
        })
    }

    /// Use `token` as bearer authentication on every request
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl AttendanceApi for AttendanceClient {
    async fn mark(&self, request: &MarkAttendanceRequest) -> Result<MarkAttendanceResponse> {
        info!("Submitting attendance mark");
        Fetch::post(&self.http_client, &self.base_url, "attendance/mark")?
            .bearer_auth(self.token.as_deref())
            .json(request)?
            .execute()
            .await
    }

    async fn clock_out(&self, request: &ClockOutRequest) -> Result<ClockOutResponse> {
        info!("Submitting clock-out");
        Fetch::post(&self.http_client, &self.base_url, "attendance/clock-out")?
            .bearer_auth(self.token.as_deref())
            .json(request)?
            .execute()
            .await
    }

    async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        let list: AttendanceList = Fetch::get(&self.http_client, &self.base_url, "attendance")?
            .bearer_auth(self.token.as_deref())
            .execute()
            .await?;
        Ok(list.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_list_attendance_without_token() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/attendance"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": [{ "timestamp": "2025-01-01T09:00:00Z", "status": "PRESENT" }]
                })))
                .mount(&mock_server)
                .await;

            let client = AttendanceClient::new(&mock_server.uri(), Client::new()).unwrap();
            let records = client.list_attendance().await.unwrap();

            assert_eq!(records.len(), 1);
            assert!(!records[0].is_open_clock_in());
        });
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(AttendanceClient::new("not a url", Client::new()).is_err());
    }
}
