use serde::Deserialize;
use thiserror::Error;

/// Error returned by every Attendance API call.
///
/// The variants are the discriminant callers switch on: a server that
/// explained itself yields [`ApiError::Rejected`], anything else that came
/// back with a failing status yields [`ApiError::Http`], and failures before
/// a response existed are [`ApiError::Network`].
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server refused the request and said why.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Non-success status without a readable message.
    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },
}

impl ApiError {
    /// Build the error for a failed response from its status and raw body.
    pub fn from_response(status: u16, body: String) -> Self {
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => match parsed.into_message() {
                Some(message) => ApiError::Rejected { status, message },
                None => ApiError::Http { status, body },
            },
            Err(_) => ApiError::Http { status, body },
        }
    }

    /// The message the server attached to its refusal, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Shapes the backend uses for error bodies.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_is_a_rejection() {
        let err = ApiError::from_response(400, r#"{"message":"OTP expired"}"#.to_string());
        assert_eq!(err.server_message(), Some("OTP expired"));
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn error_field_is_a_rejection() {
        let err = ApiError::from_response(403, r#"{"error":"Too far from class"}"#.to_string());
        assert_eq!(err.server_message(), Some("Too far from class"));
    }

    #[test]
    fn plain_text_is_http_failure() {
        let err = ApiError::from_response(502, "Bad Gateway".to_string());
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("expected Http, got {:?}", other),
        }
    }

    #[test]
    fn blank_message_is_http_failure() {
        let err = ApiError::from_response(500, r#"{"message":"  "}"#.to_string());
        assert!(err.server_message().is_none());
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
    }
}
