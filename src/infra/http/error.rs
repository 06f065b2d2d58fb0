use marginalia_api_types::ApiErrorBody;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single API call.
///
/// Cloneable so one failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {message}")]
    Network { message: String, timeout: bool },
    #[error("request rejected with status {status}: {message}")]
    Client { status: u16, message: String },
    #[error("server failed with status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Build an error from a non-success response, preferring the API's own message.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.message.is_empty() => parsed.message,
            _ => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                } else {
                    text
                }
            }
        };

        let code = status.as_u16();
        if status.is_client_error() {
            Self::Client {
                status: code,
                message,
            }
        } else if status.is_server_error() {
            Self::Server {
                status: code,
                message,
            }
        } else {
            Self::decode(format!("unexpected status {code}: {message}"))
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Short label used in logs and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Network { timeout: true, .. } => "timeout",
            Self::Network { .. } => "network",
            Self::Client { .. } => "client",
            Self::Server { .. } => "server",
            Self::Decode { .. } => "decode",
            Self::InvalidUrl(_) => "url",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::decode(err.to_string());
        }
        if err.is_builder() {
            return Self::InvalidUrl(err.to_string());
        }
        Self::Network {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_uses_api_message() {
        let body = br#"{"error":"not_found","message":"Book 9 not found"}"#;
        let err = ApiError::from_status(StatusCode::NOT_FOUND, body);
        assert_eq!(
            err,
            ApiError::Client {
                status: 404,
                message: "Book 9 not found".into()
            }
        );
        assert!(err.is_not_found());
        assert_eq!(err.class(), "client");
    }

    #[test]
    fn server_error_falls_back_to_plain_text() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.status(), Some(502));
        assert!(matches!(err, ApiError::Server { ref message, .. } if message == "upstream down"));
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert!(
            matches!(err, ApiError::Server { ref message, .. } if message == "Internal Server Error")
        );
    }

    #[test]
    fn informational_and_redirect_statuses_are_not_server_errors() {
        let err = ApiError::from_status(StatusCode::FOUND, b"");
        assert_eq!(err.class(), "decode");
        assert_eq!(err.status(), None);
        assert!(matches!(err, ApiError::Decode { ref message } if message == "unexpected status 302: Found"));

        let err = ApiError::from_status(StatusCode::CONTINUE, b"");
        assert_eq!(err.class(), "decode");
    }

    #[test]
    fn timeout_is_labelled_separately() {
        let err = ApiError::Network {
            message: "operation timed out".into(),
            timeout: true,
        };
        assert_eq!(err.class(), "timeout");
        assert_eq!(err.status(), None);
    }
}
