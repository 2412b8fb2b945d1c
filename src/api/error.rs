//! Error types for calls against the enMedD AI admin API

use std::fmt;

use serde::Deserialize;

/// Errors that can occur when talking to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401 Unauthorized - session or API key invalid or expired
    Unauthorized { message: String },
    /// 403 Forbidden - caller is not an admin
    Forbidden { message: String },
    /// Any other non-success status, with the server-provided message
    HttpError { status: u16, message: String },
    /// Network or timeout error (backend unreachable)
    NetworkError { message: String },
    /// Response body could not be decoded into the expected shape
    DecodeError { message: String },
    /// The caller cancelled the operation before the response was applied
    Cancelled,
}

/// Error body shape used by the backend: `{"detail": ...}` or `{"message": ...}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success status and its raw response body.
    ///
    /// The `detail` field wins over `message`; a non-JSON body is used as-is,
    /// and an empty body falls back to the status reason phrase.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = Self::extract_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        match status {
            401 => ApiError::Unauthorized { message },
            403 => ApiError::Forbidden { message },
            _ => ApiError::HttpError { status, message },
        }
    }

    fn extract_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail {
            Some(serde_json::Value::String(detail)) => return Some(detail),
            // FastAPI validation errors arrive as a list of {loc, msg, type}
            Some(serde_json::Value::Array(items)) if !items.is_empty() => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(str::to_string)
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            Some(other) if !other.is_null() => return Some(other.to_string()),
            _ => {}
        }
        parsed.message
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::DecodeError {
            message: message.into(),
        }
    }

    /// Create an HTTP error with an explicit status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            status,
            message: message.into(),
        }
    }

    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. }
        )
    }

    /// Check if the backend could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::NetworkError { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message shown to the admin user, verbatim from the server when available
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::HttpError { message, .. } => message.clone(),
            ApiError::NetworkError { message } => format!("Unable to reach server: {message}"),
            ApiError::DecodeError { message } => format!("Unexpected response: {message}"),
            ApiError::Cancelled => "Request cancelled".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { message } => {
                write!(f, "Unauthorized (401) - {message}")
            }
            ApiError::Forbidden { message } => {
                write!(f, "Forbidden (403) - {message}")
            }
            ApiError::HttpError { status, message } => {
                write!(f, "HTTP {status} - {message}")
            }
            ApiError::NetworkError { message } => {
                write!(f, "Network error - {message}")
            }
            ApiError::DecodeError { message } => {
                write!(f, "Decode error - {message}")
            }
            ApiError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::decode(err.to_string())
        } else {
            ApiError::network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_surfaced_verbatim() {
        let err = ApiError::from_response(400, r#"{"detail": "Document set name already exists"}"#);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "Document set name already exists");
    }

    #[test]
    fn test_message_used_when_no_detail() {
        let err = ApiError::from_response(500, r#"{"message": "boom"}"#);
        assert_eq!(err.user_message(), "boom");
    }

    #[test]
    fn test_validation_detail_list_is_joined() {
        let body = r#"{"detail": [{"loc": ["body", "name"], "msg": "field required", "type": "missing"},
                                  {"loc": ["body", "id"], "msg": "not an int", "type": "int"}]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.user_message(), "field required; not an int");
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        let err = ApiError::from_response(502, "Bad gateway from proxy");
        assert_eq!(err.user_message(), "Bad gateway from proxy");

        let err = ApiError::from_response(404, "");
        assert_eq!(err.user_message(), "Not Found");
    }

    #[test]
    fn test_auth_statuses() {
        assert!(ApiError::from_response(401, "").is_auth_error());
        assert!(ApiError::from_response(403, r#"{"detail": "admin only"}"#).is_auth_error());
        assert!(!ApiError::from_response(400, "").is_auth_error());
        assert!(!ApiError::network("timeout").is_auth_error());
    }

    #[test]
    fn test_display() {
        let err = ApiError::http(409, "conflict");
        assert_eq!(err.to_string(), "HTTP 409 - conflict");
        assert_eq!(ApiError::Cancelled.to_string(), "Cancelled");
        assert!(ApiError::network("refused").is_unreachable());
    }
}
