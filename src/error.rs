//! The single error type handed out by the store client.
//!
//! Store and transport failures, undecodable responses and rejected
//! uploads all end up as a [`CommandError`] so a command handler needs one
//! catch site. Filesystem errors are carried transparently.

use crate::auth::StoreClientError;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    /// Session, auth or transport failure, keeping the original message.
    #[error("{0}")]
    Store(#[from] StoreClientError),

    /// The response body was not the JSON we expected.
    #[error("Could not retrieve json response ({status}) from request")]
    MalformedResponse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// The storage endpoint answered `successful: false`.
    #[error("Server error while pushing file: {payload}")]
    UploadRejected { payload: serde_json::Value },

    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// HTTP status of the failing response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CommandError::Store(err) => err.status(),
            CommandError::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CommandError {
    fn from(err: reqwest::Error) -> Self {
        CommandError::Store(StoreClientError::Network(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_message() {
        let err = CommandError::from(StoreClientError::NotLoggedIn);
        assert_eq!(err.to_string(), StoreClientError::NotLoggedIn.to_string());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_malformed_response_message() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = CommandError::MalformedResponse {
            status: StatusCode::BAD_GATEWAY,
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("502"), "{}", msg);
        assert!(!msg.contains("expected"), "{}", msg);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_upload_rejected_includes_payload() {
        let payload = serde_json::json!({"successful": false, "reason": "quota"});
        let err = CommandError::UploadRejected { payload };
        let msg = err.to_string();
        assert!(msg.starts_with("Server error while pushing file: "));
        assert!(msg.contains("\"reason\":\"quota\""), "{}", msg);
    }

    #[test]
    fn test_io_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = CommandError::from(io);
        assert_eq!(err.to_string(), "no such file");
    }
}
