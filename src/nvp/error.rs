//! Error types for the NVP client.

use thiserror::Error;

/// Error returned by [`Client::send`](super::Client::send) and the
/// transports.
///
/// Business-level rejections (`ACK=Failure`) are not errors at this layer;
/// they come back as a regular [`Response`](super::Response).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the API request was not successful (status: {status}): {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode NVP response: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),

    #[error("no credentials registered for key '{0}'")]
    UnknownCredentials(String),

    #[error("no credentials key given and no default credentials configured")]
    MissingCredentials,
}

impl ClientError {
    /// Whether the failure happened on the wire (non-200 status, connection
    /// or TLS error, timeout) rather than while preparing the call.
    pub fn is_communication(&self) -> bool {
        matches!(self, ClientError::Status { .. } | ClientError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_is_communication() {
        let err = ClientError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert!(err.is_communication());
        assert_eq!(
            err.to_string(),
            "the API request was not successful (status: 503): busy"
        );
    }

    #[test]
    fn credential_errors_are_not_communication() {
        assert!(!ClientError::MissingCredentials.is_communication());
        assert!(!ClientError::UnknownCredentials("shop-1".to_string()).is_communication());
    }
}
