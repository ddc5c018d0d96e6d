//! Error types for the authenticated client

use std::sync::Arc;

/// Errors surfaced to callers of `AuthClient` and `AdminApi`.
///
/// `SessionExpired` is deliberately distinct from `Status`: the former
/// means the refresh endpoint refused to renew the session, the latter
/// means the request itself failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("stored access credential is not a valid header value")]
    InvalidCredential,

    #[error("session expired: {0}")]
    SessionExpired(Arc<admin_auth::Error>),

    #[error("authentication failed: {0}")]
    Auth(#[source] admin_auth::Error),

    #[error("credential store error: {0}")]
    Store(#[source] admin_auth::Error),

    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller should send the user back to login.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired(_))
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_is_distinguishable_from_status() {
        let expired = Error::SessionExpired(Arc::new(admin_auth::Error::InvalidCredentials(
            "Token has expired".into(),
        )));
        let failed = Error::Status {
            status: 404,
            message: "Category not found or unauthorized".into(),
        };
        assert!(expired.is_session_expired());
        assert!(!failed.is_session_expired());
        assert_eq!(
            failed.to_string(),
            "request failed (404): Category not found or unauthorized"
        );
        assert!(expired.to_string().starts_with("session expired:"));
    }
}
