//! CLI-specific error types

use thiserror::Error;

/// Errors raised before a command reaches the admin API.
///
/// API and session failures stay as `admin_client::Error` so `main` can
/// tell an expired session apart from everything else.
#[derive(Error, Debug)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),

    #[error("invalid JSON argument: {0}")]
    InvalidJson(String),

    #[error("no password available: set ADMIN_PASSWORD or session.password_file")]
    MissingPassword,

    #[error("no username given and session.username is not set")]
    MissingUsername,
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert_eq!(
            Error::Usage("categories delete <id>".into()).to_string(),
            "usage: categories delete <id>"
        );
        assert!(
            Error::InvalidJson("expected value".into())
                .to_string()
                .contains("expected value")
        );
        assert!(Error::MissingPassword.to_string().contains("ADMIN_PASSWORD"));
        assert!(Error::MissingUsername.to_string().contains("session.username"));
    }
}
