//! Error types for auth endpoint calls and credential storage

/// Errors from login/refresh/logout calls and credential stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("auth endpoint rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid auth response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
