//! Admin API auth endpoint paths
//!
//! Paths are relative to the configured API base URL. The refresh cookie
//! issued by the login endpoint is scoped to `REFRESH_PATH`, so the refresh
//! call must hit exactly this path for the cookie jar to attach it.

/// Username/password login, returns an access token and sets the refresh cookie
pub const LOGIN_PATH: &str = "/auth/login";

/// Exchanges the refresh cookie for a new access token
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Deletes the refresh cookie server-side
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Authorization scheme prefix for access tokens
pub const BEARER_PREFIX: &str = "Bearer ";

/// Join a base URL and an absolute endpoint path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
