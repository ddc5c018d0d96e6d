//! Login, refresh and logout calls against the auth endpoints
//!
//! These are bare calls on the shared `reqwest::Client`. They never attach
//! the access token and never go through the authenticated request
//! pipeline, so a failing refresh cannot re-enter the refresh path. The
//! refresh credential itself is an HttpOnly cookie set by the login
//! endpoint; the client's cookie store carries it to `REFRESH_PATH`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, endpoint};
use crate::error::{Error, Result};

/// Response from the login endpoint.
///
/// `refresh_token` is only present on some server versions; the refresh
/// credential normally arrives as a cookie and is never read by the client.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response from the refresh endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Log in with username and password.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<LoginResponse> {
    let response = client
        .post(endpoint(base_url, LOGIN_PATH))
        .json(&LoginRequest { username, password })
        .send()
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let message = error_message(response).await;
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidCredentials(message));
        }
        return Err(Error::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    debug!(username, "login accepted");
    response
        .json::<LoginResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("login response: {e}")))
}

/// Exchange the ambient refresh cookie for a new access token.
///
/// 401 means the cookie is missing or expired, 422 means it failed to
/// decode. Both are reported as `InvalidCredentials`.
pub async fn refresh(client: &reqwest::Client, base_url: &str) -> Result<RefreshResponse> {
    let response = client
        .post(endpoint(base_url, REFRESH_PATH))
        .json(&serde_json::json!({}))
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let message = error_message(response).await;
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(Error::InvalidCredentials(format!(
                "refresh credential rejected ({status}): {message}"
            )));
        }
        return Err(Error::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("refresh response: {e}")))
}

/// Ask the server to delete the refresh cookie.
pub async fn logout(client: &reqwest::Client, base_url: &str) -> Result<()> {
    let response = client
        .post(endpoint(base_url, LOGOUT_PATH))
        .send()
        .await
        .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Rejected {
            status: status.as_u16(),
            message: error_message(response).await,
        });
    }
    Ok(())
}

/// Extract a human-readable message from an error response.
///
/// The admin API answers `{"error": "..."}`; the JWT layer answers
/// `{"msg": "..."}`. Anything else is returned as raw text.
pub async fn error_message(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    message_from_body(&body)
}

/// Pick the `error` or `msg` field out of a JSON error body.
pub fn message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "msg"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_owned))
        })
        .unwrap_or_else(|| body.to_owned())
}
