//! Authenticated HTTP client
//!
//! Every dispatch reads the current access credential from the injected
//! `CredentialStore` and attaches it as a bearer token. A 401 on the
//! original dispatch triggers one refresh cycle followed by exactly one
//! replay; a 401 on the replay is returned to the caller untouched. Any
//! other status is returned as-is. A failed refresh clears the store and
//! the cookie jar, broadcasts `SessionEvent::Terminated` and surfaces as
//! `Error::SessionExpired`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use admin_auth::{BEARER_PREFIX, CookieJar, CredentialStore, LoginResponse, endpoint};
use common::Secret;
use futures_util::FutureExt;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::refresh::{RefreshCoordinator, RefreshOutcome, RefreshPolicy};
use crate::request::{ApiRequest, Attempt, RequestBody};
use crate::session::{SessionEvent, SessionEvents, TerminationCause};

/// Connection settings for `AuthClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub refresh_policy: RefreshPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

/// HTTP client for the admin API with transparent access-token refresh.
///
/// Cheap to clone; clones share the connection pool, cookie jar,
/// credential store and session event channel.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    cookies: CookieJar,
    events: SessionEvents,
    refresh: RefreshCoordinator,
}

impl AuthClient {
    /// Build a client whose refresh cookie lives in memory only.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_cookie_jar(config, store, CookieJar::in_memory())
    }

    /// Build a client that keeps the refresh cookie in `cookies`.
    ///
    /// The jar holds the refresh credential set by the login endpoint; it
    /// is never read by this crate directly. A file-backed jar is saved
    /// after login and refresh and cleared on logout or refresh failure.
    pub fn with_cookie_jar(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        cookies: CookieJar,
    ) -> Result<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(Error::InvalidInput(format!(
                "base_url must start with http:// or https://, got: {}",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .cookie_provider(cookies.provider())
            .timeout(config.timeout)
            .build()
            .map_err(Error::Transport)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url,
                store,
                cookies,
                events: SessionEvents::new(),
                refresh: RefreshCoordinator::new(config.refresh_policy),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.inner.refresh.policy()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Whether an access credential is currently stored.
    pub async fn is_logged_in(&self) -> bool {
        self.inner.store.access_credential().await.is_some()
    }

    /// Log in and store the issued access credential.
    ///
    /// Goes straight to the login endpoint; a rejected login never
    /// triggers a refresh.
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<LoginResponse> {
        let response = admin_auth::login(
            &self.inner.http,
            &self.inner.base_url,
            username,
            password.expose(),
        )
        .await
        .map_err(Error::Auth)?;

        self.inner
            .store
            .set_access_credential(Secret::new(response.access_token.clone()))
            .await
            .map_err(Error::Store)?;
        self.inner.cookies.persist().await.map_err(Error::Store)?;
        self.inner.events.emit(SessionEvent::Established);
        info!(username, "logged in");
        Ok(response)
    }

    /// End the session locally and ask the server to drop the refresh cookie.
    ///
    /// A failed server-side logout is logged; the local credential is
    /// cleared regardless.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = admin_auth::logout(&self.inner.http, &self.inner.base_url).await {
            warn!(error = %e, "server-side logout failed, clearing local session anyway");
        }
        let cleared = self.inner.store.clear().await.map_err(Error::Store);
        let cookies_cleared = self.inner.cookies.clear().await.map_err(Error::Store);
        self.inner.events.emit(SessionEvent::Terminated {
            cause: TerminationCause::LoggedOut,
        });
        info!("logged out");
        cleared.and(cookies_cleared)
    }

    /// Send a request, recovering once from an expired access credential.
    ///
    /// Returns the final response for any status, including a 401 that
    /// survived the replay. Transport failures and refresh failures are
    /// errors.
    #[instrument(
        skip_all,
        fields(
            request_id = %format!("req_{}", uuid::Uuid::new_v4().as_simple()),
            method = %request.method(),
            path = %request.path(),
        )
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let mut attempt = Attempt::Original;
        let mut refreshed: Option<Secret<String>> = None;
        loop {
            let started = Instant::now();
            let response = self.dispatch(request, refreshed.as_ref()).await?;
            let status = response.status();
            metrics::record_response(status.as_u16(), attempt, started.elapsed().as_secs_f64());

            if status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            match attempt.next() {
                Some(next) => {
                    debug!("access credential rejected, refreshing");
                    refreshed = Some(self.renew().await.map_err(Error::SessionExpired)?);
                    metrics::record_replay();
                    attempt = next;
                }
                None => {
                    warn!("still unauthorized after refresh, not retrying");
                    return Ok(response);
                }
            }
        }
    }

    /// Build and send one wire request for `request`.
    ///
    /// The stored credential wins; `refreshed` is used when the store has
    /// been emptied since the refresh that produced it.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        refreshed: Option<&Secret<String>>,
    ) -> Result<reqwest::Response> {
        let mut headers = request.headers().clone();
        let credential = match self.inner.store.access_credential().await {
            Some(stored) => Some(stored),
            None => refreshed.cloned(),
        };
        attach_credential(&mut headers, credential.as_ref())?;

        let mut builder = self
            .inner
            .http
            .request(
                request.method().clone(),
                endpoint(&self.inner.base_url, request.path()),
            )
            .headers(headers);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        builder.send().await.map_err(Error::Transport)
    }

    /// Run (or join) a refresh cycle.
    async fn renew(&self) -> RefreshOutcome {
        let cycle = RefreshCycle {
            http: self.inner.http.clone(),
            base_url: self.inner.base_url.clone(),
            store: self.inner.store.clone(),
            cookies: self.inner.cookies.clone(),
            events: self.inner.events.clone(),
        };
        self.inner.refresh.renew(move || cycle.run().boxed()).await
    }
}

/// Set or remove the bearer `Authorization` header.
fn attach_credential(headers: &mut HeaderMap, credential: Option<&Secret<String>>) -> Result<()> {
    match credential {
        Some(token) => {
            let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", token.expose()))
                .map_err(|_| Error::InvalidCredential)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }
    Ok(())
}

/// Everything a refresh cycle touches, owned so the cycle can outlive the
/// request that started it when shared.
struct RefreshCycle {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    cookies: CookieJar,
    events: SessionEvents,
}

impl RefreshCycle {
    async fn run(self) -> RefreshOutcome {
        match self.refresh_and_store().await {
            Ok(credential) => {
                // The server may rotate the refresh cookie.
                if let Err(e) = self.cookies.persist().await {
                    warn!(error = %e, "failed to persist cookie jar");
                }
                metrics::record_refresh("success");
                self.events.emit(SessionEvent::Renewed);
                info!("access credential refreshed");
                Ok(credential)
            }
            Err(e) => {
                metrics::record_refresh("failure");
                warn!(error = %e, "refresh failed, terminating session");
                if let Err(clear_err) = self.store.clear().await {
                    warn!(error = %clear_err, "failed to clear credential store");
                }
                if let Err(clear_err) = self.cookies.clear().await {
                    warn!(error = %clear_err, "failed to clear cookie jar");
                }
                self.events.emit(SessionEvent::Terminated {
                    cause: TerminationCause::RefreshFailed(e.to_string()),
                });
                Err(Arc::new(e))
            }
        }
    }

    async fn refresh_and_store(&self) -> admin_auth::Result<Secret<String>> {
        let response = admin_auth::refresh(&self.http, &self.base_url).await?;
        let credential = Secret::new(response.access_token);
        self.store.set_access_credential(credential.clone()).await?;
        Ok(credential)
    }
}
