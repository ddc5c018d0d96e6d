//! Authenticated client for the interview admin API
//!
//! Wraps outbound requests to attach the stored bearer credential and
//! recovers transparently from an expired one: a 401 triggers a single
//! refresh through the auth endpoint followed by a single replay. Session
//! termination is broadcast to subscribers instead of being acted on here.
//!
//! Request lifecycle:
//! 1. Caller builds an `ApiRequest` and calls `AuthClient::send()`
//! 2. Current credential read from the `CredentialStore` and attached
//! 3. Non-401 responses return unchanged
//! 4. First 401 → refresh (per request, or coalesced) → store new token → replay
//! 5. Refresh failure → store cleared, `SessionEvent::Terminated`,
//!    `Error::SessionExpired`
//!
//! `AdminApi` layers the admin resources (categories, criteria, questions,
//! candidates, validity window) on top and maps non-2xx statuses to
//! `Error::Status`.

pub mod api;
pub mod client;
pub mod error;
pub mod metrics;
pub mod refresh;
pub mod request;
pub mod session;

pub use api::{AdminApi, CurrentValidity, ValidityWindow, category_name};
pub use client::{AuthClient, ClientConfig};
pub use error::{Error, Result};
pub use refresh::{RefreshCoordinator, RefreshPolicy};
pub use request::{ApiRequest, Attempt, FilePart, MultipartBody, RequestBody};
pub use session::{SessionEvent, SessionEvents, TerminationCause};
