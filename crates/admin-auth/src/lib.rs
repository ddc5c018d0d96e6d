//! Interview admin authentication library
//!
//! Provides the auth endpoint calls (login, refresh, logout) and the
//! access credential store used by the authenticated client. This crate
//! has no knowledge of the request pipeline; it can be tested and used
//! on its own.
//!
//! Session flow:
//! 1. `token::login()` returns an access token; the server sets the
//!    refresh cookie in the client's `CookieJar`, which may be persisted
//! 2. Access token stored via `CredentialStore::set_access_credential()`
//! 3. On a 401, the client calls `token::refresh()` (cookie carried
//!    implicitly) and stores the new access token
//! 4. `token::logout()` deletes the cookie; `CredentialStore::clear()`
//!    drops the access token

pub mod constants;
pub mod cookies;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use cookies::CookieJar;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreFuture};
pub use error::{Error, Result};
pub use token::{LoginResponse, RefreshResponse, login, logout, refresh};
