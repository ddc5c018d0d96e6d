//! Refresh coordination
//!
//! A refresh cycle is: call the refresh endpoint, store the new access
//! credential (or clear the store and terminate the session on failure),
//! and hand the outcome back to the request that hit the 401.
//!
//! `RefreshPolicy::PerRequest` runs one cycle per failing request, so two
//! requests that 401 at the same time each refresh independently.
//! `RefreshPolicy::Coalesced` parks concurrent callers on a single shared
//! in-flight cycle; only one refresh reaches the server and every waiter
//! sees its outcome.

use std::sync::{Arc, Mutex, PoisonError};

use common::Secret;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Deserialize;
use tracing::debug;

/// Outcome of one refresh cycle, shareable across waiters.
pub type RefreshOutcome = std::result::Result<Secret<String>, Arc<admin_auth::Error>>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// How concurrent authentication failures are turned into refresh calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Every failing request refreshes on its own.
    #[default]
    PerRequest,
    /// Concurrent failing requests share one in-flight refresh.
    Coalesced,
}

/// Runs refresh cycles according to a `RefreshPolicy`.
pub struct RefreshCoordinator {
    policy: RefreshPolicy,
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            in_flight: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Obtain a refresh outcome, starting a cycle with `start` if needed.
    ///
    /// Under `Coalesced`, `start` is only invoked when no cycle is in flight.
    pub async fn renew<F>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        match self.policy {
            RefreshPolicy::PerRequest => start().await,
            RefreshPolicy::Coalesced => {
                let cycle = {
                    let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                    match slot.as_ref() {
                        Some(cycle) => {
                            debug!("joining in-flight refresh");
                            cycle.clone()
                        }
                        None => {
                            let cycle = start().shared();
                            *slot = Some(cycle.clone());
                            cycle
                        }
                    }
                };

                let outcome = cycle.clone().await;

                // Whichever waiter finishes first retires the cycle so the
                // next 401 starts a fresh one.
                let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.as_ref().is_some_and(|current| current.ptr_eq(&cycle)) {
                    *slot = None;
                }
                outcome
            }
        }
    }
}
