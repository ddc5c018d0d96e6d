//! Interview Admin CLI
//!
//! Single-binary admin front-end that:
//! 1. Loads TOML config (API base URL, session settings)
//! 2. Restores the access token and the refresh cookie from disk
//! 3. Runs one command against the admin API through the authenticated client
//! 4. Prints the result as JSON, or a login hint when the session has expired

mod commands;
mod config;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use admin_auth::{CookieJar, FileCredentialStore};
use admin_client::{AdminApi, AuthClient, SessionEvent, TerminationCause};
use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Cli, USAGE};
use crate::config::Config;

/// Exit status when the session could not be renewed.
const EXIT_SESSION_EXPIRED: u8 = 2;
/// Exit status for malformed command lines (EX_USAGE).
const EXIT_USAGE: u8 = 64;

#[tokio::main]
async fn main() -> ExitCode {
    // JSON logs on stderr keep stdout clean for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(exit_status(&e)),
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse(std::env::args().skip(1))?;

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let token_path = config.token_path();
    let store = FileCredentialStore::load(token_path.clone())
        .await
        .with_context(|| format!("failed to read token file {}", token_path.display()))?;

    let cookie_path = config.cookie_path();
    let cookies = CookieJar::load(cookie_path.clone())
        .await
        .with_context(|| format!("failed to read cookie jar {}", cookie_path.display()))?;

    let client = AuthClient::with_cookie_jar(config.client_config(), Arc::new(store), cookies)
        .context("failed to build HTTP client")?;
    info!(
        base_url = %client.base_url(),
        refresh_policy = ?client.refresh_policy(),
        "client ready"
    );

    let mut events = client.subscribe();
    let api = AdminApi::new(client);
    let result = commands::run(cli.command, &api, &config).await;
    log_session_events(&mut events);

    let output = result?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn log_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Terminated {
                cause: TerminationCause::RefreshFailed(reason),
            } => warn!(%reason, "session terminated"),
            other => info!(event = ?other, "session event"),
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    if err
        .downcast_ref::<admin_client::Error>()
        .is_some_and(admin_client::Error::is_session_expired)
    {
        eprintln!("session expired, run `interview-admin login` again");
        return EXIT_SESSION_EXPIRED;
    }
    if let Some(usage @ crate::error::Error::Usage(_)) = err.downcast_ref::<crate::error::Error>() {
        eprintln!("{usage}\n\n{USAGE}");
        return EXIT_USAGE;
    }
    eprintln!("error: {err:#}");
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_exits_with_login_status() {
        let err = anyhow::Error::new(admin_client::Error::SessionExpired(Arc::new(
            admin_auth::Error::InvalidCredentials("Token has expired".into()),
        )));
        assert_eq!(exit_status(&err), EXIT_SESSION_EXPIRED);
    }

    #[test]
    fn usage_errors_exit_with_usage_status() {
        let err = anyhow::Error::new(crate::error::Error::Usage("missing command".into()));
        assert_eq!(exit_status(&err), EXIT_USAGE);
    }

    #[test]
    fn other_errors_exit_with_failure() {
        let err = anyhow::Error::new(admin_client::Error::Status {
            status: 500,
            message: "boom".into(),
        })
        .context("listing categories");
        assert_eq!(exit_status(&err), 1);
    }

    #[test]
    fn session_events_drain_without_blocking() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.send(SessionEvent::Established).unwrap();
        tx.send(SessionEvent::Terminated {
            cause: TerminationCause::RefreshFailed("Token has expired".into()),
        })
        .unwrap();

        log_session_events(&mut rx);
        assert!(rx.try_recv().is_err());
    }
}
