//! Session Guard Console
//!
//! Line-oriented driver for a `SessionGuard` backed by the in-memory
//! identity provider. Uses `anyhow` for startup errors only; guard errors
//! are printed and the loop continues.

mod settings;

use std::sync::Arc;
use std::time::Duration;

use platform::clock::{Clock, SystemClock};
use platform::storage::{FileStore, KeyValueStore, MemoryStore};
use session_guard::{
    ActivityKind, GuardState, KvGuardStore, MemoryIdentityProvider, SessionGuard, SignUpInput,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

type Guard = SessionGuard<MemoryIdentityProvider, KvGuardStore>;

const HELP: &str = "\
commands:
  signin <email> <password>
  signup <email> <password> [display name]
  signout
  activity <kind>     (pointer_down, key_down, form_input, ...)
  extend
  status
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "console=info,session_guard=info,platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &settings.profile_dir {
        Some(dir) => {
            let store = FileStore::open(dir)?;
            tracing::info!(profile_dir = %store.root().display(), "Using file-backed profile");
            Arc::new(store)
        }
        None => {
            tracing::info!("Using in-memory profile");
            Arc::new(MemoryStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let provider = Arc::new(MemoryIdentityProvider::new(clock.clone()));
    for (email, password) in &settings.demo_accounts {
        let user = provider.add_account(email, password);
        tracing::info!(email = %user.email, "Demo account registered");
    }

    let guard = Arc::new(SessionGuard::new(
        provider,
        Arc::new(KvGuardStore::new(store)),
        clock,
        settings.guard,
    ));
    guard.start();
    print_state(&guard.state());

    let watcher = tokio::spawn(watch_warning(guard.clone()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match command {
            "signin" => match (words.next(), words.next()) {
                (Some(email), Some(password)) => match guard.sign_in(email, password).await {
                    Ok(session) => println!("signed in as {}", session.user.email),
                    Err(e) => println!("sign-in failed: {e}"),
                },
                _ => println!("usage: signin <email> <password>"),
            },
            "signup" => match (words.next(), words.next()) {
                (Some(email), Some(password)) => {
                    let display_name = words.collect::<Vec<_>>().join(" ");
                    let input = SignUpInput {
                        email: email.to_string(),
                        password: password.to_string(),
                        display_name: (!display_name.is_empty()).then_some(display_name),
                    };
                    match guard.sign_up(input).await {
                        Ok(Some(session)) => println!("registered {}", session.user.email),
                        Ok(None) => println!("registered, confirmation pending"),
                        Err(e) => println!("sign-up failed: {e}"),
                    }
                }
                _ => println!("usage: signup <email> <password> [display name]"),
            },
            "signout" => {
                if let Err(e) = guard.sign_out().await {
                    println!("sign-out failed: {e}");
                }
            }
            "activity" => match words.next().and_then(ActivityKind::from_code) {
                Some(kind) => guard.record_activity(kind),
                None => {
                    let codes: Vec<_> = ActivityKind::ALL.iter().map(|k| k.code()).collect();
                    println!("known kinds: {}", codes.join(", "));
                }
            },
            "extend" => guard.extend_session(),
            "status" => print_state(&guard.state()),
            "quit" | "exit" => break,
            _ => println!("{HELP}"),
        }
    }

    watcher.abort();
    guard.shutdown();
    tracing::info!("Console closed");
    Ok(())
}

/// Announce the warning and the lockout as they start and end
async fn watch_warning(guard: Arc<Guard>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut last = guard.state();
    loop {
        interval.tick().await;
        let state = guard.state();

        if state.show_timeout_warning && !last.show_timeout_warning {
            println!(
                "session expires in {}s without activity, type `extend` to stay signed in",
                state.timeout_remaining
            );
        }
        if state.is_locked && !last.is_locked {
            println!(
                "locked out for {}",
                Guard::format_lockout_time(state.lockout_time_remaining)
            );
        }
        if !state.is_locked && last.is_locked {
            println!("lockout over");
        }
        if state.session.is_none() && last.session.is_some() {
            println!("signed out");
        }
        last = state;
    }
}

fn print_state(state: &GuardState) {
    match serde_json::to_string_pretty(state) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to render state"),
    }
}
