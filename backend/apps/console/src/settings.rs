//! Console Settings
//!
//! Environment-driven overrides on top of the guard configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use session_guard::GuardConfig;

pub struct Settings {
    /// Directory for the file-backed profile store; in-memory when unset
    pub profile_dir: Option<PathBuf>,
    pub guard: GuardConfig,
    /// `(email, password)` pairs seeded into the demo provider
    pub demo_accounts: Vec<(String, String)>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut guard = if cfg!(debug_assertions) {
            GuardConfig::development()
        } else {
            GuardConfig::default()
        };

        if let Some(secs) = parse_var::<u64>("SESSION_TIMEOUT_SECS")? {
            guard.idle.session_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("WARNING_TIMEOUT_SECS")? {
            guard.idle.warning_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32>("MAX_LOGIN_ATTEMPTS")? {
            guard.lockout.max_attempts = attempts.max(1);
        }
        if let Some(secs) = parse_var::<u64>("LOCKOUT_SECS")? {
            guard.lockout.lockout_duration = Duration::from_secs(secs);
        }

        validate(&guard)?;

        let demo_accounts = match env::var("DEMO_ACCOUNTS") {
            Ok(raw) => parse_accounts(&raw)?,
            Err(_) => vec![("demo@example.com".to_string(), "password".to_string())],
        };

        Ok(Self {
            profile_dir: env::var("SESSION_GUARD_PROFILE_DIR").ok().map(PathBuf::from),
            guard,
            demo_accounts,
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a number, got {raw:?}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn validate(guard: &GuardConfig) -> anyhow::Result<()> {
    let idle = &guard.idle;
    anyhow::ensure!(
        idle.warning_timeout < idle.session_timeout,
        "WARNING_TIMEOUT_SECS ({}) must be shorter than SESSION_TIMEOUT_SECS ({})",
        idle.warning_timeout.as_secs(),
        idle.session_timeout.as_secs()
    );
    Ok(())
}

/// `email:password` pairs separated by commas
fn parse_accounts(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (email, password) = entry
                .split_once(':')
                .with_context(|| format!("DEMO_ACCOUNTS entry {entry:?} is not email:password"))?;
            Ok((email.trim().to_string(), password.to_string()))
        })
        .collect()
}
