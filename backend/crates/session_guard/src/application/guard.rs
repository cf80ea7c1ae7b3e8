//! Session Guard
//!
//! Composite controller over the login limiter and the idle supervisor.
//! Consumers read `GuardState`; the only state-changing actions are
//! sign-in, sign-up, sign-out, activity reports and "stay signed in".

use std::sync::{Arc, Mutex, MutexGuard};

use platform::clock::Clock;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::application::config::{GuardConfig, LockoutPolicy};
use crate::application::idle_supervisor::IdleSupervisor;
use crate::application::login_limiter::{self, LoginLimiter};
use crate::application::peer_sync::PeerChannel;
use crate::domain::entity::identity::{Session, SignUpInput, User};
use crate::domain::provider::IdentityProvider;
use crate::domain::repository::{LoginAttemptRepository, SessionActivityRepository};
use crate::domain::value_object::activity_kind::ActivityKind;
use crate::error::{GuardError, GuardResult};

/// Read-only view for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardState {
    pub user: Option<User>,
    pub session: Option<Session>,
    /// Initial session not resolved yet
    pub loading: bool,
    pub is_locked: bool,
    /// Seconds
    pub lockout_time_remaining: u64,
    pub show_timeout_warning: bool,
    /// Seconds
    pub timeout_remaining: u64,
}

#[derive(Debug)]
struct IdentityState {
    session: Option<Session>,
    loading: bool,
}

/// Session security controller
pub struct SessionGuard<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: LoginAttemptRepository + SessionActivityRepository + 'static,
{
    provider: Arc<P>,
    limiter: LoginLimiter<R>,
    supervisor: IdleSupervisor<P, R>,
    identity: Arc<Mutex<IdentityState>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<P, R> SessionGuard<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: LoginAttemptRepository + SessionActivityRepository + 'static,
{
    pub fn new(provider: Arc<P>, repo: Arc<R>, clock: Arc<dyn Clock>, config: GuardConfig) -> Self {
        let supervisor =
            IdleSupervisor::new(provider.clone(), repo.clone(), clock.clone(), config.idle);
        Self::assemble(provider, repo, clock, config.lockout, supervisor)
    }

    /// Guard that keeps its idle timers in step with the other guards on `peers`
    pub fn with_peers(
        provider: Arc<P>,
        repo: Arc<R>,
        clock: Arc<dyn Clock>,
        config: GuardConfig,
        peers: &PeerChannel,
    ) -> Self {
        let supervisor = IdleSupervisor::with_peers(
            provider.clone(),
            repo.clone(),
            clock.clone(),
            config.idle,
            peers,
        );
        Self::assemble(provider, repo, clock, config.lockout, supervisor)
    }

    fn assemble(
        provider: Arc<P>,
        repo: Arc<R>,
        clock: Arc<dyn Clock>,
        lockout: LockoutPolicy,
        supervisor: IdleSupervisor<P, R>,
    ) -> Self {
        Self {
            provider,
            limiter: LoginLimiter::new(repo, clock, lockout),
            supervisor,
            identity: Arc::new(Mutex::new(IdentityState {
                session: None,
                loading: true,
            })),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Resolve the current session and start listening for changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut rx = self.provider.subscribe();
        let initial = rx.borrow_and_update().clone();
        self.limiter.check_lockout_status();
        apply_session_change(&self.identity, &self.limiter, &self.supervisor, initial);

        let identity = self.identity.clone();
        let limiter = self.limiter.clone();
        let supervisor = self.supervisor.clone();
        let listener = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                apply_session_change(&identity, &limiter, &supervisor, session);
            }
            tracing::debug!("Identity provider notifications closed");
        });

        let mut tasks = self.lock_tasks();
        tasks.push(listener);
        if let Some(peer_listener) = self.supervisor.spawn_peer_listener() {
            tasks.push(peer_listener);
        }
    }

    /// Sign in, unless the profile is locked out.
    ///
    /// The lockout is checked before the provider is contacted.
    pub async fn sign_in(&self, email: &str, password: &str) -> GuardResult<Session> {
        if self.limiter.check_lockout_status() {
            let err = GuardError::LockedOut {
                minutes_remaining: self.limiter.minutes_remaining(),
            };
            err.log();
            return Err(err);
        }

        match self.provider.sign_in(email, password).await {
            Ok(session) => {
                self.limiter.reset_failed_attempts();
                tracing::info!(user_id = %session.user.id, "User signed in");
                Ok(session)
            }
            Err(e) => {
                self.limiter.record_failed_attempt();
                let err = GuardError::from(e);
                err.log();
                Err(err)
            }
        }
    }

    /// Pass-through registration
    pub async fn sign_up(&self, input: SignUpInput) -> GuardResult<Option<Session>> {
        let session = self.provider.sign_up(&input).await.inspect_err(|e| {
            tracing::debug!(error = %e, "Sign up rejected");
        })?;
        Ok(session)
    }

    /// Voluntary sign-out. Local idle state is cleared even when the
    /// provider call fails.
    pub async fn sign_out(&self) -> GuardResult<()> {
        self.supervisor.end_session();
        self.provider.sign_out().await?;
        tracing::info!("User signed out");
        Ok(())
    }

    /// "Stay signed in"
    pub fn extend_session(&self) {
        self.supervisor.extend_session();
    }

    /// Report one user-input event
    pub fn record_activity(&self, kind: ActivityKind) {
        self.supervisor.record_activity(kind);
    }

    pub fn state(&self) -> GuardState {
        let (session, loading) = {
            let identity = lock_identity(&self.identity);
            (identity.session.clone(), identity.loading)
        };
        let lockout_time_remaining = self.limiter.lockout_time_remaining();

        GuardState {
            user: session.as_ref().map(|s| s.user.clone()),
            session,
            loading,
            is_locked: lockout_time_remaining > 0,
            lockout_time_remaining,
            show_timeout_warning: self.supervisor.show_timeout_warning(),
            timeout_remaining: self.supervisor.timeout_remaining(),
        }
    }

    /// `M:SS` rendering of a lockout countdown
    pub fn format_lockout_time(seconds: u64) -> String {
        login_limiter::format_lockout_time(seconds)
    }

    pub fn limiter(&self) -> &LoginLimiter<R> {
        &self.limiter
    }

    pub fn supervisor(&self) -> &IdleSupervisor<P, R> {
        &self.supervisor
    }

    /// Cancel every timer and listener. Persisted records are kept so a
    /// reloaded guard resumes from them.
    pub fn shutdown(&self) {
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        self.limiter.shutdown();
        self.supervisor.shutdown();
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl<P, R> Drop for SessionGuard<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: LoginAttemptRepository + SessionActivityRepository + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_identity(identity: &Mutex<IdentityState>) -> MutexGuard<'_, IdentityState> {
    identity.lock().unwrap_or_else(|p| p.into_inner())
}

fn apply_session_change<P, R>(
    identity: &Mutex<IdentityState>,
    limiter: &LoginLimiter<R>,
    supervisor: &IdleSupervisor<P, R>,
    session: Option<Session>,
) where
    P: IdentityProvider + Send + Sync + 'static,
    R: LoginAttemptRepository + SessionActivityRepository + 'static,
{
    let mut identity = lock_identity(identity);
    match &session {
        Some(s) => {
            // Only a newly appeared session resets attempts; one present at
            // startup keeps any stored lockout
            let known = identity.session.as_ref().map(|prev| prev.session_id);
            if !identity.loading && known != Some(s.session_id) {
                limiter.reset_failed_attempts();
            }
            supervisor.begin_session(s.session_id);
        }
        None => supervisor.end_session(),
    }

    identity.session = session;
    identity.loading = false;
}
