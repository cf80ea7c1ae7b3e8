//! Idle Session Timeout Supervisor
//!
//! Watches user activity while a session is live, shows a warning before an
//! idle session expires and forces sign-out when the warning is ignored.
//!
//! ## Timers
//! - `Active`: warning timer at `session_timeout - warning_timeout`, plus an
//!   absolute expiry timer at `session_timeout` when enabled
//! - `Warning`: one countdown to `last activity + session_timeout` whose
//!   expiry signs out
//!
//! Every (re)arm bumps a generation number; a callback carrying an older
//! generation does nothing.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use platform::clock::Clock;
use platform::timer::{Countdown, TimerHandle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::config::IdlePolicy;
use crate::application::peer_sync::{PeerChannel, PeerLink};
use crate::domain::entity::session_activity::SessionActivityRecord;
use crate::domain::provider::IdentityProvider;
use crate::domain::repository::SessionActivityRepository;
use crate::domain::value_object::{activity_kind::ActivityKind, idle_phase::IdlePhase};
use crate::error::GuardError;

/// Idle session supervisor. Clones share state.
pub struct IdleSupervisor<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: SessionActivityRepository + 'static,
{
    inner: Arc<SupervisorInner<P, R>>,
}

struct SupervisorInner<P, R> {
    provider: Arc<P>,
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: IdlePolicy,
    peers: Option<PeerLink>,
    state: Mutex<IdleState>,
}

#[derive(Default)]
struct IdleState {
    phase: IdlePhase,
    session_id: Option<Uuid>,
    generation: u64,
    /// Activity time the armed timers are measured from
    scheduled_from_ms: i64,
    reschedules: u64,
    warning_timer: TimerHandle,
    expiry_timer: TimerHandle,
    batch_timer: TimerHandle,
    countdown: Option<Countdown>,
}

impl IdleState {
    fn cancel_all(&mut self) {
        self.warning_timer.cancel();
        self.expiry_timer.cancel();
        self.batch_timer.cancel();
        self.countdown = None;
        self.generation += 1;
    }
}

impl<P, R> Clone for IdleSupervisor<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: SessionActivityRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P, R> IdleSupervisor<P, R>
where
    P: IdentityProvider + Send + Sync + 'static,
    R: SessionActivityRepository + 'static,
{
    pub fn new(provider: Arc<P>, repo: Arc<R>, clock: Arc<dyn Clock>, policy: IdlePolicy) -> Self {
        Self::build(provider, repo, clock, policy, None)
    }

    /// Supervisor that shares activity with the other members of `peers`
    pub fn with_peers(
        provider: Arc<P>,
        repo: Arc<R>,
        clock: Arc<dyn Clock>,
        policy: IdlePolicy,
        peers: &PeerChannel,
    ) -> Self {
        Self::build(provider, repo, clock, policy, Some(peers.join()))
    }

    fn build(
        provider: Arc<P>,
        repo: Arc<R>,
        clock: Arc<dyn Clock>,
        policy: IdlePolicy,
        peers: Option<PeerLink>,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                provider,
                repo,
                clock,
                policy,
                peers,
                state: Mutex::new(IdleState::default()),
            }),
        }
    }

    pub fn phase(&self) -> IdlePhase {
        self.lock_state().phase
    }

    pub fn show_timeout_warning(&self) -> bool {
        self.phase() == IdlePhase::Warning
    }

    /// Whole seconds until forced sign-out, 0 outside the warning
    pub fn timeout_remaining(&self) -> u64 {
        self.lock_state()
            .countdown
            .as_ref()
            .map(Countdown::remaining_secs)
            .unwrap_or(0)
    }

    /// How many times the idle timers have been (re)armed
    pub fn reschedule_count(&self) -> u64 {
        self.lock_state().reschedules
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start supervising a session. Repeated notifications for the same
    /// session keep the running timers.
    pub fn begin_session(&self, session_id: Uuid) {
        let now = self.inner.clock.now_ms();
        let mut state = self.lock_state();
        if state.phase.is_live() && state.session_id == Some(session_id) {
            return;
        }

        state.cancel_all();
        state.session_id = Some(session_id);
        state.phase = IdlePhase::Active;
        self.schedule(&mut state, now, true);
        drop(state);

        self.publish(now);
        tracing::info!(
            session_id = %session_id,
            timeout_secs = self.inner.policy.session_timeout.as_secs(),
            "Idle supervision started"
        );
    }

    /// Stop supervising: cancel timers and delete the activity record
    pub fn end_session(&self) {
        let mut state = self.lock_state();
        let was_live = state.phase.is_live();
        state.cancel_all();
        state.session_id = None;
        if state.phase != IdlePhase::Expired {
            state.phase = IdlePhase::Inactive;
        }
        drop(state);

        self.delete_record();
        if was_live {
            tracing::info!("Idle supervision stopped");
        }
    }

    /// Feed one user-input event
    pub fn record_activity(&self, kind: ActivityKind) {
        let policy = &self.inner.policy;
        if !policy.qualifies(kind) {
            tracing::trace!(%kind, "Ignoring non-qualifying activity");
            return;
        }

        let mut state = self.lock_state();
        match state.phase {
            IdlePhase::Active => {}
            IdlePhase::Warning if policy.activity_dismisses_warning => {}
            _ => return,
        }

        if policy.batch_delay.is_zero() {
            drop(state);
            self.flush_activity();
            return;
        }
        if state.batch_timer.is_armed() {
            tracing::trace!(%kind, "Activity coalesced into pending batch");
            return;
        }

        let weak = self.downgrade();
        state.batch_timer = TimerHandle::after(policy.batch_delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                IdleSupervisor { inner }.flush_activity();
            }
        });
    }

    /// "Stay signed in": clear any warning and restart the idle budget now.
    ///
    /// Returns `false` when no session is being supervised.
    pub fn extend_session(&self) -> bool {
        let now = self.inner.clock.now_ms();
        let mut state = self.lock_state();
        if !state.phase.is_live() {
            tracing::debug!(phase = %state.phase, "No live session to extend");
            return false;
        }

        let was_warning = state.phase == IdlePhase::Warning;
        state.phase = IdlePhase::Active;
        self.schedule(&mut state, now, true);
        drop(state);

        self.publish(now);
        tracing::info!(was_warning, "Session extended");
        true
    }

    /// Cancel every timer without touching the stored record (teardown)
    pub fn shutdown(&self) {
        self.lock_state().cancel_all();
    }

    /// Re-arm from another guard's activity on the same profile
    pub(crate) fn apply_peer_activity(&self, at_ms: i64) {
        let mut state = self.lock_state();
        if !state.phase.is_live() || at_ms <= state.scheduled_from_ms {
            return;
        }

        let was_warning = state.phase == IdlePhase::Warning;
        state.phase = IdlePhase::Active;
        self.schedule(&mut state, at_ms, false);
        tracing::debug!(at_ms, was_warning, "Idle timers re-armed by peer activity");
    }

    /// Forward peer activity into this supervisor until shut down
    pub(crate) fn spawn_peer_listener(&self) -> Option<JoinHandle<()>> {
        let link = self.inner.peers.clone()?;
        let mut rx = link.subscribe();
        let weak = self.downgrade();

        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(signal) if link.is_own(&signal) => {}
                    Ok(signal) => {
                        let Some(inner) = weak.upgrade() else { break };
                        IdleSupervisor { inner }.apply_peer_activity(signal.at_ms);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Peer activity receiver lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }

    fn flush_activity(&self) {
        let now = self.inner.clock.now_ms();
        let policy = &self.inner.policy;
        let mut state = self.lock_state();

        match state.phase {
            IdlePhase::Active => {
                if let Some(record) = self.load_record() {
                    let idle_ms = record.idle_ms(now);
                    if idle_ms < policy.debounce_floor_ms() {
                        tracing::debug!(idle_ms, "Activity inside debounce floor");
                        return;
                    }
                }
                self.schedule(&mut state, now, true);
            }
            IdlePhase::Warning if policy.activity_dismisses_warning => {
                state.phase = IdlePhase::Active;
                self.schedule(&mut state, now, true);
                tracing::info!("Idle warning dismissed by activity");
            }
            _ => return,
        }
        drop(state);

        self.publish(now);
    }

    fn enter_warning(&self, generation: u64) {
        let now = self.inner.clock.now_ms();
        let session_timeout = self.inner.policy.session_timeout;
        let mut state = self.lock_state();
        if state.generation != generation || state.phase != IdlePhase::Active {
            return;
        }

        state.warning_timer.cancel();
        state.expiry_timer.cancel();
        state.phase = IdlePhase::Warning;
        state.generation += 1;
        let generation = state.generation;

        // Sign-out stays anchored to the last activity, however late this runs
        let idle = Duration::from_millis((now - state.scheduled_from_ms).max(0) as u64);
        let left = session_timeout.saturating_sub(idle);

        let weak = self.downgrade();
        state.countdown = Some(Countdown::start(left, move || async move {
            if let Some(inner) = weak.upgrade() {
                IdleSupervisor { inner }.expire(generation).await;
            }
        }));
        let scheduled_from_ms = state.scheduled_from_ms;
        drop(state);

        self.mark_warning_shown(scheduled_from_ms);
        tracing::info!(timeout_secs = left.as_secs(), "Idle warning shown");
    }

    async fn expire(&self, generation: u64) {
        {
            let mut state = self.lock_state();
            if state.generation != generation || !state.phase.is_live() {
                return;
            }
            state.cancel_all();
            state.phase = IdlePhase::Expired;
            state.session_id = None;
        }

        self.delete_record();
        tracing::warn!("Idle session expired, signing out");

        if let Err(e) = self.inner.provider.sign_out().await {
            GuardError::ForcedExpiry(e).log();
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Arm the Active-state timers measured from `from_ms`
    fn schedule(&self, state: &mut IdleState, from_ms: i64, persist: bool) {
        let policy = &self.inner.policy;
        if persist {
            self.save_record(&SessionActivityRecord::new(from_ms));
        }

        state.warning_timer.cancel();
        state.expiry_timer.cancel();
        state.countdown = None;
        state.generation += 1;
        state.reschedules += 1;
        state.scheduled_from_ms = from_ms;

        let generation = state.generation;
        let elapsed_ms = (self.inner.clock.now_ms() - from_ms).max(0) as u64;
        let elapsed = Duration::from_millis(elapsed_ms);

        let weak = self.downgrade();
        state.warning_timer = TimerHandle::after(
            policy.warning_delay().saturating_sub(elapsed),
            move || async move {
                if let Some(inner) = weak.upgrade() {
                    IdleSupervisor { inner }.enter_warning(generation);
                }
            },
        );

        if policy.absolute_expiry {
            let weak = self.downgrade();
            state.expiry_timer = TimerHandle::after(
                policy.session_timeout.saturating_sub(elapsed),
                move || async move {
                    if let Some(inner) = weak.upgrade() {
                        IdleSupervisor { inner }.expire(generation).await;
                    }
                },
            );
        }
    }

    fn publish(&self, at_ms: i64) {
        if let Some(peers) = &self.inner.peers {
            peers.publish(at_ms);
        }
    }

    fn mark_warning_shown(&self, fallback_ms: i64) {
        let mut record = self
            .load_record()
            .unwrap_or_else(|| SessionActivityRecord::new(fallback_ms));
        record.warning_shown = true;
        self.save_record(&record);
    }

    /// Stored record; unreadable counts as absent
    fn load_record(&self) -> Option<SessionActivityRecord> {
        self.inner.repo.load_activity().unwrap_or_else(|e| {
            e.log();
            None
        })
    }

    fn save_record(&self, record: &SessionActivityRecord) {
        if let Err(e) = self.inner.repo.save_activity(record) {
            e.log();
        }
    }

    fn delete_record(&self) {
        if let Err(e) = self.inner.repo.delete_activity() {
            e.log();
        }
    }

    fn downgrade(&self) -> Weak<SupervisorInner<P, R>> {
        Arc::downgrade(&self.inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, IdleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
