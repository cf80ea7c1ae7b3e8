//! Scenario tests for the session guard
//! Timing runs on a paused tokio clock; all epoch values derive from it.

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::time::Duration;

    use platform::clock::{Clock, TokioClock};
    use platform::storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};

    use crate::application::{GuardConfig, PeerChannel, SessionGuard};
    use crate::infra::{KvGuardStore, MemoryIdentityProvider};

    pub const START_MS: i64 = 1_700_000_000_000;
    pub const EMAIL: &str = "ada@example.com";
    pub const PASSWORD: &str = "correct-horse";

    pub type TestGuard = SessionGuard<MemoryIdentityProvider, KvGuardStore>;

    /// Store whose every operation fails
    pub struct UnavailableStore;

    impl KeyValueStore for UnavailableStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }

        fn delete(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    pub struct Harness {
        pub guard: TestGuard,
        pub provider: Arc<MemoryIdentityProvider>,
        pub memory: Arc<MemoryStore>,
        pub clock: Arc<dyn Clock>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(GuardConfig::default())
        }

        pub fn with_config(config: GuardConfig) -> Self {
            let clock: Arc<dyn Clock> = Arc::new(TokioClock::anchored_at(START_MS));
            let memory = Arc::new(MemoryStore::new());
            let provider = Arc::new(
                MemoryIdentityProvider::new(clock.clone()).with_account(EMAIL, PASSWORD),
            );
            let guard = Self::guard_on(&provider, memory.clone(), &clock, config);
            Self {
                guard,
                provider,
                memory,
                clock,
            }
        }

        pub fn guard_on(
            provider: &Arc<MemoryIdentityProvider>,
            store: Arc<dyn KeyValueStore>,
            clock: &Arc<dyn Clock>,
            config: GuardConfig,
        ) -> TestGuard {
            let repo = Arc::new(KvGuardStore::new(store));
            let guard = SessionGuard::new(provider.clone(), repo, clock.clone(), config);
            guard.start();
            guard
        }

        pub fn peer_guard(&self, peers: &PeerChannel) -> TestGuard {
            let repo = Arc::new(KvGuardStore::new(self.memory.clone()));
            let guard = SessionGuard::with_peers(
                self.provider.clone(),
                repo,
                self.clock.clone(),
                GuardConfig::default(),
                peers,
            );
            guard.start();
            guard
        }

        pub async fn fail_sign_in(&self, times: usize) {
            for _ in 0..times {
                let result = self.guard.sign_in(EMAIL, "wrong").await;
                assert!(result.is_err());
            }
        }

        pub async fn sign_in(&self) {
            self.guard.sign_in(EMAIL, PASSWORD).await.unwrap();
            settle().await;
        }

        pub fn activity_record(&self) -> Option<String> {
            self.memory.get("session_last_activity").unwrap()
        }
    }

    pub async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    pub async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }
}

#[cfg(test)]
mod lockout_tests {
    use super::support::*;
    use crate::error::GuardError;
    use crate::domain::provider::ProviderError;

    #[tokio::test(start_paused = true)]
    async fn test_five_failures_lock_the_profile() {
        let h = Harness::new();
        h.fail_sign_in(5).await;

        let state = h.guard.state();
        assert!(state.is_locked);
        assert_eq!(state.lockout_time_remaining, 900);
        assert_eq!(h.guard.limiter().attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_pass_provider_error_through() {
        let h = Harness::new();
        let err = h.guard.sign_in(EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::Provider(ProviderError::InvalidCredentials)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_expires_after_exact_duration() {
        let h = Harness::new();
        h.fail_sign_in(5).await;

        advance(899_999).await;
        let state = h.guard.state();
        assert!(state.is_locked);
        assert_eq!(state.lockout_time_remaining, 1);

        advance(1).await;
        let state = h.guard.state();
        assert!(!state.is_locked);
        assert_eq!(state.lockout_time_remaining, 0);
        assert_eq!(h.guard.limiter().attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_attempts() {
        let h = Harness::new();
        h.fail_sign_in(4).await;
        assert_eq!(h.guard.limiter().attempts(), 4);

        h.sign_in().await;
        let state = h.guard.state();
        assert_eq!(h.guard.limiter().attempts(), 0);
        assert!(!state.is_locked);
        assert!(state.session.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_sign_in_never_reaches_provider() {
        let h = Harness::new();
        h.fail_sign_in(5).await;
        assert_eq!(h.provider.sign_in_calls(), 5);

        // Correct credentials are still refused locally
        let err = h.guard.sign_in(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::LockedOut {
                minutes_remaining: 15
            }
        ));
        assert_eq!(h.provider.sign_in_calls(), 5);
        assert!(h.guard.state().session.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_allowed_again_after_lockout() {
        let h = Harness::new();
        h.fail_sign_in(5).await;
        advance(900_000).await;

        h.sign_in().await;
        assert_eq!(h.provider.sign_in_calls(), 6);
        assert!(h.guard.state().user.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloaded_guard_resumes_lockout() {
        let h = Harness::new();
        h.fail_sign_in(5).await;
        advance(300_000).await;
        h.guard.shutdown();

        let reloaded = Harness::guard_on(
            &h.provider,
            h.memory.clone(),
            &h.clock,
            Default::default(),
        );
        let state = reloaded.state();
        assert!(state.is_locked);
        assert_eq!(state.lockout_time_remaining, 600);
        assert!(reloaded.sign_in(EMAIL, PASSWORD).await.unwrap_err().is_locked_out());
    }

    #[test]
    fn test_format_lockout_time() {
        assert_eq!(TestGuard::format_lockout_time(905), "15:05");
        assert_eq!(TestGuard::format_lockout_time(65), "1:05");
    }
}

#[cfg(test)]
mod idle_tests {
    use super::support::*;
    use crate::domain::provider::IdentityProvider;
    use crate::domain::value_object::{activity_kind::ActivityKind, idle_phase::IdlePhase};

    #[tokio::test(start_paused = true)]
    async fn test_warning_fires_at_session_minus_warning_timeout() {
        let h = Harness::new();
        h.sign_in().await;
        assert!(h.activity_record().is_some());

        advance(1_499_999).await;
        assert!(!h.guard.state().show_timeout_warning);

        advance(1).await;
        let state = h.guard.state();
        assert!(state.show_timeout_warning);
        assert_eq!(state.timeout_remaining, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_countdown_ticks() {
        let h = Harness::new();
        h.sign_in().await;
        advance(1_500_000).await;

        advance(45_000).await;
        assert_eq!(h.guard.state().timeout_remaining, 255);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_warning_forces_single_sign_out() {
        let h = Harness::new();
        h.sign_in().await;

        // One jump: the warning callback runs late, the deadline does not move
        advance(1_799_999).await;
        assert!(h.guard.state().show_timeout_warning);
        assert_eq!(h.guard.state().timeout_remaining, 1);
        assert_eq!(h.provider.sign_out_calls(), 0);

        advance(1).await;
        assert_eq!(h.provider.sign_out_calls(), 1);
        assert_eq!(h.activity_record(), None);
        assert!(h.provider.current_session().is_none());

        let state = h.guard.state();
        assert!(!state.show_timeout_warning);
        assert_eq!(state.timeout_remaining, 0);
        assert!(state.session.is_none());
        assert_eq!(h.guard.supervisor().phase(), IdlePhase::Expired);

        advance(3_600_000).await;
        assert_eq!(h.provider.sign_out_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_measures_from_extension_time() {
        let h = Harness::new();
        h.sign_in().await;
        advance(1_600_000).await;
        assert!(h.guard.state().show_timeout_warning);
        assert_eq!(h.guard.state().timeout_remaining, 200);

        h.guard.extend_session();
        let state = h.guard.state();
        assert!(!state.show_timeout_warning);
        assert_eq!(state.timeout_remaining, 0);

        advance(1_499_999).await;
        assert!(!h.guard.state().show_timeout_warning);
        assert_eq!(h.provider.sign_out_calls(), 0);

        advance(1).await;
        assert!(h.guard.state().show_timeout_warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_inside_debounce_floor_reschedules_once() {
        let h = Harness::new();
        h.sign_in().await;
        let supervisor = h.guard.supervisor();
        assert_eq!(supervisor.reschedule_count(), 1);

        advance(60_000).await;
        h.guard.record_activity(ActivityKind::PointerMove);
        advance(100).await;
        assert_eq!(supervisor.reschedule_count(), 2);

        advance(9_900).await;
        h.guard.record_activity(ActivityKind::KeyDown);
        advance(100).await;
        assert_eq!(supervisor.reschedule_count(), 2);

        // Warning is measured from the accepted activity at 60_100
        advance(1_560_100 - 70_100 - 1).await;
        assert!(!h.guard.state().show_timeout_warning);
        advance(1).await;
        assert!(h.guard.state().show_timeout_warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_typing_keeps_session_alive() {
        let h = Harness::new();
        h.sign_in().await;

        for _ in 0..10 {
            advance(600_000).await;
            h.guard.record_activity(ActivityKind::FormInput);
            advance(100).await;
        }
        assert!(!h.guard.state().show_timeout_warning);
        assert_eq!(h.provider.sign_out_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_voluntary_sign_out_cancels_supervision() {
        let h = Harness::new();
        h.sign_in().await;
        advance(1_000_000).await;

        h.guard.sign_out().await.unwrap();
        settle().await;
        assert_eq!(h.activity_record(), None);
        assert_eq!(h.guard.supervisor().phase(), IdlePhase::Inactive);

        advance(3_600_000).await;
        assert_eq!(h.provider.sign_out_calls(), 1);
        assert!(!h.guard.state().show_timeout_warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_forced_sign_out_still_clears_local_state() {
        let h = Harness::new();
        h.sign_in().await;
        h.provider.set_sign_out_failure(true);

        advance(1_800_000).await;
        assert_eq!(h.provider.sign_out_calls(), 1);
        assert_eq!(h.activity_record(), None);
        assert_eq!(h.guard.supervisor().phase(), IdlePhase::Expired);
        assert!(!h.guard.state().show_timeout_warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_after_expiry_restarts_supervision() {
        let h = Harness::new();
        h.sign_in().await;
        advance(1_800_000).await;
        assert_eq!(h.guard.supervisor().phase(), IdlePhase::Expired);

        h.sign_in().await;
        assert_eq!(h.guard.supervisor().phase(), IdlePhase::Active);
        assert!(h.activity_record().is_some());
    }
}

#[cfg(test)]
mod guard_tests {
    use super::support::*;
    use crate::application::PeerChannel;
    use crate::domain::entity::identity::SignUpInput;
    use crate::domain::provider::ProviderError;
    use crate::error::GuardError;
    use crate::infra::MemoryIdentityProvider;
    use platform::clock::{Clock, TokioClock};
    use platform::storage::KeyValueStore;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_loading_until_started() {
        let h = Harness::new();
        assert!(!h.guard.state().loading);

        let repo = Arc::new(crate::infra::KvGuardStore::new(h.memory.clone()));
        let unstarted = crate::SessionGuard::new(
            h.provider.clone(),
            repo,
            h.clock.clone(),
            Default::default(),
        );
        assert!(unstarted.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_with_existing_session_keeps_stored_lockout() {
        let h = Harness::new();
        h.sign_in().await;
        h.guard.shutdown();

        // Another context on the profile locked out meanwhile
        let now = h.clock.now_ms();
        let record = format!(
            r#"{{"attempts":5,"lockoutUntil":{},"lastAttempt":{now}}}"#,
            now + 600_000
        );
        h.memory.set("auth_rate_limit", &record).unwrap();

        let reopened = Harness::guard_on(
            &h.provider,
            h.memory.clone(),
            &h.clock,
            Default::default(),
        );
        settle().await;
        let state = reopened.state();
        assert!(state.session.is_some());
        assert!(state.is_locked);
        assert_eq!(state.lockout_time_remaining, 600);
        assert_eq!(reopened.limiter().attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_serializes_camel_case() {
        let h = Harness::new();
        let json = serde_json::to_value(h.guard.state()).unwrap();

        for key in [
            "user",
            "session",
            "loading",
            "isLocked",
            "lockoutTimeRemaining",
            "showTimeoutWarning",
            "timeoutRemaining",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_up_passes_through() {
        let h = Harness::new();
        let taken = SignUpInput {
            email: EMAIL.to_string(),
            password: "another-password".to_string(),
            display_name: None,
        };
        let err = h.guard.sign_up(taken).await.unwrap_err();
        assert!(matches!(err, GuardError::Provider(ProviderError::Rejected(_))));
        assert_eq!(h.guard.limiter().attempts(), 0);

        let fresh = SignUpInput {
            email: "grace@example.com".to_string(),
            password: "long-enough".to_string(),
            display_name: Some("Grace".to_string()),
        };
        assert!(h.guard.sign_up(fresh).await.unwrap().is_some());
        settle().await;
        assert_eq!(
            h.guard.state().user.map(|u| u.email).as_deref(),
            Some("grace@example.com")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_outage_fails_open() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::anchored_at(START_MS));
        let provider = Arc::new(
            MemoryIdentityProvider::new(clock.clone()).with_account(EMAIL, PASSWORD),
        );
        let guard = Harness::guard_on(
            &provider,
            Arc::new(UnavailableStore),
            &clock,
            Default::default(),
        );

        for _ in 0..6 {
            assert!(guard.sign_in(EMAIL, "wrong").await.is_err());
        }
        assert_eq!(provider.sign_in_calls(), 6);
        assert!(!guard.state().is_locked);

        guard.sign_in(EMAIL, PASSWORD).await.unwrap();
        settle().await;
        advance(1_500_000).await;
        assert!(guard.state().show_timeout_warning);

        advance(300_000).await;
        assert_eq!(provider.sign_out_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_activity_keeps_other_guard_alive() {
        let h = Harness::new();
        h.guard.shutdown();
        let peers = PeerChannel::default();
        let first = h.peer_guard(&peers);
        let second = h.peer_guard(&peers);

        first.sign_in(EMAIL, PASSWORD).await.unwrap();
        settle().await;

        advance(1_000_000).await;
        first.record_activity(crate::ActivityKind::Click);
        advance(100).await;

        // Without the broadcast the second guard would warn at 1_500_000
        advance(500_000).await;
        assert!(!second.state().show_timeout_warning);
        assert_eq!(h.clock.now_ms(), START_MS + 1_500_100);

        advance(1_000_000).await;
        assert!(second.state().show_timeout_warning);
        assert!(first.state().show_timeout_warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_all_timers() {
        let h = Harness::new();
        h.sign_in().await;
        h.guard.shutdown();

        advance(3_600_000).await;
        assert_eq!(h.provider.sign_out_calls(), 0);
        assert!(h.activity_record().is_some());
    }
}
