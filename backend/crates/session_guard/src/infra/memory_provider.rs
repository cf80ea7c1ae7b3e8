//! In-Memory Identity Provider
//!
//! Process-local stand-in for the identity platform, used by the console
//! binary and by tests. Counts calls and can inject sign-out failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use platform::clock::Clock;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::entity::identity::{Session, SignUpInput, User};
use crate::domain::provider::{IdentityProvider, ProviderError};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    password: String,
    user: User,
}

/// In-memory identity provider
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session_tx: watch::Sender<Option<Session>>,
    clock: Arc<dyn Clock>,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    fail_sign_out: AtomicBool,
}

impl MemoryIdentityProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session_tx,
            clock,
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            fail_sign_out: AtomicBool::new(false),
        }
    }

    /// Builder-style account registration
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    pub fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
        };
        let mut accounts = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
        accounts.insert(
            user.email.clone(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Number of `sign_in` calls that reached the provider
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent `sign_out` calls fail
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    fn issue_session(&self, user: User) -> Session {
        let session = Session::new(user, self.clock.now_ms());
        self.session_tx.send_replace(Some(session.clone()));
        session
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);

        let user = {
            let accounts = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
            match accounts.get(&email.trim().to_lowercase()) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };

        Ok(self.issue_session(user))
    }

    async fn sign_up(&self, input: &SignUpInput) -> Result<Option<Session>, ProviderError> {
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::Rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let exists = {
            let accounts = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
            accounts.contains_key(&input.email.trim().to_lowercase())
        };
        if exists {
            return Err(ProviderError::Rejected("User already registered".to_string()));
        }

        let user = self.add_account(&input.email, &input.password);
        tracing::debug!(
            user_id = %user.id,
            display_name = input.display_name.as_deref().unwrap_or(""),
            "Account registered"
        );
        Ok(Some(self.issue_session(user)))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("sign-out request failed".to_string()));
        }
        self.session_tx.send_replace(None);
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }
}
