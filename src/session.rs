//! Session manager - authentication state and the login/profile/logout flow
//!
//! A `Session` is an explicit object owned by whichever task drives the UI.
//! Every mutation publishes a `SessionSnapshot` on a watch channel so a
//! renderer can follow `loading` and `last_error` while a request is in
//! flight. No operation returns an error: failures surface through
//! `last_error` and the `bool` returned by `login`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::models::{Credentials, User};
use crate::network::AuthApi;
use crate::storage::TokenStore;

/// Which profile-fetch failures end the session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Any failure, including transport errors, logs out
    #[default]
    AnyFailure,
    /// Only a non-2xx response logs out; transport and decode failures keep the session
    RejectedOnly,
}

impl InvalidationPolicy {
    pub fn invalidates(&self, err: &ApiError) -> bool {
        match self {
            InvalidationPolicy::AnyFailure => true,
            InvalidationPolicy::RejectedOnly => err.is_rejection(),
        }
    }
}

/// Point-in-time view of a session for rendering
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub has_token: bool,
    pub loading: bool,
    pub last_error: Option<String>,
    pub is_authenticated: bool,
    pub is_admin: bool,
}

pub struct Session<A, S> {
    api: A,
    store: S,
    policy: InvalidationPolicy,
    current_user: Option<User>,
    token: Option<String>,
    // Requests in flight; `loading` is derived from it so a nested
    // profile fetch cannot clear the flag under a running login.
    in_flight: Arc<AtomicUsize>,
    last_error: Option<String>,
    notify: Arc<watch::Sender<SessionSnapshot>>,
}

/// Marks one request in flight until dropped, including when the
/// operation's future is dropped at an await point.
struct InFlight {
    count: Arc<AtomicUsize>,
    notify: Arc<watch::Sender<SessionSnapshot>>,
}

impl InFlight {
    fn begin(count: &Arc<AtomicUsize>, notify: &Arc<watch::Sender<SessionSnapshot>>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        notify.send_modify(|snap| snap.loading = true);
        InFlight {
            count: Arc::clone(count),
            notify: Arc::clone(notify),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let remaining = self.count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        self.notify.send_modify(|snap| snap.loading = remaining > 0);
    }
}

impl<A: AuthApi, S: TokenStore> Session<A, S> {
    /// Create a session, seeding the token from persisted storage
    pub fn new(api: A, store: S, policy: InvalidationPolicy) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted token");
                None
            }
        };
        tracing::debug!(has_token = token.is_some(), "Session created");

        let (notify, _) = watch::channel(SessionSnapshot::default());
        let session = Session {
            api,
            store,
            policy,
            current_user: None,
            token,
            in_flight: Arc::new(AtomicUsize::new(0)),
            last_error: None,
            notify: Arc::new(notify),
        };
        session.publish();
        session
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.notify.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.current_user.clone(),
            has_token: self.token.is_some(),
            loading: self.is_loading(),
            last_error: self.last_error.clone(),
            is_authenticated: self.is_authenticated(),
            is_admin: self.is_admin(),
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.current_user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current_user
            .as_ref()
            .map(|u| u.is_superuser)
            .unwrap_or(false)
    }

    /// Submit credentials; on success store the token and load the profile.
    ///
    /// Returns `true` once a token was issued, even if the follow-up
    /// profile fetch fails.
    pub async fn login(&mut self, credentials: &Credentials) -> bool {
        let _in_flight = self.begin_request();
        self.last_error = None;
        self.publish();

        match self.api.login(credentials).await {
            Ok(token) => {
                tracing::info!(username = %credentials.username, "Login succeeded");
                self.store_token(token.access_token);
                self.fetch_profile().await;
                true
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Login failed");
                self.last_error = Some(e.user_message());
                false
            }
        }
    }

    /// Load the current user for the held token; no-op without a token
    pub async fn fetch_profile(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };

        let _in_flight = self.begin_request();
        match self.api.current_user(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "Profile loaded");
                self.current_user = Some(user);
            }
            Err(e) if self.policy.invalidates(&e) => {
                tracing::warn!(error = %e, "Session invalid, logging out");
                self.logout();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch failed, keeping session");
            }
        }
    }

    /// Clear user, token and error, and remove the persisted token
    pub fn logout(&mut self) {
        if self.token.is_some() || self.current_user.is_some() {
            tracing::info!("Logged out");
        }
        self.current_user = None;
        self.token = None;
        self.last_error = None;
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not remove persisted token");
        }
        self.publish();
    }

    /// Validate a token recovered from storage at startup
    pub async fn initialize(&mut self) {
        if self.token.is_some() {
            self.fetch_profile().await;
        }
    }

    fn store_token(&mut self, token: String) {
        if let Err(e) = self.store.save(&token) {
            tracing::warn!(error = %e, "Could not persist token");
        }
        self.token = Some(token);
        self.publish();
    }

    fn begin_request(&self) -> InFlight {
        InFlight::begin(&self.in_flight, &self.notify)
    }

    fn publish(&self) {
        self.notify.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::models::TokenResponse;
    use crate::storage::MemoryTokenStore;
    use std::sync::Mutex;
    use std::time::Duration;

    fn alice() -> User {
        serde_json::from_str(concat!(
            r#"{"id":1,"username":"alice","email":"a@x.com","#,
            r#""is_active":true,"is_superuser":false,"is_verified":true}"#,
        ))
        .unwrap()
    }

    fn admin() -> User {
        User {
            is_superuser: true,
            ..alice()
        }
    }

    fn token(value: &str) -> TokenResponse {
        TokenResponse {
            access_token: value.to_string(),
            token_type: "bearer".to_string(),
        }
    }

    #[derive(Clone, Default)]
    struct FakeApi {
        login: Option<Result<TokenResponse, ApiError>>,
        me: Option<Result<User, ApiError>>,
        login_calls: Arc<AtomicUsize>,
        me_calls: Arc<AtomicUsize>,
        seen_tokens: Arc<Mutex<Vec<String>>>,
        watcher: Arc<Mutex<Option<watch::Receiver<SessionSnapshot>>>>,
        loading_seen: Arc<Mutex<Vec<bool>>>,
        login_delay: Option<Duration>,
        me_delay: Option<Duration>,
    }

    impl FakeApi {
        fn record_loading(&self) {
            if let Some(rx) = self.watcher.lock().unwrap().as_ref() {
                self.loading_seen.lock().unwrap().push(rx.borrow().loading);
            }
        }
    }

    impl AuthApi for FakeApi {
        async fn login(&self, _credentials: &Credentials) -> Result<TokenResponse, ApiError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.record_loading();
            if let Some(delay) = self.login_delay {
                tokio::time::sleep(delay).await;
            }
            self.login
                .clone()
                .unwrap_or_else(|| Err(ApiError::Transport("no login stub".into())))
        }

        async fn current_user(&self, token: &str) -> Result<User, ApiError> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tokens.lock().unwrap().push(token.to_string());
            self.record_loading();
            if let Some(delay) = self.me_delay {
                tokio::time::sleep(delay).await;
            }
            self.me
                .clone()
                .unwrap_or_else(|| Err(ApiError::Transport("no me stub".into())))
        }
    }

    /// Store whose every operation fails
    struct BrokenStore;

    fn read_only() -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        ))
    }

    impl TokenStore for BrokenStore {
        fn load(&self) -> Result<Option<String>, StorageError> {
            Err(read_only())
        }

        fn save(&self, _token: &str) -> Result<(), StorageError> {
            Err(read_only())
        }

        fn clear(&self) -> Result<(), StorageError> {
            Err(read_only())
        }
    }

    fn rejected(status: u16, detail: Option<&str>) -> ApiError {
        ApiError::Rejected {
            status,
            detail: detail.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let store = MemoryTokenStore::new();
        let mut session = Session::new(api.clone(), store.clone(), InvalidationPolicy::default());

        assert!(session.login(&Credentials::new("alice", "secret")).await);
        assert!(session.is_authenticated());
        assert!(!session.is_admin());
        assert!(!session.is_loading());
        assert_eq!(session.last_error(), None);
        assert_eq!(session.token(), Some("tok123"));
        assert_eq!(store.peek().as_deref(), Some("tok123"));
        assert_eq!(session.current_user().map(|u| u.username.as_str()), Some("alice"));
        assert_eq!(api.seen_tokens.lock().unwrap().as_slice(), ["tok123"]);
    }

    #[tokio::test]
    async fn test_login_rejected_with_detail() {
        let api = FakeApi {
            login: Some(Err(rejected(401, Some("Incorrect username or password")))),
            ..Default::default()
        };
        let store = MemoryTokenStore::new();
        let mut session = Session::new(api.clone(), store.clone(), InvalidationPolicy::default());

        assert!(!session.login(&Credentials::new("alice", "wrong")).await);
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.last_error(), Some("Incorrect username or password"));
        assert_eq!(store.peek(), None);
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_rejected_without_detail_uses_fallback() {
        let api = FakeApi {
            login: Some(Err(rejected(500, None))),
            ..Default::default()
        };
        let mut session = Session::new(api, MemoryTokenStore::new(), InvalidationPolicy::default());

        assert!(!session.login(&Credentials::new("alice", "pw")).await);
        assert_eq!(session.last_error(), Some(crate::constants::GENERIC_LOGIN_FAILURE));
    }

    #[tokio::test]
    async fn test_login_transport_failure_uses_fallback() {
        let api = FakeApi::default();
        let mut session = Session::new(api, MemoryTokenStore::new(), InvalidationPolicy::default());

        assert!(!session.login(&Credentials::new("alice", "pw")).await);
        assert_eq!(session.last_error(), Some(crate::constants::GENERIC_LOGIN_FAILURE));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_login_clears_previous_error() {
        let mut api = FakeApi {
            login: Some(Err(rejected(401, Some("nope")))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::new(),
            InvalidationPolicy::default(),
        );
        assert!(!session.login(&Credentials::new("alice", "bad")).await);
        assert_eq!(session.last_error(), Some("nope"));

        api.login = Some(Ok(token("tok123")));
        session.api = api;
        assert!(session.login(&Credentials::new("alice", "good")).await);
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_login_true_even_when_profile_fails() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Err(rejected(401, None))),
            ..Default::default()
        };
        let store = MemoryTokenStore::new();
        let mut session = Session::new(api, store.clone(), InvalidationPolicy::default());

        assert!(session.login(&Credentials::new("alice", "pw")).await);
        // profile rejection is an implicit logout
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert_eq!(session.last_error(), None);
        assert_eq!(store.peek(), None);
    }

    #[tokio::test]
    async fn test_loading_held_across_login_and_profile() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::new(),
            InvalidationPolicy::default(),
        );
        *api.watcher.lock().unwrap() = Some(session.subscribe());

        assert!(session.login(&Credentials::new("alice", "pw")).await);
        assert_eq!(api.loading_seen.lock().unwrap().as_slice(), [true, true]);
        assert!(!session.subscribe().borrow().loading);
    }

    #[tokio::test]
    async fn test_admin_flag() {
        let api = FakeApi {
            login: Some(Ok(token("tok"))),
            me: Some(Ok(admin())),
            ..Default::default()
        };
        let mut session = Session::new(api, MemoryTokenStore::new(), InvalidationPolicy::default());
        assert!(!session.is_admin());
        session.login(&Credentials::new("root", "pw")).await;
        assert!(session.is_admin());
        session.logout();
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_fetch_profile_without_token_is_noop() {
        let api = FakeApi {
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::new(),
            InvalidationPolicy::default(),
        );
        session.fetch_profile().await;
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.current_user(), None);
    }

    #[tokio::test]
    async fn test_rejected_profile_equals_logout() {
        let api = FakeApi {
            me: Some(Err(rejected(401, Some("Could not validate credentials")))),
            ..Default::default()
        };
        let store = MemoryTokenStore::with_token("expired");
        let mut session = Session::new(api, store.clone(), InvalidationPolicy::default());
        session.fetch_profile().await;

        let mut reference = Session::new(
            FakeApi::default(),
            MemoryTokenStore::with_token("expired"),
            InvalidationPolicy::default(),
        );
        reference.logout();

        assert_eq!(session.snapshot(), reference.snapshot());
        assert_eq!(store.peek(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_policy() {
        let api = FakeApi {
            me: Some(Err(ApiError::Transport("Connection failed".into()))),
            ..Default::default()
        };

        let any = MemoryTokenStore::with_token("tok");
        let mut session = Session::new(api.clone(), any.clone(), InvalidationPolicy::AnyFailure);
        session.initialize().await;
        assert_eq!(session.token(), None);
        assert_eq!(any.peek(), None);

        let kept = MemoryTokenStore::with_token("tok");
        let mut session = Session::new(api, kept.clone(), InvalidationPolicy::RejectedOnly);
        session.initialize().await;
        assert_eq!(session.token(), Some("tok"));
        assert_eq!(kept.peek().as_deref(), Some("tok"));
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_rejected_only_still_logs_out_on_rejection() {
        let api = FakeApi {
            me: Some(Err(rejected(403, None))),
            ..Default::default()
        };
        let mut session = Session::new(
            api,
            MemoryTokenStore::with_token("tok"),
            InvalidationPolicy::RejectedOnly,
        );
        session.initialize().await;
        assert_eq!(session.token(), None);
    }

    #[tokio::test]
    async fn test_logout_twice_is_idempotent() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let store = MemoryTokenStore::new();
        let mut session = Session::new(api, store.clone(), InvalidationPolicy::default());
        session.login(&Credentials::new("alice", "pw")).await;

        session.logout();
        let once = session.snapshot();
        session.logout();
        assert_eq!(session.snapshot(), once);
        assert_eq!(once, SessionSnapshot::default());
        assert_eq!(store.peek(), None);
    }

    #[tokio::test]
    async fn test_initialize_without_token_makes_no_call() {
        let api = FakeApi::default();
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::new(),
            InvalidationPolicy::default(),
        );
        session.initialize().await;
        assert!(!session.is_authenticated());
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_with_valid_token() {
        let api = FakeApi {
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::with_token("persisted"),
            InvalidationPolicy::default(),
        );
        assert!(!session.is_authenticated());
        session.initialize().await;
        assert!(session.is_authenticated());
        assert_eq!(api.seen_tokens.lock().unwrap().as_slice(), ["persisted"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_state() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(api, MemoryTokenStore::new(), InvalidationPolicy::default());
        let rx = session.subscribe();
        assert!(!rx.borrow().is_authenticated);

        session.login(&Credentials::new("alice", "pw")).await;
        let snap = rx.borrow().clone();
        assert!(snap.is_authenticated);
        assert!(snap.has_token);
        assert!(!snap.loading);
        assert_eq!(snap.user.map(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_cancelled_login_releases_loading() {
        let mut api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            login_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let mut session = Session::new(
            api.clone(),
            MemoryTokenStore::new(),
            InvalidationPolicy::default(),
        );
        let rx = session.subscribe();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            session.login(&Credentials::new("alice", "pw")),
        )
        .await;
        assert!(outcome.is_err());
        assert!(!session.is_loading());
        assert!(!rx.borrow().loading);
        assert_eq!(session.token(), None);

        // a later login goes through normally
        api.login_delay = None;
        session.api = api;
        assert!(session.login(&Credentials::new("alice", "pw")).await);
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_profile_fetch_inside_login_releases_loading() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            me_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let mut session = Session::new(api, MemoryTokenStore::new(), InvalidationPolicy::default());

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            session.login(&Credentials::new("alice", "pw")),
        )
        .await;
        assert!(outcome.is_err());
        assert!(!session.is_loading());
        assert!(!session.subscribe().borrow().loading);
        // the token was issued before the profile request hung
        assert_eq!(session.token(), Some("tok123"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_unreadable_store_seeds_no_token() {
        let api = FakeApi {
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(api.clone(), BrokenStore, InvalidationPolicy::default());
        assert_eq!(session.token(), None);

        session.initialize().await;
        assert!(!session.is_authenticated());
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_login_in_memory() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(api, BrokenStore, InvalidationPolicy::default());

        assert!(session.login(&Credentials::new("alice", "pw")).await);
        assert_eq!(session.token(), Some("tok123"));
        assert!(session.is_authenticated());
        assert_eq!(session.last_error(), None);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_failed_clear_still_logs_out() {
        let api = FakeApi {
            login: Some(Ok(token("tok123"))),
            me: Some(Ok(alice())),
            ..Default::default()
        };
        let mut session = Session::new(api, BrokenStore, InvalidationPolicy::default());
        assert!(session.login(&Credentials::new("alice", "pw")).await);

        session.logout();
        assert_eq!(session.token(), None);
        assert_eq!(session.current_user(), None);
        assert_eq!(session.snapshot(), SessionSnapshot::default());
    }
}
