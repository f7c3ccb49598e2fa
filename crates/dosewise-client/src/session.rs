//! Client-side auth context.
//!
//! [`AuthContext`] owns the current [`AuthState`] and publishes every change
//! on a `watch` channel.  It starts in `Loading` until [`AuthContext::initialize`]
//! has asked the backend for the session.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dosewise_shared::auth::{AuthEvent, AuthState, Credentials};
use dosewise_shared::models::{Profile, Registration};
use dosewise_shared::routes::{guard, Navigation};
use dosewise_shared::validation::{validate_credentials, validate_registration};

use crate::backend::AuthBackend;
use crate::error::{ClientError, Result};

/// Bounded exponential backoff for the post-registration profile fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(200),
            factor: 2,
            max_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let growth = self.factor.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(growth)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

pub struct AuthContext<B> {
    backend: B,
    state: watch::Sender<AuthState>,
    retry: RetryPolicy,
}

impl<B: AuthBackend> AuthContext<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            backend,
            state,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn set(&self, next: AuthState) -> AuthState {
        self.state.send_replace(next.clone());
        next
    }

    /// Start-up session check.  A backend failure counts as signed out.
    pub async fn initialize(&self) -> AuthState {
        self.refresh().await
    }

    async fn refresh(&self) -> AuthState {
        let next = match self.backend.session().await {
            Ok(AuthState::Loading) | Err(ClientError::NotAuthenticated) => {
                AuthState::Unauthenticated
            }
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Session check failed");
                AuthState::Unauthenticated
            }
        };
        self.set(next)
    }

    /// Re-derive the state after a backend session change.
    pub async fn handle_event(&self, event: AuthEvent) -> AuthState {
        debug!(?event, "Auth event");
        match event {
            AuthEvent::SignedOut => self.set(AuthState::Unauthenticated),
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed => self.refresh().await,
        }
    }

    /// Resolves once the start-up check has settled.
    pub async fn ready(&self) -> AuthState {
        let mut rx = self.subscribe();
        rx.wait_for(|s| *s != AuthState::Loading)
            .await
            .map(|state| state.clone())
            .unwrap_or_else(|_| self.state())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthState> {
        validate_credentials(email, password)?;

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.backend.login(&credentials).await?;

        let next = match response.profile {
            Some(profile) => AuthState::Authenticated { profile },
            None => AuthState::ProfileMissing {
                user_id: response.user_id,
            },
        };
        Ok(self.set(next))
    }

    /// Sign up and wait for the profile to become readable.
    pub async fn register(&self, registration: &Registration) -> Result<Profile> {
        validate_registration(registration)?;

        let response = self.backend.register(registration).await?;
        info!(user_id = %response.user_id, role = %registration.role(), "Registered");

        let profile = match response.profile {
            Some(profile) => profile,
            None => self.poll_profile(response.user_id).await?,
        };
        self.set(AuthState::Authenticated {
            profile: profile.clone(),
        });
        Ok(profile)
    }

    async fn poll_profile(&self, user_id: Uuid) -> Result<Profile> {
        for attempt in 0..self.retry.attempts {
            match self.backend.fetch_profile().await {
                Ok(profile) => return Ok(profile),
                Err(ClientError::ProfileMissing) => {
                    debug!(%user_id, attempt, "Profile not readable yet");
                    if attempt + 1 < self.retry.attempts {
                        tokio::time::sleep(self.retry.delay(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(%user_id, attempts = self.retry.attempts, "Profile still missing after registration");
        self.set(AuthState::ProfileMissing { user_id });
        Err(ClientError::ProfileMissing)
    }

    /// One more profile fetch after `ProfileMissing`.
    pub async fn retry_profile(&self) -> Result<Profile> {
        match self.backend.fetch_profile().await {
            Ok(profile) => {
                self.set(AuthState::Authenticated {
                    profile: profile.clone(),
                });
                Ok(profile)
            }
            Err(ClientError::NotAuthenticated) => {
                self.set(AuthState::Unauthenticated);
                Err(ClientError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    /// Always ends signed out locally, even when the backend call fails.
    pub async fn logout(&self) -> Result<()> {
        let result = self.backend.logout().await;
        if let Err(e) = &result {
            warn!(error = %e, "Logout request failed");
        }
        self.set(AuthState::Unauthenticated);
        result
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        guard(path, &self.state.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;
    use dosewise_shared::auth::AuthResponse;
    use dosewise_shared::models::RoleDetails;
    use dosewise_shared::types::Role;

    #[derive(Default)]
    struct FakeBackend {
        session: Mutex<Option<AuthState>>,
        profile: Mutex<Option<Profile>>,
        /// Profile fetches answered with `ProfileMissing` before the row shows up.
        missing_fetches: AtomicU32,
        fetches: AtomicU32,
        logins: AtomicU32,
    }

    impl FakeBackend {
        fn with_session(state: AuthState) -> Self {
            let backend = Self::default();
            *backend.session.lock().unwrap() = Some(state);
            backend
        }
    }

    fn profile_from(user_id: Uuid, reg: &Registration) -> Profile {
        let now = Utc::now();
        let (age, condition) = match &reg.details {
            RoleDetails::Patient { age, condition } => (*age, condition.clone()),
            RoleDetails::Clinic { .. } => (None, None),
        };
        Profile {
            id: user_id,
            name: reg.name.clone(),
            email: reg.normalized_email(),
            role: reg.role(),
            age,
            condition,
            clinic_name: None,
            crm: None,
            specialty: None,
            doctor_code: None,
            notifications_enabled: true,
            share_data: false,
            created_at: now,
            updated_at: now,
        }
    }

    impl AuthBackend for FakeBackend {
        async fn session(&self) -> Result<AuthState> {
            self.session
                .lock()
                .unwrap()
                .clone()
                .ok_or(ClientError::Api {
                    status: 503,
                    code: "UNAVAILABLE".into(),
                    message: "down".into(),
                })
        }

        async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            let profile = self.profile.lock().unwrap().clone();
            Ok(AuthResponse {
                token: format!("token-{}", credentials.email),
                user_id: profile.as_ref().map_or_else(Uuid::new_v4, |p| p.id),
                profile,
            })
        }

        async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
            let user_id = Uuid::new_v4();
            *self.profile.lock().unwrap() = Some(profile_from(user_id, registration));
            Ok(AuthResponse {
                token: "token".into(),
                user_id,
                profile: None,
            })
        }

        async fn logout(&self) -> Result<()> {
            Err(ClientError::NotAuthenticated)
        }

        async fn fetch_profile(&self) -> Result<Profile> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let missing = self.missing_fetches.load(Ordering::SeqCst);
            if missing > 0 {
                self.missing_fetches.store(missing - 1, Ordering::SeqCst);
                return Err(ClientError::ProfileMissing);
            }
            self.profile
                .lock()
                .unwrap()
                .clone()
                .ok_or(ClientError::ProfileMissing)
        }
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            initial_delay: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(5),
        }
    }

    fn patient_registration() -> Registration {
        Registration {
            email: "Ana@Example.com".into(),
            password: "secret1".into(),
            name: "Ana".into(),
            details: RoleDetails::Patient {
                age: Some(54),
                condition: Some("hypertension".into()),
            },
        }
    }

    #[test]
    fn test_retry_delays_grow_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(1600));
        assert_eq!(policy.delay(4), Duration::from_secs(3));
        assert_eq!(policy.delay(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_initialize_leaves_loading() {
        let ctx = AuthContext::new(FakeBackend::with_session(AuthState::Unauthenticated));
        assert_eq!(ctx.state(), AuthState::Loading);
        assert_eq!(ctx.navigate("/patient/dashboard"), Navigation::Wait);

        let rx = ctx.subscribe();
        assert_eq!(ctx.initialize().await, AuthState::Unauthenticated);
        assert_eq!(*rx.borrow(), AuthState::Unauthenticated);
        assert_eq!(ctx.ready().await, AuthState::Unauthenticated);
        assert_eq!(
            ctx.navigate("/patient/dashboard"),
            Navigation::Redirect("/auth/profile-choice")
        );
    }

    #[tokio::test]
    async fn test_failed_session_check_is_unauthenticated() {
        let ctx = AuthContext::new(FakeBackend::default());
        assert_eq!(ctx.initialize().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_events_rederive_state() {
        let user_id = Uuid::new_v4();
        let ctx = AuthContext::new(FakeBackend::with_session(AuthState::ProfileMissing {
            user_id,
        }));

        assert_eq!(
            ctx.handle_event(AuthEvent::SignedIn).await,
            AuthState::ProfileMissing { user_id }
        );
        assert_eq!(
            ctx.navigate("/clinic/alerts"),
            Navigation::ProfileMissing { user_id }
        );
        assert_eq!(
            ctx.handle_event(AuthEvent::SignedOut).await,
            AuthState::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_invalid_login_is_rejected_locally() {
        let ctx = AuthContext::new(FakeBackend::default());
        let err = ctx.login("not-an-email", "").await.unwrap_err();
        match err {
            ClientError::Validation(errors) => {
                assert!(errors.has("email"));
                assert!(errors.has("password"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.backend().logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_without_profile_is_recoverable() {
        let ctx = AuthContext::new(FakeBackend::default());
        let state = ctx.login("ana@example.com", "secret1").await.unwrap();
        assert!(matches!(state, AuthState::ProfileMissing { .. }));

        let reg = patient_registration();
        *ctx.backend().profile.lock().unwrap() = Some(profile_from(Uuid::new_v4(), &reg));
        let profile = ctx.retry_profile().await.unwrap();
        assert_eq!(profile.role, Role::Patient);
        assert!(ctx.state().is_authenticated());
        assert_eq!(ctx.navigate("/patient/vitals"), Navigation::Allow);
    }

    #[tokio::test]
    async fn test_register_polls_until_profile_appears() {
        let backend = FakeBackend::default();
        backend.missing_fetches.store(2, Ordering::SeqCst);
        let ctx = AuthContext::new(backend).with_retry(fast_retry(5));

        let profile = ctx.register(&patient_registration()).await.unwrap();
        assert_eq!(profile.role, Role::Patient);
        assert_eq!(profile.age, Some(54));
        assert_eq!(profile.condition.as_deref(), Some("hypertension"));
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(ctx.backend().fetches.load(Ordering::SeqCst), 3);
        assert_eq!(ctx.state().profile(), Some(&profile));
    }

    #[tokio::test]
    async fn test_register_gives_up_after_bounded_retries() {
        let backend = FakeBackend::default();
        backend.missing_fetches.store(10, Ordering::SeqCst);
        let ctx = AuthContext::new(backend).with_retry(fast_retry(3));

        let err = ctx.register(&patient_registration()).await.unwrap_err();
        assert!(matches!(err, ClientError::ProfileMissing));
        assert_eq!(ctx.backend().fetches.load(Ordering::SeqCst), 3);
        assert!(matches!(ctx.state(), AuthState::ProfileMissing { .. }));
    }

    #[tokio::test]
    async fn test_invalid_registration_never_reaches_backend() {
        let ctx = AuthContext::new(FakeBackend::default());
        let mut reg = patient_registration();
        reg.password = "123".into();
        assert!(matches!(
            ctx.register(&reg).await,
            Err(ClientError::Validation(_))
        ));
        assert!(ctx.backend().profile.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_always_signs_out() {
        let reg = patient_registration();
        let ctx = AuthContext::new(FakeBackend::default());
        *ctx.backend().profile.lock().unwrap() = Some(profile_from(Uuid::new_v4(), &reg));
        ctx.login("ana@example.com", "secret1").await.unwrap();
        assert!(ctx.state().is_authenticated());

        assert!(ctx.logout().await.is_err());
        assert_eq!(ctx.state(), AuthState::Unauthenticated);
    }
}
