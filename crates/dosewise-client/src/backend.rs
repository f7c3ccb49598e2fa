//! The auth operations [`AuthContext`](crate::session::AuthContext) needs from
//! a backend.  [`HttpBackend`](crate::http::HttpBackend) is the real one;
//! tests substitute an in-memory fake.

use std::future::Future;

use dosewise_shared::auth::{AuthResponse, AuthState, Credentials};
use dosewise_shared::models::{Profile, Registration};

use crate::error::Result;

pub trait AuthBackend: Send + Sync {
    /// Current session as the backend sees it.  Never `Loading`.
    fn session(&self) -> impl Future<Output = Result<AuthState>> + Send;

    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<AuthResponse>> + Send;

    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthResponse>> + Send;

    fn logout(&self) -> impl Future<Output = Result<()>> + Send;

    /// The signed-in user's profile.  `ClientError::ProfileMissing` when the
    /// row does not exist (yet).
    fn fetch_profile(&self) -> impl Future<Output = Result<Profile>> + Send;
}
