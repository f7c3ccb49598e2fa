//! Session states shared by the server's `/auth/session` endpoint and the
//! client's auth context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Profile;

/// What the application knows about the current user.
///
/// A valid session without a profile row is kept apart from "not signed in"
/// so callers can offer a retry instead of bouncing the user to the login
/// page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthState {
    Loading,
    Unauthenticated,
    Authenticated { profile: Profile },
    ProfileMissing { user_id: Uuid },
}

impl AuthState {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated { profile } => Some(profile),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Backend-pushed session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Minimal view of an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: String,
}

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Returned by register and login.  `profile` is `None` when the account
/// exists but its profile row does not (yet).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
    pub profile: Option<Profile>,
}
