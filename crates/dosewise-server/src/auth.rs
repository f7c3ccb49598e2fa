//! Password hashing, session tokens and the request extractors that turn a
//! bearer token into the caller's identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use dosewise_shared::models::Profile;
use dosewise_shared::types::Role;

use crate::api::AppState;
use crate::error::ServerError;

const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;
const TOKEN_LENGTH: usize = 32;
const HASH_SCHEME: &str = "pbkdf2-sha256";

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// PBKDF2-HMAC-SHA256 with a per-account random salt.
///
/// Stored hashes carry their iteration count (`pbkdf2-sha256$<n>$<hex>`), so
/// changing the configured count only affects new accounts.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Returns `(encoded_hash, salt_hex)`.
    pub fn hash(&self, password: &str) -> (String, String) {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = derive(password, &salt, self.iterations);
        (
            format!("{HASH_SCHEME}${}${}", self.iterations, hex::encode(key)),
            hex::encode(salt),
        )
    }

    pub fn verify(&self, password: &str, encoded: &str, salt_hex: &str) -> bool {
        let mut parts = encoded.splitn(3, '$');
        let (Some(HASH_SCHEME), Some(iterations), Some(expected_hex)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let (Ok(iterations), Ok(expected), Ok(salt)) = (
            iterations.parse::<u32>(),
            hex::decode(expected_hex),
            hex::decode(salt_hex),
        ) else {
            return false;
        };

        let actual = derive(password, &salt, iterations);
        expected.len() == actual.len() && actual[..].ct_eq(&expected[..]).unwrap_u8() == 1
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

// ---------------------------------------------------------------------------
// Session tokens
// ---------------------------------------------------------------------------

/// Random opaque bearer token, URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Only this digest is stored, never the token itself.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// A valid, unexpired session.  Does not require a profile.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user_id: Uuid,
    pub email: String,
    pub token_hash: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ServerError::Unauthorized)?;
        let token_hash = hash_token(token);

        let db = state.db.lock().await;
        let session = db
            .find_session(&token_hash, Utc::now())?
            .ok_or(ServerError::Unauthorized)?;

        Ok(Self {
            user_id: session.user_id,
            email: session.email,
            token_hash,
        })
    }
}

/// Signed-in caller with a profile.  A session without a profile is rejected
/// with `PROFILE_MISSING`, never with a plain 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Profile);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        let db = state.db.lock().await;
        db.find_profile(session.user_id)?
            .map(CurrentUser)
            .ok_or(ServerError::ProfileMissing(session.user_id))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: Role,
) -> Result<Profile, ServerError> {
    let CurrentUser(profile) = CurrentUser::from_request_parts(parts, state).await?;
    if profile.role != role {
        return Err(ServerError::Forbidden(format!("requires the {role} role")));
    }
    Ok(profile)
}

/// Caller with the patient role.
#[derive(Debug, Clone)]
pub struct PatientUser(pub Profile);

#[axum::async_trait]
impl FromRequestParts<AppState> for PatientUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Patient).await.map(PatientUser)
    }
}

/// Caller with the clinic role.
#[derive(Debug, Clone)]
pub struct ClinicUser(pub Profile);

#[axum::async_trait]
impl FromRequestParts<AppState> for ClinicUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Clinic).await.map(ClinicUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(1_000);
        let (hash, salt) = hasher.hash("secret1");

        assert!(hash.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("secret1", &hash, &salt));
        assert!(!hasher.verify("secret2", &hash, &salt));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new(1_000);
        let (h1, s1) = hasher.hash("same");
        let (h2, s2) = hasher.hash("same");
        assert_ne!(s1, s2);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_verify_uses_stored_iterations() {
        let (hash, salt) = PasswordHasher::new(1_000).hash("secret1");
        assert!(PasswordHasher::new(5_000).verify("secret1", &hash, &salt));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = PasswordHasher::new(1_000);
        assert!(!hasher.verify("x", "", "00"));
        assert!(!hasher.verify("x", "md5$1$abcd", "00"));
        assert!(!hasher.verify("x", "pbkdf2-sha256$abc$00", "00"));
    }

    #[test]
    fn test_tokens() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));

        let hashed = hash_token(&a);
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hash_token(&a));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }
}
