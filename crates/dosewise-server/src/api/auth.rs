//! Registration, login, sessions and the caller's own profile.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use tracing::{info, warn};

use dosewise_shared::auth::{AuthResponse, AuthState, Credentials};
use dosewise_shared::models::{normalize_email, Profile, ProfileUpdate, Registration};
use dosewise_shared::validation::{
    validate_credentials, validate_profile_update, validate_registration,
};
use dosewise_store::{NewAccount, StoreError, EMAIL_TAKEN};

use super::AppState;
use crate::auth::{generate_token, hash_token, CurrentSession, CurrentUser};
use crate::error::{ServerError, EMAIL_TAKEN_MESSAGE};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/profile", get(get_profile).patch(update_profile))
}

fn join_error(e: tokio::task::JoinError) -> ServerError {
    ServerError::Internal(format!("password task failed: {e}"))
}

/// Issue a session for `user_id` and return the raw token.
fn open_session(
    db: &dosewise_store::Database,
    user_id: uuid::Uuid,
    ttl_hours: i64,
) -> Result<String, ServerError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    db.create_session(&hash_token(&token), user_id, expires_at)?;
    Ok(token)
}

async fn register(
    State(state): State<AppState>,
    Json(reg): Json<Registration>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    if !state.config.registration_open {
        return Err(ServerError::Forbidden(
            "Registration is closed on this instance".into(),
        ));
    }
    validate_registration(&reg)?;

    let email = reg.normalized_email();
    let hasher = state.hasher;
    let password = reg.password.clone();
    let (password_hash, salt) = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(join_error)?;

    let db = state.db.lock().await;
    let profile = db
        .create_account(&NewAccount {
            email: &email,
            password_hash: &password_hash,
            salt: &salt,
            name: &reg.name,
            details: &reg.details,
        })
        .map_err(|e| match e {
            StoreError::Conflict(rule) if rule == EMAIL_TAKEN => {
                ServerError::Conflict(EMAIL_TAKEN_MESSAGE.to_string())
            }
            other => other.into(),
        })?;
    let token = open_session(&db, profile.id, state.config.session_ttl_hours)?;
    drop(db);

    info!(user_id = %profile.id, role = %profile.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id: profile.id,
            profile: Some(profile),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Json<AuthResponse>, ServerError> {
    validate_credentials(&creds.email, &creds.password)?;
    let email = normalize_email(&creds.email);

    state
        .login_throttle
        .acquire(email.clone())
        .await
        .map_err(|retry_after| ServerError::RateLimited { retry_after })?;

    let stored = match state.db.lock().await.credentials_by_email(&email) {
        Ok(stored) => stored,
        Err(StoreError::NotFound) => return Err(ServerError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    let hasher = state.hasher;
    let password = creds.password;
    let (hash, salt) = (stored.password_hash.clone(), stored.salt.clone());
    let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash, &salt))
        .await
        .map_err(join_error)?;
    if !valid {
        warn!(user_id = %stored.user_id, "login with wrong password");
        return Err(ServerError::InvalidCredentials);
    }
    state.login_throttle.reset(&email).await;

    let db = state.db.lock().await;
    let token = open_session(&db, stored.user_id, state.config.session_ttl_hours)?;
    let profile = db.find_profile(stored.user_id)?;
    drop(db);

    info!(user_id = %stored.user_id, has_profile = profile.is_some(), "user logged in");
    Ok(Json(AuthResponse {
        token,
        user_id: stored.user_id,
        profile,
    }))
}

async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<StatusCode, ServerError> {
    state.db.lock().await.delete_session(&session.token_hash)?;
    info!(user_id = %session.user_id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Start-up session check.  Never fails with 401: a missing or expired token
/// is reported as `unauthenticated`.
async fn session(
    State(state): State<AppState>,
    session: Option<CurrentSession>,
) -> Result<Json<AuthState>, ServerError> {
    let Some(session) = session else {
        return Ok(Json(AuthState::Unauthenticated));
    };

    let profile = state.db.lock().await.find_profile(session.user_id)?;
    Ok(Json(match profile {
        Some(profile) => AuthState::Authenticated { profile },
        None => AuthState::ProfileMissing {
            user_id: session.user_id,
        },
    }))
}

async fn get_profile(CurrentUser(profile): CurrentUser) -> Json<Profile> {
    Json(profile)
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ServerError> {
    validate_profile_update(&update)?;
    let updated = state.db.lock().await.update_profile(profile.id, &update)?;
    Ok(Json(updated))
}
