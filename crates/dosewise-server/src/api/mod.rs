//! HTTP API.
//!
//! Handlers are grouped by caller: [`auth`] (anyone), [`patient`] (role
//! `patient`) and [`clinic`] (role `clinic`).  Every handler takes the store
//! lock for the duration of its database work and never across an `.await`
//! on anything else.

mod auth;
mod clinic;
mod patient;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Method,
    middleware,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use dosewise_shared::api::{DefaultTimes, RefreshHints, ServerInfo};
use dosewise_shared::constants::{
    CLINIC_ALERTS_REFRESH_SECS, SHARED_PATIENTS_REFRESH_SECS, TODAY_LOGS_REFRESH_SECS,
};
use dosewise_shared::schedule::{default_times, Frequency};
use dosewise_store::Database;

use crate::auth::PasswordHasher;
use crate::config::ServerConfig;
use crate::rate_limit::{login_throttle, rate_limit_middleware, LoginThrottle, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub hasher: PasswordHasher,
    pub login_throttle: LoginThrottle,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            hasher: PasswordHasher::new(config.password_iterations),
            login_throttle: login_throttle(),
            rate_limiter: RateLimiter::default(),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/schedule/default-times", get(schedule_default_times))
        .merge(auth::routes())
        .merge(patient::routes())
        .merge(clinic::routes())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct DefaultTimesQuery {
    #[serde(default)]
    frequency: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        registration_open: state.config.registration_open,
        refresh: RefreshHints {
            shared_patients_secs: SHARED_PATIENTS_REFRESH_SECS,
            clinic_alerts_secs: CLINIC_ALERTS_REFRESH_SECS,
            today_logs_secs: TODAY_LOGS_REFRESH_SECS,
        },
    })
}

async fn schedule_default_times(Query(query): Query<DefaultTimesQuery>) -> Json<DefaultTimes> {
    Json(DefaultTimes {
        recognized: Frequency::from_label(&query.frequency).is_some(),
        times: default_times(&query.frequency),
        frequency: query.frequency,
    })
}

/// Start the HTTP server and block until it exits.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::test_support::*;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_info_carries_refresh_hints() {
        let (app, _) = test_app();
        let (_, body) = send(&app, Method::GET, "/info", None, None).await;
        assert_eq!(body["name"], "Dosewise");
        assert_eq!(body["refresh"]["shared_patients_secs"], 30);
        assert_eq!(body["refresh"]["clinic_alerts_secs"], 60);
        assert_eq!(body["refresh"]["today_logs_secs"], 60);
    }

    #[tokio::test]
    async fn test_default_times() {
        let (app, _) = test_app();
        let (status, body) = send(
            &app,
            Method::GET,
            "/schedule/default-times?frequency=8/8h",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recognized"], true);
        assert_eq!(body["times"], serde_json::json!(["08:00", "16:00", "00:00"]));

        let (_, body) = send(
            &app,
            Method::GET,
            "/schedule/default-times?frequency=xyz",
            None,
            None,
        )
        .await;
        assert_eq!(body["recognized"], false);
        assert_eq!(body["times"], serde_json::json!(["08:00"]));
    }
}
