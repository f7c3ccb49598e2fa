//! Clinician endpoints.  Every patient-scoped lookup first checks for an
//! active sharing grant.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use dosewise_shared::api::{PatientDetail, RosterEntry};
use dosewise_shared::constants::DEFAULT_ADHERENCE_DAYS;
use dosewise_shared::models::{AlertResolution, PatientAlert};
use dosewise_shared::types::AlertKind;
use dosewise_store::Database;

use super::AppState;
use crate::auth::ClinicUser;
use crate::clinic::{adherence_since, apply_resolutions, build_roster, evaluate_alerts};
use crate::error::ServerError;

/// Readings shown on the patient detail view.
const DETAIL_VITALS: usize = 20;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinic/patients", get(roster))
        .route(
            "/clinic/patients/:id",
            get(patient_detail).delete(revoke_patient),
        )
        .route("/clinic/alerts", get(alerts))
        .route("/clinic/alerts/:alert_id/resolve", post(resolve_alert))
}

fn require_sharing(db: &Database, patient_id: Uuid, doctor_id: Uuid) -> Result<(), ServerError> {
    if db.has_active_sharing(patient_id, doctor_id)? {
        Ok(())
    } else {
        Err(ServerError::NoAccess)
    }
}

async fn roster(
    State(state): State<AppState>,
    ClinicUser(doctor): ClinicUser,
) -> Result<Json<Vec<RosterEntry>>, ServerError> {
    let db = state.db.lock().await;
    let entries = build_roster(&*db, doctor.id, DEFAULT_ADHERENCE_DAYS, Utc::now())?;
    Ok(Json(entries))
}

async fn patient_detail(
    State(state): State<AppState>,
    ClinicUser(doctor): ClinicUser,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientDetail>, ServerError> {
    let now = Utc::now();
    let db = state.db.lock().await;
    require_sharing(&db, patient_id, doctor.id)?;

    Ok(Json(PatientDetail {
        profile: db.get_profile(patient_id)?,
        adherence: adherence_since(&*db, patient_id, DEFAULT_ADHERENCE_DAYS, now)?.into(),
        medications: db.list_medications(patient_id, true)?,
        today: db.logs_for_day(patient_id, now.date_naive())?,
        vitals: db.list_vitals(patient_id, None, DETAIL_VITALS)?,
    }))
}

/// Stop following a patient.  Same effect as the patient revoking.
async fn revoke_patient(
    State(state): State<AppState>,
    ClinicUser(doctor): ClinicUser,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    if !state.db.lock().await.revoke_sharing(patient_id, doctor.id)? {
        return Err(ServerError::NoAccess);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn alerts(
    State(state): State<AppState>,
    ClinicUser(doctor): ClinicUser,
) -> Result<Json<Vec<PatientAlert>>, ServerError> {
    let now = Utc::now();
    let db = state.db.lock().await;
    let alerts = evaluate_alerts(&*db, doctor.id, now)?;
    let alerts = apply_resolutions(&*db, doctor.id, alerts, now)?;
    Ok(Json(alerts))
}

/// Alert ids are a known kind prefix and the patient id (`missed_<uuid>`,
/// `bp_<uuid>`).
fn alert_patient(alert_id: &str) -> Option<Uuid> {
    let (prefix, patient) = alert_id.rsplit_once('_')?;
    AlertKind::from_id_prefix(prefix)?;
    patient.parse().ok()
}

async fn resolve_alert(
    State(state): State<AppState>,
    ClinicUser(doctor): ClinicUser,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertResolution>, ServerError> {
    let patient_id = alert_patient(&alert_id)
        .ok_or_else(|| ServerError::BadRequest(format!("malformed alert id: {alert_id}")))?;

    let db = state.db.lock().await;
    require_sharing(&db, patient_id, doctor.id)?;
    let resolution = db.resolve_alert(doctor.id, &alert_id, Utc::now())?;
    drop(db);

    info!(doctor_id = %doctor.id, %alert_id, "alert resolved");
    Ok(Json(resolution))
}
