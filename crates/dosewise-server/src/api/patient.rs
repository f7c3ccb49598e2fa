//! Patient endpoints: medications and their schedule, dose logs, adherence,
//! vitals, sharing grants and the history report.
//!
//! Records owned by someone else answer 404, the same as records that do not
//! exist.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use dosewise_shared::adherence::vital_trend;
use dosewise_shared::api::{AdherenceReport, MedicationDetail, ShareRequest, VitalTrendReport};
use dosewise_shared::constants::DEFAULT_ADHERENCE_DAYS;
use dosewise_shared::schedule::resolve_times;
use dosewise_shared::models::{
    DoseEntry, Medication, MedicationInput, MedicationLog, MedicationTime, SharedProfile, Sharing,
    Vital, VitalInput,
};
use dosewise_shared::types::{DoseStatus, VitalKind};
use dosewise_shared::validation::{validate_medication, validate_vital};
use dosewise_store::{Database, StoreError, SHARING_EXISTS};

use super::AppState;
use crate::auth::PatientUser;
use crate::clinic::adherence_since;
use crate::error::{ServerError, ALREADY_SHARED_MESSAGE};
use crate::report::{self, HistoryReport};

/// Longest range accepted by `GET /logs` and `GET /adherence`.
const MAX_RANGE_DAYS: u32 = 366;

const DEFAULT_VITALS_LIMIT: usize = 100;
const MAX_VITALS_LIMIT: usize = 1000;

/// History covered by the PDF report.
const REPORT_DAYS: u32 = 30;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/medications", get(list_medications).post(create_medication))
        .route(
            "/medications/:id",
            get(get_medication)
                .put(update_medication)
                .delete(delete_medication),
        )
        .route("/medications/:id/times", get(medication_times))
        .route("/logs/today", get(logs_today))
        .route("/logs", get(logs_in_range))
        .route("/logs/:id/taken", post(mark_taken))
        .route("/logs/:id/skipped", post(mark_skipped))
        .route("/adherence", get(adherence))
        .route("/vitals", get(list_vitals).post(create_vital))
        .route("/vitals/trend", get(vitals_trend))
        .route("/vitals/:id", put(update_vital).delete(delete_vital))
        .route("/sharing", get(list_sharing).post(share_with_doctor))
        .route("/sharing/:doctor_id", axum::routing::delete(stop_sharing))
        .route("/report.pdf", get(history_report))
}

// ---------------------------------------------------------------------------
// Medications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MedicationQuery {
    #[serde(default)]
    include_inactive: bool,
}

fn owned_medication(db: &Database, id: Uuid, user_id: Uuid) -> Result<Medication, ServerError> {
    let medication = db.get_medication(id)?;
    if medication.user_id != user_id {
        return Err(ServerError::NotFound("medication not found".into()));
    }
    Ok(medication)
}

fn detail(db: &Database, medication: Medication) -> Result<MedicationDetail, ServerError> {
    let custom_times: Vec<_> = db
        .medication_times(medication.id)?
        .into_iter()
        .map(|t| t.time_of_day)
        .collect();
    let times = resolve_times(&medication.frequency, &custom_times);
    Ok(MedicationDetail {
        medication,
        times,
        custom_times,
    })
}

async fn list_medications(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Query(query): Query<MedicationQuery>,
) -> Result<Json<Vec<Medication>>, ServerError> {
    let medications = state
        .db
        .lock()
        .await
        .list_medications(user.id, !query.include_inactive)?;
    Ok(Json(medications))
}

async fn create_medication(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Json(input): Json<MedicationInput>,
) -> Result<(StatusCode, Json<MedicationDetail>), ServerError> {
    validate_medication(&input)?;

    let db = state.db.lock().await;
    let (medication, logs) = db.create_medication_with_schedule(user.id, &input)?;
    let detail = detail(&db, medication)?;
    drop(db);

    info!(user_id = %user.id, medication_id = %detail.medication.id, logs, "medication created");
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn get_medication(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationDetail>, ServerError> {
    let db = state.db.lock().await;
    let medication = owned_medication(&db, id, user.id)?;
    Ok(Json(detail(&db, medication)?))
}

/// Replace a medication.  The schedule is rebuilt from now on; past logs are
/// kept.
async fn update_medication(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<MedicationDetail>, ServerError> {
    validate_medication(&input)?;

    let db = state.db.lock().await;
    let existing = owned_medication(&db, id, user.id)?;
    if !existing.is_active {
        return Err(ServerError::Conflict("medication is no longer active".into()));
    }
    let (medication, logs) = db.update_medication_with_schedule(id, &input)?;
    info!(user_id = %user.id, medication_id = %id, logs, "medication rescheduled");
    Ok(Json(detail(&db, medication)?))
}

async fn delete_medication(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let db = state.db.lock().await;
    owned_medication(&db, id, user.id)?;
    db.deactivate_medication(id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn medication_times(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MedicationTime>>, ServerError> {
    let db = state.db.lock().await;
    owned_medication(&db, id, user.id)?;
    Ok(Json(db.medication_times(id)?))
}

// ---------------------------------------------------------------------------
// Dose logs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: NaiveDate,
    /// Inclusive.
    to: NaiveDate,
}

async fn logs_today(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
) -> Result<Json<Vec<DoseEntry>>, ServerError> {
    let today = Utc::now().date_naive();
    Ok(Json(state.db.lock().await.logs_for_day(user.id, today)?))
}

async fn logs_in_range(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<MedicationLog>>, ServerError> {
    if range.to < range.from {
        return Err(ServerError::BadRequest("`to` is before `from`".into()));
    }
    if (range.to - range.from).num_days() >= i64::from(MAX_RANGE_DAYS) {
        return Err(ServerError::BadRequest(format!(
            "range is limited to {MAX_RANGE_DAYS} days"
        )));
    }

    let from = range.from.and_time(chrono::NaiveTime::MIN).and_utc();
    let to = (range.to + Duration::days(1)).and_time(chrono::NaiveTime::MIN).and_utc();
    Ok(Json(state.db.lock().await.logs_between(user.id, from, to)?))
}

async fn set_status(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    status: DoseStatus,
) -> Result<Json<MedicationLog>, ServerError> {
    let db = state.db.lock().await;
    let log = db.get_log(id)?;
    if log.user_id != user_id {
        return Err(ServerError::NotFound("dose not found".into()));
    }
    let updated = db.set_log_status(id, status, Utc::now())?;
    tracing::debug!(log_id = %id, %status, "dose marked");
    Ok(Json(updated))
}

async fn mark_taken(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationLog>, ServerError> {
    set_status(state, user.id, id, DoseStatus::Taken).await
}

async fn mark_skipped(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationLog>, ServerError> {
    set_status(state, user.id, id, DoseStatus::Skipped).await
}

#[derive(Debug, Deserialize)]
struct AdherenceQuery {
    days: Option<u32>,
}

async fn adherence(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Query(query): Query<AdherenceQuery>,
) -> Result<Json<AdherenceReport>, ServerError> {
    let days = query.days.unwrap_or(DEFAULT_ADHERENCE_DAYS);
    if days == 0 || days > MAX_RANGE_DAYS {
        return Err(ServerError::BadRequest(format!(
            "days must be between 1 and {MAX_RANGE_DAYS}"
        )));
    }

    let adherence = adherence_since(&*state.db.lock().await, user.id, days, Utc::now())?;
    Ok(Json(AdherenceReport {
        days,
        summary: adherence.into(),
    }))
}

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VitalsQuery {
    #[serde(rename = "type")]
    kind: Option<VitalKind>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TrendQuery {
    #[serde(rename = "type")]
    kind: VitalKind,
}

fn owned_vital(db: &Database, id: Uuid, user_id: Uuid) -> Result<Vital, ServerError> {
    let vital = db.get_vital(id)?;
    if vital.user_id != user_id {
        return Err(ServerError::NotFound("vital not found".into()));
    }
    Ok(vital)
}

async fn list_vitals(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Query(query): Query<VitalsQuery>,
) -> Result<Json<Vec<Vital>>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_VITALS_LIMIT)
        .clamp(1, MAX_VITALS_LIMIT);
    let vitals = state.db.lock().await.list_vitals(user.id, query.kind, limit)?;
    Ok(Json(vitals))
}

async fn create_vital(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Json(input): Json<VitalInput>,
) -> Result<(StatusCode, Json<Vital>), ServerError> {
    validate_vital(&input)?;
    let vital = state.db.lock().await.insert_vital(user.id, &input)?;
    tracing::debug!(user_id = %user.id, kind = %vital.reading.kind(), "vital recorded");
    Ok((StatusCode::CREATED, Json(vital)))
}

async fn update_vital(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
    Json(input): Json<VitalInput>,
) -> Result<Json<Vital>, ServerError> {
    validate_vital(&input)?;
    let db = state.db.lock().await;
    owned_vital(&db, id, user.id)?;
    Ok(Json(db.update_vital(id, &input)?))
}

async fn delete_vital(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let db = state.db.lock().await;
    owned_vital(&db, id, user.id)?;
    db.delete_vital(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change between the two latest readings of one type.
async fn vitals_trend(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Query(query): Query<TrendQuery>,
) -> Result<Json<VitalTrendReport>, ServerError> {
    let mut recent = state
        .db
        .lock()
        .await
        .list_vitals(user.id, Some(query.kind), 2)?;
    recent.reverse();

    let samples: Vec<f64> = recent.iter().map(|v| v.reading.primary_value()).collect();
    Ok(Json(VitalTrendReport {
        kind: query.kind,
        trend: vital_trend(&samples),
        latest: recent.pop(),
    }))
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

async fn list_sharing(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
) -> Result<Json<Vec<SharedProfile>>, ServerError> {
    Ok(Json(state.db.lock().await.shared_doctors(user.id)?))
}

async fn share_with_doctor(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Json(request): Json<ShareRequest>,
) -> Result<(StatusCode, Json<Sharing>), ServerError> {
    if request.doctor_code.trim().is_empty() {
        let mut errors = dosewise_shared::validation::ValidationErrors::default();
        errors.push("doctor_code", "required");
        return Err(errors.into());
    }

    let db = state.db.lock().await;
    let doctor = db.clinic_by_doctor_code(&request.doctor_code).map_err(|e| match e {
        StoreError::NotFound => ServerError::NotFound("no clinician with this code".into()),
        other => other.into(),
    })?;
    let sharing = db.grant_sharing(user.id, doctor.id).map_err(|e| match e {
        StoreError::Conflict(rule) if rule == SHARING_EXISTS => {
            ServerError::Conflict(ALREADY_SHARED_MESSAGE.to_string())
        }
        other => other.into(),
    })?;
    Ok((StatusCode::CREATED, Json(sharing)))
}

async fn stop_sharing(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    if !state.db.lock().await.revoke_sharing(user.id, doctor_id)? {
        return Err(ServerError::NotFound("no active sharing with this clinician".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

async fn history_report(
    State(state): State<AppState>,
    PatientUser(user): PatientUser,
) -> Result<impl IntoResponse, ServerError> {
    let now = Utc::now();
    let from = now - Duration::days(i64::from(REPORT_DAYS));

    let db = state.db.lock().await;
    let history = HistoryReport {
        medications: db.list_medications(user.id, false)?,
        adherence: adherence_since(&*db, user.id, REPORT_DAYS, now)?.into(),
        adherence_days: REPORT_DAYS,
        logs: db.logs_between(user.id, from, now)?,
        vitals: db.list_vitals(user.id, None, DEFAULT_VITALS_LIMIT)?,
        profile: user,
        generated_at: now,
    };
    drop(db);

    let pdf = tokio::task::spawn_blocking(move || report::render(&history))
        .await
        .map_err(|e| ServerError::Internal(format!("report task failed: {e}")))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"historico-medicacao.pdf\"",
            ),
        ],
        pdf,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use crate::api::test_support::*;

    fn tomorrow() -> String {
        (Utc::now().date_naive() + Duration::days(1)).to_string()
    }

    async fn create_medication(app: &axum::Router, token: &str, body: Value) -> Value {
        let (status, med) = send(app, Method::POST, "/medications", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{med}");
        med
    }

    #[tokio::test]
    async fn test_medication_with_default_times() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;

        let med = create_medication(
            &app,
            &token,
            json!({
                "name": "Metformina",
                "dosage": "500mg",
                "frequency": "12/12h",
                "start_date": tomorrow()
            }),
        )
        .await;
        assert_eq!(med["times"], json!(["08:00", "20:00"]));
        assert_eq!(med["custom_times"], json!([]));

        let uri = format!("/medications/{}/times", med["id"].as_str().unwrap());
        let (_, times) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert!(times.as_array().unwrap().is_empty());

        let uri = format!("/logs?from={0}&to={0}", tomorrow());
        let (status, logs) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l["status"] == "pending"));

        let taken_uri = format!("/logs/{}/taken", logs[0]["id"].as_str().unwrap());
        let (status, log) = send(&app, Method::POST, &taken_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log["status"], "taken");
        assert!(log["taken_at"].is_string());
    }

    #[tokio::test]
    async fn test_medication_with_custom_times() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;

        let med = create_medication(
            &app,
            &token,
            json!({
                "name": "Losartana",
                "dosage": "50mg",
                "frequency": "8/8h",
                "start_date": tomorrow(),
                "custom_times": ["21:30", "07:00"]
            }),
        )
        .await;
        assert_eq!(med["times"], json!(["07:00", "21:30"]));
        assert_eq!(med["custom_times"], json!(["07:00", "21:30"]));

        let uri = format!("/medications/{}/times", med["id"].as_str().unwrap());
        let (_, times) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(times.as_array().unwrap().len(), 2);
        assert_eq!(times[0]["time_of_day"], "07:00");
    }

    #[tokio::test]
    async fn test_update_back_to_defaults_clears_custom_times() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let med = create_medication(
            &app,
            &token,
            json!({
                "name": "Losartana",
                "dosage": "50mg",
                "frequency": "12/12h",
                "start_date": tomorrow(),
                "custom_times": ["09:30"]
            }),
        )
        .await;

        let uri = format!("/medications/{}", med["id"].as_str().unwrap());
        let body = json!({
            "name": "Losartana",
            "dosage": "100mg",
            "frequency": "12/12h",
            "start_date": tomorrow()
        });
        let (status, updated) = send(&app, Method::PUT, &uri, Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["dosage"], "100mg");
        assert_eq!(updated["times"], json!(["08:00", "20:00"]));
        assert_eq!(updated["custom_times"], json!([]));

        let logs_uri = format!("/logs?from={0}&to={0}", tomorrow());
        let (_, logs) = send(&app, Method::GET, &logs_uri, Some(&token), None).await;
        assert_eq!(logs.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_active_list() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let med = create_medication(
            &app,
            &token,
            json!({
                "name": "Sinvastatina",
                "dosage": "20mg",
                "frequency": "1x ao dia",
                "start_date": tomorrow()
            }),
        )
        .await;
        let uri = format!("/medications/{}", med["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, active) = send(&app, Method::GET, "/medications", Some(&token), None).await;
        assert!(active.as_array().unwrap().is_empty());

        let (_, all) = send(
            &app,
            Method::GET,
            "/medications?include_inactive=true",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(all[0]["is_active"], false);
    }

    #[tokio::test]
    async fn test_other_patients_records_are_not_found() {
        let (app, _) = test_app();
        let (ana, _) = register_patient(&app, "ana@example.com").await;
        let (bia, _) = register_patient(&app, "bia@example.com").await;
        let med = create_medication(
            &app,
            &ana,
            json!({
                "name": "Metformina",
                "dosage": "500mg",
                "frequency": "12/12h",
                "start_date": tomorrow()
            }),
        )
        .await;

        let uri = format!("/medications/{}", med["id"].as_str().unwrap());
        let (status, body) = send(&app, Method::GET, &uri, Some(&bia), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_medication_is_rejected() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/medications",
            Some(&token),
            Some(json!({
                "name": "",
                "dosage": "500mg",
                "frequency": "12/12h",
                "start_date": "2026-05-10",
                "end_date": "2026-05-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["error"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"end_date"));
    }

    #[tokio::test]
    async fn test_adherence_defaults_to_a_week() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let (status, body) = send(&app, Method::GET, "/adherence", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], 7);
        assert_eq!(body["percentage"], 0);
        assert_eq!(body["total"], 0);

        let (status, _) = send(&app, Method::GET, "/adherence?days=0", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vitals_and_trend() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let now = Utc::now();

        for (hours_ago, value) in [(2, 80.0), (1, 88.0)] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/vitals",
                Some(&token),
                Some(json!({
                    "type": "weight",
                    "value": value,
                    "unit": "kg",
                    "recorded_at": now - Duration::hours(hours_ago)
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, trend) = send(
            &app,
            Method::GET,
            "/vitals/trend?type=weight",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trend["direction"], "up");
        assert_eq!(trend["percent_change"], 10.0);
        assert_eq!(trend["latest"]["value"], 88.0);

        let (status, _) = send(
            &app,
            Method::POST,
            "/vitals",
            Some(&token),
            Some(json!({"type": "blood_pressure", "systolic": 80, "diastolic": 120})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_sharing_by_doctor_code() {
        let (app, _) = test_app();
        let (patient, _) = register_patient(&app, "ana@example.com").await;
        let (_, clinic) = register_clinic(&app, "paulo@example.com").await;
        let code = clinic["profile"]["doctor_code"].as_str().unwrap().to_lowercase();

        let share = json!({ "doctor_code": code });
        let (status, _) =
            send(&app, Method::POST, "/sharing", Some(&patient), Some(share.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&app, Method::POST, "/sharing", Some(&patient), Some(share)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["error"]["message"],
            crate::error::ALREADY_SHARED_MESSAGE
        );

        let (_, doctors) = send(&app, Method::GET, "/sharing", Some(&patient), None).await;
        assert_eq!(doctors[0]["profile"]["name"], "Dr. Paulo Lima");

        let uri = format!("/sharing/{}", clinic["user_id"].as_str().unwrap());
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&patient), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&patient), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_doctor_code() {
        let (app, _) = test_app();
        let (patient, _) = register_patient(&app, "ana@example.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/sharing",
            Some(&patient),
            Some(json!({"doctor_code": "ZZZ0000"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clinic_cannot_use_patient_routes() {
        let (app, _) = test_app();
        let (clinic, _) = register_clinic(&app, "paulo@example.com").await;
        let (status, body) = send(&app, Method::GET, "/medications", Some(&clinic), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_report_is_a_pdf() {
        let (app, _) = test_app();
        let (token, _) = register_patient(&app, "ana@example.com").await;
        let (status, bytes) = send_raw(&app, Method::GET, "/report.pdf", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF"));
    }
}
