//! Clinician-side aggregation: the alert evaluator and the patient roster.
//!
//! Both walk the clinician's active sharing grants in sequence and stop at the
//! first failing lookup.  No partial result is ever returned.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use dosewise_shared::adherence::Adherence;
use dosewise_shared::alerts::{
    bp_window_start, high_bp_alert, missed_medication_alert, overdue_cutoff, resolution_applies,
};
use dosewise_shared::api::RosterEntry;
use dosewise_shared::constants::ALERT_RESOLUTION_TTL_HOURS;
use dosewise_shared::models::PatientAlert;
use dosewise_shared::types::VitalKind;
use dosewise_store::{
    AlertResolutionRepository, DoseLogRepository, Result, SharingRepository, VitalRepository,
};

/// Compute the current alerts for every patient sharing with `doctor_id`.
///
/// Per patient, at most one `missed_medication` and one `high_bp` alert.
pub fn evaluate_alerts<R>(repo: &R, doctor_id: Uuid, now: DateTime<Utc>) -> Result<Vec<PatientAlert>>
where
    R: SharingRepository + DoseLogRepository + VitalRepository,
{
    let patients = repo.shared_patients(doctor_id)?;
    let cutoff = overdue_cutoff(now);
    let window_start = bp_window_start(now);

    let mut alerts = Vec::new();
    for shared in &patients {
        let patient = &shared.profile;

        let overdue = repo.count_overdue_pending(patient.id, cutoff)?;
        alerts.extend(missed_medication_alert(patient.id, &patient.name, overdue, now));

        let latest_bp = repo.latest_vital_since(patient.id, VitalKind::BloodPressure, window_start)?;
        if let Some(systolic) = latest_bp.and_then(|v| v.reading.systolic()) {
            alerts.extend(high_bp_alert(patient.id, &patient.name, systolic, now));
        }
    }

    tracing::debug!(
        %doctor_id,
        patients = patients.len(),
        alerts = alerts.len(),
        "alerts evaluated"
    );
    Ok(alerts)
}

/// Mark alerts the clinician resolved within the last
/// `ALERT_RESOLUTION_TTL_HOURS` and order the list by severity, highest first.
pub fn apply_resolutions<R>(
    repo: &R,
    doctor_id: Uuid,
    mut alerts: Vec<PatientAlert>,
    now: DateTime<Utc>,
) -> Result<Vec<PatientAlert>>
where
    R: AlertResolutionRepository,
{
    let since = now - Duration::hours(ALERT_RESOLUTION_TTL_HOURS);
    let resolutions = repo.alert_resolutions(doctor_id, since)?;

    for alert in &mut alerts {
        alert.is_resolved = resolutions
            .iter()
            .any(|r| r.alert_id == alert.id && resolution_applies(r.resolved_at, now));
    }

    alerts.sort_by(|a, b| {
        a.is_resolved
            .cmp(&b.is_resolved)
            .then(b.severity.cmp(&a.severity))
            .then(a.patient_name.cmp(&b.patient_name))
    });
    Ok(alerts)
}

/// Adherence over the `days` days before `now`.
pub fn adherence_since<R>(repo: &R, user_id: Uuid, days: u32, now: DateTime<Utc>) -> Result<Adherence>
where
    R: DoseLogRepository,
{
    let from = now - Duration::days(i64::from(days));
    let statuses = repo.dose_statuses_between(user_id, from, now)?;
    Ok(Adherence::from_statuses(statuses))
}

pub fn build_roster<R>(
    repo: &R,
    doctor_id: Uuid,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<RosterEntry>>
where
    R: SharingRepository + DoseLogRepository,
{
    repo.shared_patients(doctor_id)?
        .into_iter()
        .map(|shared| {
            let adherence = adherence_since(repo, shared.profile.id, days, now)?;
            Ok(RosterEntry {
                sharing_id: shared.sharing_id,
                shared_at: shared.shared_at,
                patient: shared.profile,
                adherence: adherence.into(),
            })
        })
        .collect()
}
