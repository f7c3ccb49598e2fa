//! Threshold rules behind clinician alerts.
//!
//! The rules only look at already-fetched numbers; the per-patient lookups
//! that feed them live with the store-backed evaluator.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::constants::ALERT_RESOLUTION_TTL_HOURS;
use crate::models::PatientAlert;
use crate::types::{AlertKind, Severity};

/// A pending dose becomes overdue this long after its scheduled time.
pub const OVERDUE_GRACE_HOURS: i64 = 2;

/// Only blood-pressure readings this recent are considered.
pub const BP_LOOKBACK_HOURS: i64 = 24;

/// Systolic pressure above this raises an alert.
pub const HIGH_SYSTOLIC: u16 = 140;

/// Systolic pressure above this makes the alert high severity.
pub const CRITICAL_SYSTOLIC: u16 = 160;

/// More overdue doses than this makes the alert high severity.
pub const MISSED_DOSES_HIGH: usize = 2;

/// Pending doses scheduled before this instant count as overdue.
pub fn overdue_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(OVERDUE_GRACE_HOURS)
}

/// Oldest `recorded_at` considered for the blood-pressure rule.
pub fn bp_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(BP_LOOKBACK_HOURS)
}

/// Stable per-patient alert id: at most one alert of each kind per patient.
pub fn alert_id(kind: AlertKind, patient_id: Uuid) -> String {
    format!("{}_{}", kind.id_prefix(), patient_id)
}

pub fn missed_medication_alert(
    patient_id: Uuid,
    patient_name: &str,
    overdue_doses: usize,
    now: DateTime<Utc>,
) -> Option<PatientAlert> {
    if overdue_doses == 0 {
        return None;
    }

    let severity = if overdue_doses > MISSED_DOSES_HIGH {
        Severity::High
    } else {
        Severity::Medium
    };

    let noun = if overdue_doses == 1 { "dose" } else { "doses" };
    Some(PatientAlert {
        id: alert_id(AlertKind::MissedMedication, patient_id),
        patient_id,
        patient_name: patient_name.to_string(),
        kind: AlertKind::MissedMedication,
        severity,
        message: format!(
            "{overdue_doses} {noun} pending for more than {OVERDUE_GRACE_HOURS}h"
        ),
        created_at: now,
        is_resolved: false,
    })
}

pub fn high_bp_alert(
    patient_id: Uuid,
    patient_name: &str,
    systolic: u16,
    now: DateTime<Utc>,
) -> Option<PatientAlert> {
    if systolic <= HIGH_SYSTOLIC {
        return None;
    }

    let severity = if systolic > CRITICAL_SYSTOLIC {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(PatientAlert {
        id: alert_id(AlertKind::HighBp, patient_id),
        patient_id,
        patient_name: patient_name.to_string(),
        kind: AlertKind::HighBp,
        severity,
        message: format!("Systolic pressure {systolic} mmHg"),
        created_at: now,
        is_resolved: false,
    })
}

/// Whether a resolution recorded at `resolved_at` still applies.
pub fn resolution_applies(resolved_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    resolved_at <= now && now - resolved_at < Duration::hours(ALERT_RESOLUTION_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missed_medication_severity() {
        let id = Uuid::new_v4();
        let now = Utc::now();

        assert!(missed_medication_alert(id, "Ana", 0, now).is_none());

        let medium = missed_medication_alert(id, "Ana", 1, now).unwrap();
        assert_eq!(medium.severity, Severity::Medium);
        assert_eq!(medium.id, format!("missed_{id}"));
        assert_eq!(medium.kind, AlertKind::MissedMedication);

        assert_eq!(missed_medication_alert(id, "Ana", 2, now).unwrap().severity, Severity::Medium);
        assert_eq!(missed_medication_alert(id, "Ana", 3, now).unwrap().severity, Severity::High);
    }

    #[test]
    fn test_high_bp_severity() {
        let id = Uuid::new_v4();
        let now = Utc::now();

        assert!(high_bp_alert(id, "Ana", 140, now).is_none());

        let medium = high_bp_alert(id, "Ana", 150, now).unwrap();
        assert_eq!(medium.severity, Severity::Medium);
        assert_eq!(medium.id, format!("bp_{id}"));

        assert_eq!(high_bp_alert(id, "Ana", 160, now).unwrap().severity, Severity::Medium);
        assert_eq!(high_bp_alert(id, "Ana", 170, now).unwrap().severity, Severity::High);
    }

    #[test]
    fn test_windows() {
        let now = Utc::now();
        assert_eq!(now - overdue_cutoff(now), Duration::hours(2));
        assert_eq!(now - bp_window_start(now), Duration::hours(24));
    }

    #[test]
    fn test_resolution_expires() {
        let now = Utc::now();
        assert!(resolution_applies(now - Duration::hours(1), now));
        assert!(!resolution_applies(now - Duration::hours(25), now));
    }
}
