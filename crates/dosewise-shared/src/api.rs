//! Request and response bodies of the HTTP API that are not plain domain
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adherence::{AdherenceSummary, VitalTrend};
use crate::models::{DoseEntry, Medication, Profile, Vital};
use crate::types::{TimeOfDay, VitalKind};

/// A medication with its effective dose times.  `custom_times` is the
/// patient's override and is empty when the frequency defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationDetail {
    #[serde(flatten)]
    pub medication: Medication,
    pub times: Vec<TimeOfDay>,
    #[serde(default)]
    pub custom_times: Vec<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceReport {
    pub days: u32,
    #[serde(flatten)]
    pub summary: AdherenceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalTrendReport {
    #[serde(rename = "type")]
    pub kind: VitalKind,
    pub latest: Option<Vital>,
    #[serde(flatten)]
    pub trend: VitalTrend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub doctor_code: String,
}

/// One row of the clinician's patient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub sharing_id: Uuid,
    pub shared_at: DateTime<Utc>,
    pub patient: Profile,
    pub adherence: AdherenceSummary,
}

/// What a clinician sees for one shared patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDetail {
    pub profile: Profile,
    pub adherence: AdherenceSummary,
    pub medications: Vec<Medication>,
    pub today: Vec<DoseEntry>,
    pub vitals: Vec<Vital>,
}

/// Polling cadences the client should use for its live views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshHints {
    pub shared_patients_secs: u64,
    pub clinic_alerts_secs: u64,
    pub today_logs_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub registration_open: bool,
    pub refresh: RefreshHints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultTimes {
    pub frequency: String,
    /// `false` when the label is unknown and the once-a-day fallback applies.
    pub recognized: bool,
    pub times: Vec<TimeOfDay>,
}
