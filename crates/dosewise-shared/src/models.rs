//! Domain records exchanged between the store, the HTTP API and the client.
//!
//! Every struct derives `Serialize` and `Deserialize` so the API can hand it
//! to callers verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::types::{AlertKind, DoseStatus, Role, Severity, TimeOfDay, VitalKind};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A registered user.  Patients carry `age`/`condition`, clinicians carry
/// `clinic_name`/`crm`/`specialty`/`doctor_code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_code: Option<String>,
    pub notifications_enabled: bool,
    pub share_data: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_clinic(&self) -> bool {
        self.role == Role::Clinic
    }
}

/// Partial update of the owner's own profile.  `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub condition: Option<String>,
    pub clinic_name: Option<String>,
    pub specialty: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub share_data: Option<bool>,
}

/// Role-specific sign-up metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleDetails {
    Patient {
        #[serde(default)]
        age: Option<u32>,
        #[serde(default)]
        condition: Option<String>,
    },
    Clinic {
        clinic_name: String,
        crm: String,
        #[serde(default)]
        specialty: Option<String>,
    },
}

impl RoleDetails {
    pub fn role(&self) -> Role {
        match self {
            Self::Patient { .. } => Role::Patient,
            Self::Clinic { .. } => Role::Clinic,
        }
    }
}

/// Sign-up request.  The role tag and its metadata are flattened next to the
/// credentials: `{"email": .., "password": .., "name": .., "role": "patient", "age": 40}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(flatten)]
    pub details: RoleDetails,
}

impl Registration {
    pub fn role(&self) -> Role {
        self.details.role()
    }

    /// E-mail in the form accounts are keyed by.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Medication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    /// Free-text frequency label, e.g. `"12/12h"`.
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Medication {
    /// Whether the medication is scheduled on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.start_date <= date
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Create/replace payload for a medication.  A non-empty `custom_times`
/// overrides the frequency's default dose times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub custom_times: Vec<TimeOfDay>,
}

/// A custom dose time attached to a medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationTime {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub time_of_day: TimeOfDay,
}

/// One scheduled dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    pub status: DoseStatus,
}

/// A dose log joined with the medication it belongs to, as listed on the
/// patient's "today" view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseEntry {
    #[serde(flatten)]
    pub log: MedicationLog,
    pub medication_name: String,
    pub dosage: String,
}

// ---------------------------------------------------------------------------
// Vital
// ---------------------------------------------------------------------------

/// A reading whose populated fields follow from its type: blood pressure has
/// systolic/diastolic, every other type has value/unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VitalReading {
    BloodPressure { systolic: u16, diastolic: u16 },
    Weight { value: f64, unit: String },
    HeartRate { value: f64, unit: String },
    Glucose { value: f64, unit: String },
}

impl VitalReading {
    pub fn kind(&self) -> VitalKind {
        match self {
            Self::BloodPressure { .. } => VitalKind::BloodPressure,
            Self::Weight { .. } => VitalKind::Weight,
            Self::HeartRate { .. } => VitalKind::HeartRate,
            Self::Glucose { .. } => VitalKind::Glucose,
        }
    }

    pub fn systolic(&self) -> Option<u16> {
        match self {
            Self::BloodPressure { systolic, .. } => Some(*systolic),
            _ => None,
        }
    }

    /// The number charted for this reading (systolic for blood pressure).
    pub fn primary_value(&self) -> f64 {
        match self {
            Self::BloodPressure { systolic, .. } => f64::from(*systolic),
            Self::Weight { value, .. }
            | Self::HeartRate { value, .. }
            | Self::Glucose { value, .. } => *value,
        }
    }

    /// Human-readable form used in reports.
    pub fn display_value(&self) -> String {
        match self {
            Self::BloodPressure { systolic, diastolic } => format!("{systolic}/{diastolic} mmHg"),
            Self::Weight { value, unit }
            | Self::HeartRate { value, unit }
            | Self::Glucose { value, unit } => format!("{value} {unit}"),
        }
    }

    /// Rebuild a reading from flat storage columns, rejecting combinations
    /// that break the per-type shape.
    pub fn from_columns(
        kind: VitalKind,
        systolic: Option<u16>,
        diastolic: Option<u16>,
        value: Option<f64>,
        unit: Option<String>,
    ) -> Result<Self, DomainError> {
        let inconsistent = |reason: &str| DomainError::InconsistentVital {
            kind: kind.as_str(),
            reason: reason.to_string(),
        };

        match kind {
            VitalKind::BloodPressure => match (systolic, diastolic, value) {
                (Some(systolic), Some(diastolic), None) => {
                    Ok(Self::BloodPressure { systolic, diastolic })
                }
                _ => Err(inconsistent("expected systolic and diastolic only")),
            },
            other => {
                if systolic.is_some() || diastolic.is_some() {
                    return Err(inconsistent("unexpected systolic/diastolic"));
                }
                let value = value.ok_or_else(|| inconsistent("missing value"))?;
                let unit = unit.unwrap_or_else(|| other.default_unit().to_string());
                Ok(match other {
                    VitalKind::Weight => Self::Weight { value, unit },
                    VitalKind::HeartRate => Self::HeartRate { value, unit },
                    _ => Self::Glucose { value, unit },
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vital {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub reading: VitalReading,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Create/replace payload for a vital.  `recorded_at` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalInput {
    #[serde(flatten)]
    pub reading: VitalReading,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

/// Grant from a patient to a clinician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sharing {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub shared_at: DateTime<Utc>,
    pub is_active: bool,
}

/// The other side of an active sharing row: a patient (for clinicians) or a
/// clinician (for patients).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedProfile {
    pub sharing_id: Uuid,
    pub shared_at: DateTime<Utc>,
    pub profile: Profile,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// An attention-worthy condition for one shared patient.  Recomputed on every
/// read; only the resolution mark is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientAlert {
    pub id: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_resolved: bool,
}

/// A clinician's persisted "resolved" mark for an alert id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertResolution {
    pub doctor_id: Uuid,
    pub alert_id: String,
    pub resolved_at: DateTime<Utc>,
}
