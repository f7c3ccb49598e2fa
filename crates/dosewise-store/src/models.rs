//! Records persisted by the store.
//!
//! Domain structs come from `dosewise-shared`; only the credential and session
//! rows, which never leave the server, are defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dosewise_shared::models::{
    AlertResolution, DoseEntry, Medication, MedicationInput, MedicationLog, MedicationTime,
    Profile, ProfileUpdate, RoleDetails, SharedProfile, Sharing, Vital, VitalInput, VitalReading,
};

/// Stored login material for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    pub user_id: Uuid,
    pub email: String,
    /// Hex-encoded derived key.
    pub password_hash: String,
    /// Hex-encoded salt.
    pub salt: String,
}

/// Input for [`Database::create_account`](crate::Database::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub salt: &'a str,
    pub name: &'a str,
    pub details: &'a RoleDetails,
}

/// An unexpired session resolved from its token hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
