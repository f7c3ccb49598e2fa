//! Narrow read-side traits over [`Database`].
//!
//! Code that only needs a few lookups (the clinic alert evaluator, the roster
//! builder) is written against these traits so tests can substitute an
//! in-memory or failing implementation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{AlertResolution, SharedProfile, Vital};
use dosewise_shared::types::{DoseStatus, VitalKind};

pub trait SharingRepository {
    fn shared_patients(&self, doctor_id: Uuid) -> Result<Vec<SharedProfile>>;
}

pub trait DoseLogRepository {
    fn count_overdue_pending(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<usize>;

    fn dose_statuses_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DoseStatus>>;
}

pub trait VitalRepository {
    fn latest_vital_since(
        &self,
        user_id: Uuid,
        kind: VitalKind,
        since: DateTime<Utc>,
    ) -> Result<Option<Vital>>;
}

pub trait AlertResolutionRepository {
    fn alert_resolutions(&self, doctor_id: Uuid, since: DateTime<Utc>)
        -> Result<Vec<AlertResolution>>;
}

impl SharingRepository for Database {
    fn shared_patients(&self, doctor_id: Uuid) -> Result<Vec<SharedProfile>> {
        Database::shared_patients(self, doctor_id)
    }
}

impl DoseLogRepository for Database {
    fn count_overdue_pending(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<usize> {
        Database::count_overdue_pending(self, user_id, cutoff)
    }

    fn dose_statuses_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DoseStatus>> {
        Database::dose_statuses_between(self, user_id, from, to)
    }
}

impl VitalRepository for Database {
    fn latest_vital_since(
        &self,
        user_id: Uuid,
        kind: VitalKind,
        since: DateTime<Utc>,
    ) -> Result<Option<Vital>> {
        Database::latest_vital_since(self, user_id, kind, since)
    }
}

impl AlertResolutionRepository for Database {
    fn alert_resolutions(
        &self,
        doctor_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AlertResolution>> {
        Database::alert_resolutions(self, doctor_id, since)
    }
}
