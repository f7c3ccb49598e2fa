//! Patient-to-clinician sharing grants.
//!
//! Revoking only flips `is_active`; the row stays as history and a later grant
//! inserts a fresh row.

use rusqlite::params;
use uuid::Uuid;

use crate::codec::{now, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{conflict_on, Result, StoreError};
use crate::models::{SharedProfile, Sharing};
use crate::profiles::{row_to_profile, PROFILE_COLUMNS};

/// Conflict rule reported when an active grant already exists for the pair.
pub const SHARING_EXISTS: &str = "patient_doctor_sharing.active_pair";

impl Database {
    pub fn grant_sharing(&self, patient_id: Uuid, doctor_id: Uuid) -> Result<Sharing> {
        let sharing = Sharing {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            shared_at: now(),
            is_active: true,
        };

        self.conn()
            .execute(
                "INSERT INTO patient_doctor_sharing (id, patient_id, doctor_id, shared_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, 1)",
                params![
                    sharing.id.to_string(),
                    patient_id.to_string(),
                    doctor_id.to_string(),
                    ts(&sharing.shared_at),
                ],
            )
            .map_err(conflict_on(SHARING_EXISTS))?;

        tracing::info!(%patient_id, %doctor_id, "sharing granted");
        Ok(sharing)
    }

    /// Deactivate the pair's active grant.  Returns `false` if there was none.
    pub fn revoke_sharing(&self, patient_id: Uuid, doctor_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE patient_doctor_sharing SET is_active = 0
             WHERE patient_id = ?1 AND doctor_id = ?2 AND is_active = 1",
            params![patient_id.to_string(), doctor_id.to_string()],
        )?;
        if affected > 0 {
            tracing::info!(%patient_id, %doctor_id, "sharing revoked");
        }
        Ok(affected > 0)
    }

    pub fn has_active_sharing(&self, patient_id: Uuid, doctor_id: Uuid) -> Result<bool> {
        let mut stmt = self.conn().prepare(
            "SELECT 1 FROM patient_doctor_sharing
             WHERE patient_id = ?1 AND doctor_id = ?2 AND is_active = 1",
        )?;
        Ok(stmt.exists(params![patient_id.to_string(), doctor_id.to_string()])?)
    }

    /// Patients actively sharing with `doctor_id`, by name.
    pub fn shared_patients(&self, doctor_id: Uuid) -> Result<Vec<SharedProfile>> {
        self.shared_profiles(
            "s.patient_id",
            "s.doctor_id",
            doctor_id,
        )
    }

    /// Clinicians `patient_id` actively shares with, by name.
    pub fn shared_doctors(&self, patient_id: Uuid) -> Result<Vec<SharedProfile>> {
        self.shared_profiles("s.doctor_id", "s.patient_id", patient_id)
    }

    fn shared_profiles(
        &self,
        join_on: &str,
        filter_on: &str,
        id: Uuid,
    ) -> Result<Vec<SharedProfile>> {
        let sql = format!(
            "SELECT s.id, s.shared_at, {PROFILE_COLUMNS}
             FROM patient_doctor_sharing s JOIN profiles p ON p.id = {join_on}
             WHERE {filter_on} = ?1 AND s.is_active = 1
             ORDER BY p.name ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            Ok(SharedProfile {
                sharing_id: uuid_at(row, 0)?,
                shared_at: ts_at(row, 1)?,
                profile: row_to_profile(row, 2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clinic, patient};

    #[test]
    fn test_duplicate_active_grant_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let ana = patient(&db, "Ana");
        let doc = clinic(&db, "Vida", "12345");

        db.grant_sharing(ana.id, doc.id).unwrap();
        let err = db.grant_sharing(ana.id, doc.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref rule) if rule == SHARING_EXISTS));
    }

    #[test]
    fn test_revoke_then_grant_again() {
        let db = Database::open_in_memory().unwrap();
        let ana = patient(&db, "Ana");
        let doc = clinic(&db, "Vida", "12345");

        db.grant_sharing(ana.id, doc.id).unwrap();
        assert!(db.has_active_sharing(ana.id, doc.id).unwrap());
        assert!(db.revoke_sharing(ana.id, doc.id).unwrap());
        assert!(!db.has_active_sharing(ana.id, doc.id).unwrap());
        assert!(!db.revoke_sharing(ana.id, doc.id).unwrap());

        db.grant_sharing(ana.id, doc.id).unwrap();
        assert!(db.has_active_sharing(ana.id, doc.id).unwrap());
    }

    #[test]
    fn test_roster_lists_only_active_grants() {
        let db = Database::open_in_memory().unwrap();
        let ana = patient(&db, "Ana");
        let bruno = patient(&db, "Bruno");
        let carla = patient(&db, "Carla");
        let doc = clinic(&db, "Vida", "12345");

        db.grant_sharing(bruno.id, doc.id).unwrap();
        db.grant_sharing(ana.id, doc.id).unwrap();
        db.grant_sharing(carla.id, doc.id).unwrap();
        db.revoke_sharing(carla.id, doc.id).unwrap();

        let names: Vec<String> = db
            .shared_patients(doc.id)
            .unwrap()
            .into_iter()
            .map(|s| s.profile.name)
            .collect();
        assert_eq!(names, ["Ana", "Bruno"]);

        let doctors = db.shared_doctors(ana.id).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].profile.id, doc.id);
    }
}
