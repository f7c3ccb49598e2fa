use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::codec::{now, parsed_at, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Profile, ProfileUpdate};
use dosewise_shared::types::Role;

pub(crate) const PROFILE_COLUMNS: &str = "p.id, p.name, p.email, p.role, p.age, p.condition, \
     p.clinic_name, p.crm, p.specialty, p.doctor_code, p.notifications_enabled, p.share_data, \
     p.created_at, p.updated_at";

impl Database {
    pub fn get_profile(&self, id: Uuid) -> Result<Profile> {
        self.find_profile(id)?.ok_or(StoreError::NotFound)
    }

    /// Like [`get_profile`](Self::get_profile) but a missing row is `None`.
    pub fn find_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], |row| row_to_profile(row, 0))
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Look up a clinician by the code patients type to share their data.
    /// Codes are matched case-insensitively.
    pub fn clinic_by_doctor_code(&self, code: &str) -> Result<Profile> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles p
             WHERE p.doctor_code = ?1 AND p.role = 'clinic'"
        );
        self.conn()
            .query_row(
                &sql,
                params![code.trim().to_uppercase()],
                |row| row_to_profile(row, 0),
            )
            .map_err(not_found)
    }

    /// Apply the `Some` fields of `update`.  Patient-only fields are ignored
    /// for clinic profiles and vice versa.
    pub fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Profile> {
        let mut profile = self.get_profile(id)?;

        if let Some(name) = &update.name {
            profile.name = name.trim().to_string();
        }
        match profile.role {
            Role::Patient => {
                if update.age.is_some() {
                    profile.age = update.age;
                }
                if update.condition.is_some() {
                    profile.condition = update.condition.clone();
                }
            }
            Role::Clinic => {
                if update.clinic_name.is_some() {
                    profile.clinic_name = update.clinic_name.clone();
                }
                if update.specialty.is_some() {
                    profile.specialty = update.specialty.clone();
                }
            }
        }
        if let Some(enabled) = update.notifications_enabled {
            profile.notifications_enabled = enabled;
        }
        if let Some(share) = update.share_data {
            profile.share_data = share;
        }
        profile.updated_at = now();

        self.conn().execute(
            "UPDATE profiles
             SET name = ?2, age = ?3, condition = ?4, clinic_name = ?5, specialty = ?6,
                 notifications_enabled = ?7, share_data = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                id.to_string(),
                profile.name,
                profile.age,
                profile.condition,
                profile.clinic_name,
                profile.specialty,
                profile.notifications_enabled,
                profile.share_data,
                ts(&profile.updated_at),
            ],
        )?;

        tracing::debug!(user_id = %id, "profile updated");
        Ok(profile)
    }

    /// Derive an unused doctor code from a CRM number and clinic name.
    pub fn generate_doctor_code(&self, crm: &str, clinic_name: &str) -> Result<String> {
        generate_doctor_code(self.conn(), crm, clinic_name)
    }
}

/// Base code is the first three letters of the clinic name followed by the
/// last four digits of the CRM, upper-cased and padded with `X`/`0`.  Taken
/// codes get a numeric suffix starting at 2.
pub(crate) fn generate_doctor_code(
    conn: &Connection,
    crm: &str,
    clinic_name: &str,
) -> Result<String> {
    let base = doctor_code_base(crm, clinic_name);

    let mut stmt = conn.prepare("SELECT 1 FROM profiles WHERE doctor_code = ?1")?;
    let mut candidate = base.clone();
    let mut suffix = 2u32;
    while stmt.exists(params![candidate])? {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

fn doctor_code_base(crm: &str, clinic_name: &str) -> String {
    let mut letters: String = clinic_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while letters.len() < 3 {
        letters.push('X');
    }

    let digits: Vec<char> = crm.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();

    format!("{letters}{tail:0>4}")
}

/// Decode a profile starting at column `start` (so joins can prepend their
/// own columns).
pub(crate) fn row_to_profile(row: &rusqlite::Row<'_>, start: usize) -> rusqlite::Result<Profile> {
    let created_at: DateTime<Utc> = ts_at(row, start + 12)?;
    let updated_at: DateTime<Utc> = ts_at(row, start + 13)?;

    Ok(Profile {
        id: uuid_at(row, start)?,
        name: row.get(start + 1)?,
        email: row.get(start + 2)?,
        role: parsed_at(row, start + 3)?,
        age: row.get(start + 4)?,
        condition: row.get(start + 5)?,
        clinic_name: row.get(start + 6)?,
        crm: row.get(start + 7)?,
        specialty: row.get(start + 8)?,
        doctor_code: row.get(start + 9)?,
        notifications_enabled: row.get(start + 10)?,
        share_data: row.get(start + 11)?,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clinic, patient};

    #[test]
    fn test_doctor_code_base() {
        assert_eq!(doctor_code_base("CRM/SP 123456", "Clínica Vida"), "CLN3456");
        assert_eq!(doctor_code_base("12", "Av"), "AVX0012");
    }

    #[test]
    fn test_doctor_code_collision_gets_suffix() {
        let db = Database::open_in_memory().unwrap();
        let first = clinic(&db, "Cardio Center", "SP-998877");
        assert_eq!(first.doctor_code.as_deref(), Some("CAR8877"));

        let second = clinic(&db, "Cardio Plus", "RJ-118877");
        assert_eq!(second.doctor_code.as_deref(), Some("CAR88772"));

        assert_eq!(
            db.clinic_by_doctor_code("car8877").unwrap().id,
            first.id
        );
    }

    #[test]
    fn test_update_profile_respects_role() {
        let db = Database::open_in_memory().unwrap();
        let p = patient(&db, "Ana");

        let updated = db
            .update_profile(
                p.id,
                &ProfileUpdate {
                    age: Some(61),
                    clinic_name: Some("ignored".into()),
                    share_data: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.age, Some(61));
        assert_eq!(updated.clinic_name, None);
        assert!(updated.share_data);
        assert_eq!(db.get_profile(p.id).unwrap(), updated.clone());
        assert!(updated.updated_at >= p.updated_at);
    }

    #[test]
    fn test_missing_profile() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_profile(Uuid::new_v4()).unwrap().is_none());
        assert!(matches!(
            db.get_profile(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
