use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::{date_at, now, opt_date_at, parsed_at, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Medication, MedicationInput, MedicationTime};
use dosewise_shared::types::TimeOfDay;

const MEDICATION_COLUMNS: &str = "id, user_id, name, dosage, frequency, instructions, \
     start_date, end_date, is_active, created_at";

impl Database {
    /// Insert the medication row only.  Dose times and logs are written by
    /// [`create_medication_schedule`](Self::create_medication_schedule).
    pub fn insert_medication(&self, user_id: Uuid, input: &MedicationInput) -> Result<Medication> {
        let created_at = now();
        let medication = Medication {
            id: Uuid::new_v4(),
            user_id,
            name: input.name.trim().to_string(),
            dosage: input.dosage.trim().to_string(),
            frequency: input.frequency.trim().to_string(),
            instructions: input.instructions.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            created_at,
        };

        self.conn().execute(
            "INSERT INTO medications (id, user_id, name, dosage, frequency, instructions,
                                      start_date, end_date, is_active, schedule_from, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
            params![
                medication.id.to_string(),
                user_id.to_string(),
                medication.name,
                medication.dosage,
                medication.frequency,
                medication.instructions,
                medication.start_date.to_string(),
                medication.end_date.map(|d| d.to_string()),
                ts(&created_at),
            ],
        )?;

        tracing::debug!(medication_id = %medication.id, %user_id, "medication inserted");
        Ok(medication)
    }

    pub fn get_medication(&self, id: Uuid) -> Result<Medication> {
        let sql = format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], row_to_medication)
            .map_err(not_found)
    }

    /// A user's medications, newest first.
    pub fn list_medications(&self, user_id: Uuid, active_only: bool) -> Result<Vec<Medication>> {
        let sql = format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications
             WHERE user_id = ?1 AND (?2 = 0 OR is_active = 1)
             ORDER BY created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user_id.to_string(), active_only], row_to_medication)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Overwrite the editable fields.  The schedule is not touched; callers
    /// follow up with one of the schedule procedures.
    pub fn update_medication(&self, id: Uuid, input: &MedicationInput) -> Result<Medication> {
        let affected = self.conn().execute(
            "UPDATE medications
             SET name = ?2, dosage = ?3, frequency = ?4, instructions = ?5,
                 start_date = ?6, end_date = ?7
             WHERE id = ?1",
            params![
                id.to_string(),
                input.name.trim(),
                input.dosage.trim(),
                input.frequency.trim(),
                input.instructions,
                input.start_date.to_string(),
                input.end_date.map(|d| d.to_string()),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_medication(id)
    }

    /// Soft delete.  Pending doses still ahead of `at` are dropped; past logs
    /// stay for adherence history.
    pub fn deactivate_medication(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE medications SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            params![id.to_string()],
        )?;
        if affected > 0 {
            let dropped = self.delete_pending_logs_after(id, at)?;
            tracing::info!(medication_id = %id, dropped, "medication deactivated");
        }
        Ok(affected > 0)
    }

    pub fn medication_times(&self, medication_id: Uuid) -> Result<Vec<MedicationTime>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, medication_id, time_of_day FROM medication_times
             WHERE medication_id = ?1
             ORDER BY time_of_day ASC",
        )?;
        let rows = stmt.query_map(params![medication_id.to_string()], |row| {
            Ok(MedicationTime {
                id: uuid_at(row, 0)?,
                medication_id: uuid_at(row, 1)?,
                time_of_day: parsed_at(row, 2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Replace the dose times wholesale.
    pub fn set_medication_times(&self, medication_id: Uuid, times: &[TimeOfDay]) -> Result<()> {
        self.transaction(|db| {
            db.conn().execute(
                "DELETE FROM medication_times WHERE medication_id = ?1",
                params![medication_id.to_string()],
            )?;
            let mut stmt = db.conn().prepare(
                "INSERT OR IGNORE INTO medication_times (id, medication_id, time_of_day)
                 VALUES (?1, ?2, ?3)",
            )?;
            for time in times {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    medication_id.to_string(),
                    time.to_string(),
                ])?;
            }
            Ok(())
        })
    }

    /// Insert a medication and build its schedule in one transaction.
    /// Returns the medication and the number of logs created.
    pub fn create_medication_with_schedule(
        &self,
        user_id: Uuid,
        input: &MedicationInput,
    ) -> Result<(Medication, usize)> {
        self.transaction(|db| {
            let medication = db.insert_medication(user_id, input)?;
            let created = db.schedule_medication(&medication, &input.custom_times)?;
            Ok((medication, created))
        })
    }

    /// Overwrite a medication and rebuild its schedule in one transaction.
    pub fn update_medication_with_schedule(
        &self,
        id: Uuid,
        input: &MedicationInput,
    ) -> Result<(Medication, usize)> {
        self.transaction(|db| {
            let medication = db.update_medication(id, input)?;
            let created = db.schedule_medication(&medication, &input.custom_times)?;
            Ok((medication, created))
        })
    }

    fn schedule_medication(&self, medication: &Medication, custom_times: &[TimeOfDay]) -> Result<usize> {
        if custom_times.is_empty() {
            self.create_medication_schedule(
                medication.id,
                medication.user_id,
                &medication.frequency,
                medication.start_date,
            )
        } else {
            self.create_medication_schedule_with_times(
                medication.id,
                medication.user_id,
                &medication.frequency,
                custom_times,
                medication.start_date,
            )
        }
    }
}

fn row_to_medication(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        frequency: row.get(4)?,
        instructions: row.get(5)?,
        start_date: date_at(row, 6)?,
        end_date: opt_date_at(row, 7)?,
        is_active: row.get(8)?,
        created_at: ts_at(row, 9)?,
    })
}
