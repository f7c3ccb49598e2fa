use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::codec::{conversion, ms, now, parsed_at, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Vital, VitalInput, VitalReading};
use dosewise_shared::types::VitalKind;

const VITAL_COLUMNS: &str =
    "id, user_id, type, systolic, diastolic, value, unit, recorded_at, notes";

/// Split a reading into its `(systolic, diastolic, value, unit)` columns.
fn reading_columns(reading: &VitalReading) -> (Option<u16>, Option<u16>, Option<f64>, Option<&str>) {
    match reading {
        VitalReading::BloodPressure {
            systolic,
            diastolic,
        } => (Some(*systolic), Some(*diastolic), None, None),
        VitalReading::Weight { value, unit }
        | VitalReading::HeartRate { value, unit }
        | VitalReading::Glucose { value, unit } => (None, None, Some(*value), Some(unit.as_str())),
    }
}

impl Database {
    /// Record a reading.  `recorded_at` defaults to now.
    pub fn insert_vital(&self, user_id: Uuid, input: &VitalInput) -> Result<Vital> {
        let vital = Vital {
            id: Uuid::new_v4(),
            user_id,
            reading: input.reading.clone(),
            recorded_at: input.recorded_at.map(ms).unwrap_or_else(now),
            notes: input.notes.clone(),
        };
        let (systolic, diastolic, value, unit) = reading_columns(&vital.reading);

        self.conn().execute(
            "INSERT INTO vitals (id, user_id, type, systolic, diastolic, value, unit,
                                 recorded_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                vital.id.to_string(),
                user_id.to_string(),
                vital.reading.kind().as_str(),
                systolic,
                diastolic,
                value,
                unit,
                ts(&vital.recorded_at),
                vital.notes,
            ],
        )?;
        Ok(vital)
    }

    pub fn get_vital(&self, id: Uuid) -> Result<Vital> {
        let sql = format!("SELECT {VITAL_COLUMNS} FROM vitals WHERE id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], row_to_vital)
            .map_err(not_found)
    }

    /// Replace a reading.  The type may change; a missing `recorded_at` keeps
    /// the stored one.
    pub fn update_vital(&self, id: Uuid, input: &VitalInput) -> Result<Vital> {
        let existing = self.get_vital(id)?;
        let recorded_at = input.recorded_at.map(ms).unwrap_or(existing.recorded_at);
        let (systolic, diastolic, value, unit) = reading_columns(&input.reading);

        self.conn().execute(
            "UPDATE vitals
             SET type = ?2, systolic = ?3, diastolic = ?4, value = ?5, unit = ?6,
                 recorded_at = ?7, notes = ?8
             WHERE id = ?1",
            params![
                id.to_string(),
                input.reading.kind().as_str(),
                systolic,
                diastolic,
                value,
                unit,
                ts(&recorded_at),
                input.notes,
            ],
        )?;

        Ok(Vital {
            id,
            user_id: existing.user_id,
            reading: input.reading.clone(),
            recorded_at,
            notes: input.notes.clone(),
        })
    }

    pub fn delete_vital(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM vitals WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// A user's readings, newest first, optionally of one type.
    pub fn list_vitals(
        &self,
        user_id: Uuid,
        kind: Option<VitalKind>,
        limit: usize,
    ) -> Result<Vec<Vital>> {
        let sql = format!(
            "SELECT {VITAL_COLUMNS} FROM vitals
             WHERE user_id = ?1 AND (?2 IS NULL OR type = ?2)
             ORDER BY recorded_at DESC
             LIMIT ?3"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id.to_string(), kind.map(|k| k.as_str()), limit],
            row_to_vital,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Most recent reading of `kind` recorded at or after `since`.
    pub fn latest_vital_since(
        &self,
        user_id: Uuid,
        kind: VitalKind,
        since: DateTime<Utc>,
    ) -> Result<Option<Vital>> {
        let sql = format!(
            "SELECT {VITAL_COLUMNS} FROM vitals
             WHERE user_id = ?1 AND type = ?2 AND recorded_at >= ?3
             ORDER BY recorded_at DESC
             LIMIT 1"
        );
        self.conn()
            .query_row(
                &sql,
                params![user_id.to_string(), kind.as_str(), ts(&since)],
                row_to_vital,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_vital(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vital> {
    let kind: VitalKind = parsed_at(row, 2)?;
    let reading = VitalReading::from_columns(
        kind,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    )
    .map_err(|e| conversion(2, e))?;

    Ok(Vital {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        reading,
        recorded_at: ts_at(row, 7)?,
        notes: row.get(8)?,
    })
}
