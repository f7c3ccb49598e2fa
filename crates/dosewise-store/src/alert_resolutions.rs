use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::{ms, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::AlertResolution;

impl Database {
    /// Record (or refresh) a clinician's resolution of an alert id.
    pub fn resolve_alert(
        &self,
        doctor_id: Uuid,
        alert_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AlertResolution> {
        let resolution = AlertResolution {
            doctor_id,
            alert_id: alert_id.to_string(),
            resolved_at: ms(at),
        };
        self.conn().execute(
            "INSERT INTO alert_resolutions (doctor_id, alert_id, resolved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (doctor_id, alert_id) DO UPDATE SET resolved_at = excluded.resolved_at",
            params![doctor_id.to_string(), alert_id, ts(&resolution.resolved_at)],
        )?;
        Ok(resolution)
    }

    /// Resolutions recorded at or after `since`.
    pub fn alert_resolutions(
        &self,
        doctor_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AlertResolution>> {
        let mut stmt = self.conn().prepare(
            "SELECT doctor_id, alert_id, resolved_at FROM alert_resolutions
             WHERE doctor_id = ?1 AND resolved_at >= ?2",
        )?;
        let rows = stmt.query_map(params![doctor_id.to_string(), ts(&since)], |row| {
            Ok(AlertResolution {
                doctor_id: uuid_at(row, 0)?,
                alert_id: row.get(1)?,
                resolved_at: ts_at(row, 2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn purge_alert_resolutions(&self, before: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM alert_resolutions WHERE resolved_at < ?1",
            params![ts(&before)],
        )?;
        Ok(affected)
    }
}
