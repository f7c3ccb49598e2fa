//! Dose logs and the schedule procedures that generate them.
//!
//! A log row is one scheduled dose.  `(medication_id, scheduled_time)` is
//! unique and generation uses `INSERT OR IGNORE`, so every procedure here can
//! be re-run safely.  Days are UTC days.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::{ms, now, opt_ts_at, parsed_at, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{DoseEntry, MedicationLog};
use dosewise_shared::schedule::{daily_slots, default_times, resolve_times};
use dosewise_shared::types::{DoseStatus, TimeOfDay};

const LOG_COLUMNS: &str = "l.id, l.medication_id, l.user_id, l.scheduled_time, l.taken_at, l.status";

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

impl Database {
    // -----------------------------------------------------------------------
    // Schedule procedures
    // -----------------------------------------------------------------------

    /// Schedule a medication at the default times for `frequency` and
    /// generate pending logs for the first scheduled day,
    /// `max(start_date, today)`.  Any stored custom times are cleared.
    /// Returns the number of logs created.
    pub fn create_medication_schedule(
        &self,
        medication_id: Uuid,
        user_id: Uuid,
        frequency: &str,
        start_date: NaiveDate,
    ) -> Result<usize> {
        self.create_medication_schedule_with_times(medication_id, user_id, frequency, &[], start_date)
    }

    /// Same as [`create_medication_schedule`](Self::create_medication_schedule)
    /// but with custom times, which are stored as the medication's override.
    /// An empty list means no override.
    ///
    /// Re-running replaces the stored times and drops pending doses that have
    /// not happened yet, so an edited schedule takes effect from now on.
    pub fn create_medication_schedule_with_times(
        &self,
        medication_id: Uuid,
        user_id: Uuid,
        frequency: &str,
        custom_times: &[TimeOfDay],
        start_date: NaiveDate,
    ) -> Result<usize> {
        let times = resolve_times(frequency, custom_times);
        let overrides: &[TimeOfDay] = if custom_times.is_empty() { &[] } else { &times };

        self.transaction(|db| {
            let from = now();
            db.set_medication_times(medication_id, overrides)?;
            db.delete_pending_logs_after(medication_id, from)?;
            db.conn().execute(
                "UPDATE medications SET schedule_from = ?2 WHERE id = ?1",
                params![medication_id.to_string(), ts(&from)],
            )?;

            let medication = db.get_medication(medication_id)?;
            let first_day = start_date.max(from.date_naive());
            if !medication.covers(first_day) {
                return Ok(0);
            }

            let created = db.insert_pending_logs(medication_id, user_id, first_day, &times, from)?;
            tracing::info!(
                %medication_id,
                %first_day,
                times = times.len(),
                custom = !overrides.is_empty(),
                created,
                "medication schedule created"
            );
            Ok(created)
        })
    }

    /// Generate pending logs on `date` for every active medication covering
    /// it.  Slots before a medication's current schedule took effect are
    /// skipped.  Returns the number of logs created.
    pub fn generate_logs_for_day(&self, date: NaiveDate) -> Result<usize> {
        let day = date.to_string();
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, frequency, schedule_from FROM medications
             WHERE is_active = 1 AND start_date <= ?1 AND (end_date IS NULL OR end_date >= ?1)",
        )?;
        let due = stmt
            .query_map(params![day], |row| {
                Ok((
                    uuid_at(row, 0)?,
                    uuid_at(row, 1)?,
                    row.get::<_, String>(2)?,
                    ts_at(row, 3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut created = 0;
        for (medication_id, user_id, frequency, schedule_from) in due {
            let mut times: Vec<TimeOfDay> = self
                .medication_times(medication_id)?
                .into_iter()
                .map(|mt| mt.time_of_day)
                .collect();
            if times.is_empty() {
                times = default_times(&frequency);
            }
            created += self.insert_pending_logs(medication_id, user_id, date, &times, schedule_from)?;
        }

        tracing::debug!(%date, created, "daily dose logs generated");
        Ok(created)
    }

    fn insert_pending_logs(
        &self,
        medication_id: Uuid,
        user_id: Uuid,
        date: NaiveDate,
        times: &[TimeOfDay],
        not_before: DateTime<Utc>,
    ) -> Result<usize> {
        let mut stmt = self.conn().prepare(
            "INSERT OR IGNORE INTO medication_logs (id, medication_id, user_id, scheduled_time, status)
             VALUES (?1, ?2, ?3, ?4, 'pending')",
        )?;

        let mut created = 0;
        for slot in daily_slots(date, times) {
            if slot < not_before {
                continue;
            }
            created += stmt.execute(params![
                Uuid::new_v4().to_string(),
                medication_id.to_string(),
                user_id.to_string(),
                ts(&slot),
            ])?;
        }
        Ok(created)
    }

    pub(crate) fn delete_pending_logs_after(
        &self,
        medication_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM medication_logs
             WHERE medication_id = ?1 AND status = 'pending' AND scheduled_time > ?2",
            params![medication_id.to_string(), ts(&after)],
        )?;
        Ok(affected)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_log(&self, id: Uuid) -> Result<MedicationLog> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM medication_logs l WHERE l.id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], |row| row_to_log(row))
            .map_err(not_found)
    }

    /// A user's doses on one UTC day with their medication's name and dosage,
    /// in schedule order.
    pub fn logs_for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<DoseEntry>> {
        let (start, end) = day_bounds(date);
        let sql = format!(
            "SELECT {LOG_COLUMNS}, m.name, m.dosage
             FROM medication_logs l JOIN medications m ON m.id = l.medication_id
             WHERE l.user_id = ?1 AND l.scheduled_time >= ?2 AND l.scheduled_time < ?3
             ORDER BY l.scheduled_time ASC, m.name ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user_id.to_string(), ts(&start), ts(&end)], |row| {
            Ok(DoseEntry {
                log: row_to_log(row)?,
                medication_name: row.get(6)?,
                dosage: row.get(7)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Logs scheduled in `[from, to)`, oldest first.
    pub fn logs_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MedicationLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM medication_logs l
             WHERE l.user_id = ?1 AND l.scheduled_time >= ?2 AND l.scheduled_time < ?3
             ORDER BY l.scheduled_time ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user_id.to_string(), ts(&from), ts(&to)], |row| {
            row_to_log(row)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Only the statuses of [`logs_between`](Self::logs_between), for
    /// adherence.
    pub fn dose_statuses_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DoseStatus>> {
        let mut stmt = self.conn().prepare(
            "SELECT status FROM medication_logs
             WHERE user_id = ?1 AND scheduled_time >= ?2 AND scheduled_time < ?3",
        )?;
        let rows = stmt.query_map(params![user_id.to_string(), ts(&from), ts(&to)], |row| {
            parsed_at(row, 0)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Pending doses scheduled strictly before `cutoff`.
    pub fn count_overdue_pending(&self, user_id: Uuid, cutoff: DateTime<Utc>) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM medication_logs
             WHERE user_id = ?1 AND status = 'pending' AND scheduled_time < ?2",
            params![user_id.to_string(), ts(&cutoff)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Mark a dose.  `taken_at` is set for `Taken` and cleared otherwise.
    pub fn set_log_status(
        &self,
        id: Uuid,
        status: DoseStatus,
        at: DateTime<Utc>,
    ) -> Result<MedicationLog> {
        let taken_at = (status == DoseStatus::Taken).then(|| ts(&ms(at)));
        let affected = self.conn().execute(
            "UPDATE medication_logs SET status = ?2, taken_at = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), taken_at],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_log(id)
    }
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedicationLog> {
    Ok(MedicationLog {
        id: uuid_at(row, 0)?,
        medication_id: uuid_at(row, 1)?,
        user_id: uuid_at(row, 2)?,
        scheduled_time: ts_at(row, 3)?,
        taken_at: opt_ts_at(row, 4)?,
        status: parsed_at(row, 5)?,
    })
}
