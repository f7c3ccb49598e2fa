//! Periodic maintenance: dose-log generation, session and alert-resolution
//! purges, and login-throttle cleanup.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};

use dosewise_shared::constants::ALERT_RESOLUTION_TTL_HOURS;
use dosewise_store::{Database, Result};

use crate::api::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub logs_created: usize,
    pub sessions_purged: usize,
    pub resolutions_purged: usize,
}

/// One maintenance pass.  Logs are generated for today and tomorrow so the
/// first doses after midnight exist before the day starts; generation is
/// idempotent.
pub fn run_maintenance(db: &Database, now: DateTime<Utc>) -> Result<MaintenanceReport> {
    let today = now.date_naive();
    let mut report = MaintenanceReport::default();

    for day in [today, today + Duration::days(1)] {
        report.logs_created += db.generate_logs_for_day(day)?;
    }
    report.sessions_purged = db.purge_expired_sessions(now)?;
    report.resolutions_purged =
        db.purge_alert_resolutions(now - Duration::hours(ALERT_RESOLUTION_TTL_HOURS))?;

    Ok(report)
}

/// Run [`run_maintenance`] every `schedule_interval_secs`, starting
/// immediately.  Failures are logged and retried on the next tick.
pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = StdDuration::from_secs(state.config.schedule_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let result = run_maintenance(&*state.db.lock().await, Utc::now());
            match result {
                Ok(report) if report == MaintenanceReport::default() => {
                    debug!("maintenance pass: nothing to do");
                }
                Ok(report) => info!(
                    logs_created = report.logs_created,
                    sessions_purged = report.sessions_purged,
                    resolutions_purged = report.resolutions_purged,
                    "maintenance pass complete"
                ),
                Err(e) => error!(error = %e, "maintenance pass failed"),
            }
        }
    })
}

/// Evict login-throttle and per-IP buckets idle for more than ten minutes.
pub fn spawn_throttle_cleanup(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(300));
        loop {
            interval.tick().await;
            state.rate_limiter.purge_stale(600.0).await;
            state.login_throttle.purge_stale(600.0).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dosewise_shared::models::{MedicationInput, RoleDetails};
    use dosewise_store::NewAccount;

    fn patient(db: &Database) -> uuid::Uuid {
        db.create_account(&NewAccount {
            email: "ana@example.com",
            password_hash: "x",
            salt: "00",
            name: "Ana",
            details: &RoleDetails::Patient {
                age: None,
                condition: None,
            },
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_generates_tomorrow_once() {
        let db = Database::open_in_memory().unwrap();
        let user_id = patient(&db);
        let now = Utc::now();
        db.insert_medication(
            user_id,
            &MedicationInput {
                name: "Metformina".into(),
                dosage: "500mg".into(),
                frequency: "12/12h".into(),
                instructions: None,
                start_date: now.date_naive() + Duration::days(1),
                end_date: None,
                custom_times: vec![],
            },
        )
        .unwrap();

        let first = run_maintenance(&db, now).unwrap();
        assert_eq!(first.logs_created, 2);

        let second = run_maintenance(&db, now).unwrap();
        assert_eq!(second.logs_created, 0);
    }

    #[test]
    fn test_purges_expired_sessions() {
        let db = Database::open_in_memory().unwrap();
        let user_id = patient(&db);
        let now = Utc::now();
        db.create_session("old", user_id, now - Duration::hours(1)).unwrap();
        db.create_session("fresh", user_id, now + Duration::hours(1)).unwrap();

        let report = run_maintenance(&db, now).unwrap();
        assert_eq!(report.sessions_purged, 1);
        assert!(db.find_session("fresh", now).unwrap().is_some());
    }

    #[test]
    fn test_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let now = day.and_hms_opt(12, 0, 0).unwrap().and_utc();
        assert_eq!(run_maintenance(&db, now).unwrap(), MaintenanceReport::default());
    }
}
