//! Periodic refresh of dashboard data.
//!
//! Each [`Refresh`] runs one background task that re-fetches on a fixed
//! cadence and publishes the latest good value.  A failed fetch is logged and
//! the previous value stays visible.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use dosewise_shared::api::RosterEntry;
use dosewise_shared::constants::{
    CLINIC_ALERTS_REFRESH_SECS, SHARED_PATIENTS_REFRESH_SECS, TODAY_LOGS_REFRESH_SECS,
};
use dosewise_shared::models::{DoseEntry, PatientAlert};

use crate::error::Result;
use crate::http::HttpBackend;

/// Handle to a refresh task.  Dropping it stops the task.
pub struct Refresh<T> {
    rx: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> Refresh<T> {
    /// Fetch immediately, then every `period`.
    pub fn spawn<F, Fut>(label: &'static str, period: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }
                match fetch().await {
                    Ok(value) => {
                        if tx.send(Some(value)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(refresh = label, error = %e, "Refresh failed"),
                }
            }
        });

        Self { rx, task }
    }

    /// Latest good value, `None` before the first successful fetch.
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published value.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.rx.clone()
    }
}

impl<T> Drop for Refresh<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Clinician roster, every 30 s.
pub fn shared_patients(backend: Arc<HttpBackend>) -> Refresh<Vec<RosterEntry>> {
    Refresh::spawn(
        "shared_patients",
        Duration::from_secs(SHARED_PATIENTS_REFRESH_SECS),
        move || {
            let backend = backend.clone();
            async move { backend.roster().await }
        },
    )
}

/// Clinician alerts, every 60 s.
pub fn clinic_alerts(backend: Arc<HttpBackend>) -> Refresh<Vec<PatientAlert>> {
    Refresh::spawn(
        "clinic_alerts",
        Duration::from_secs(CLINIC_ALERTS_REFRESH_SECS),
        move || {
            let backend = backend.clone();
            async move { backend.alerts().await }
        },
    )
}

/// Patient's doses for today, every 60 s.
pub fn today_logs(backend: Arc<HttpBackend>) -> Refresh<Vec<DoseEntry>> {
    Refresh::spawn(
        "today_logs",
        Duration::from_secs(TODAY_LOGS_REFRESH_SECS),
        move || {
            let backend = backend.clone();
            async move { backend.today_logs().await }
        },
    )
}
