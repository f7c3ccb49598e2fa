//! # dosewise-store
//!
//! SQLite persistence for Dosewise.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every table,
//! plus the schedule procedures that generate dose logs.  Callers in async
//! code keep it behind a mutex.

pub mod accounts;
pub mod alert_resolutions;
pub mod database;
pub mod logs;
pub mod medications;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod repository;
pub mod sharing;
pub mod vitals;

mod codec;
mod error;

#[cfg(test)]
mod test_support;

pub use accounts::EMAIL_TAKEN;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use repository::{
    AlertResolutionRepository, DoseLogRepository, SharingRepository, VitalRepository,
};
pub use sharing::SHARING_EXISTS;
