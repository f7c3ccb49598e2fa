//! # dosewise-shared
//!
//! Domain types and pure rules shared by the Dosewise store, server and
//! client crates.
//!
//! Nothing in this crate performs I/O.  The frequency resolver, adherence
//! calculator, alert rules, route guard and form validation are plain
//! functions over already-fetched data, so they can run identically on the
//! server and inside the client.

pub mod adherence;
pub mod alerts;
pub mod api;
pub mod auth;
pub mod constants;
pub mod error;
pub mod models;
pub mod routes;
pub mod schedule;
pub mod types;
pub mod validation;

pub use error::DomainError;
