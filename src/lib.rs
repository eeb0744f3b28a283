//! # calltrack-rs
//!
//! Postgres-backed core for a callback (sales-lead) CRM.
//!
//! Tracks callback records through creation, claiming, editing, and status
//! changes, with an append-only activity log recording every transition
//! with before/after snapshots. Claim exclusivity is enforced inside the
//! same database transaction that flips the claim fields.

pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod model;
pub mod telemetry;
