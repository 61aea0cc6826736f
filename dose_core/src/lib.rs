#![forbid(unsafe_code)]

//! Core domain model and business logic for Dose Log.
//!
//! This crate provides:
//! - Domain types (users, medications, enrollments, dose logs, stock reports)
//! - Supply check and dose log generation
//! - Stock and depletion estimates
//! - Persistence (repository traits, in-memory and JSONL stores)
//! - The `Tracker` service tying them together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod validation;
pub mod schedule;
pub mod stock;
pub mod store;
pub mod export;
pub mod tracker;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::{check_supply, generate_dose_logs, SupplyPlan};
pub use stock::{compute_stats, StockThresholds};
pub use store::{
    DoseLogRepository, EnrollmentRepository, JsonlStore, MedicationRepository, MemoryStore,
    Store, UserRepository,
};
pub use export::export_dose_logs;
pub use tracker::Tracker;
