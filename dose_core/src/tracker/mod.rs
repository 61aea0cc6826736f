//! Service layer tying validation, the generator and the estimator to a store.
//!
//! A [`Tracker`] owns the persistence collaborator it was built with; there
//! is no process-wide store handle. All inputs are expected to come from an
//! already authenticated caller. Operations are grouped by entity:
//! - `users`: registration and lookup
//! - `medications`: catalogue management
//! - `enrollments`: creation with supply check, patching, stock reports
//! - `dose_logs`: listing, marking doses taken, CSV export

mod dose_logs;
mod enrollments;
mod medications;
mod users;

use crate::stock::StockThresholds;
use crate::store::Store;

/// Medication-adherence tracker over a store `S`
pub struct Tracker<S> {
    store: S,
    thresholds: StockThresholds,
}

impl<S: Store> Tracker<S> {
    /// Create a tracker with the default warning thresholds
    pub fn new(store: S) -> Self {
        Self::with_thresholds(store, StockThresholds::default())
    }

    pub fn with_thresholds(store: S, thresholds: StockThresholds) -> Self {
        Self { store, thresholds }
    }

    /// The underlying persistence collaborator
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn thresholds(&self) -> &StockThresholds {
        &self.thresholds
    }
}
