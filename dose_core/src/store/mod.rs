//! Persistence capabilities consumed by the core.
//!
//! Each entity gets its own repository trait. Lookups return `Ok(None)` when
//! a row is absent; updating an absent row fails with [`crate::Error::NotFound`].
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: in-process tables, used by tests and embedders
//! - [`JsonlStore`]: append-only JSON Lines tables with file locking

mod jsonl;
mod memory;

pub use jsonl::{JsonlStore, JsonlTable, Record};
pub use memory::MemoryStore;

use crate::{DoseLog, Enrollment, Medication, Result, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// User data access
pub trait UserRepository {
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    /// Case-insensitive email lookup
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Medication data access
pub trait MedicationRepository {
    fn create_medication(&self, medication: &Medication) -> Result<()>;
    fn get_medication(&self, id: Uuid) -> Result<Option<Medication>>;
    fn get_medication_by_name(&self, name: &str) -> Result<Option<Medication>>;
    fn update_medication(&self, medication: &Medication) -> Result<()>;
    /// Medications ordered by name
    fn list_medications(&self, limit: usize, offset: usize) -> Result<Vec<Medication>>;
}

/// Enrollment data access
pub trait EnrollmentRepository {
    fn create_enrollment(&self, enrollment: &Enrollment) -> Result<()>;
    fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>>;
    /// All enrollments of a user, newest first
    fn get_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;
    /// Active enrollments of a user, newest first
    fn get_active_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;
    fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()>;
}

/// Dose log data access
pub trait DoseLogRepository {
    fn create_dose_log(&self, log: &DoseLog) -> Result<()>;

    /// Persist a batch of logs, failing on the first write error
    fn create_dose_logs(&self, logs: &[DoseLog]) -> Result<()> {
        for log in logs {
            self.create_dose_log(log)?;
        }
        Ok(())
    }

    fn get_dose_log(&self, id: Uuid) -> Result<Option<DoseLog>>;
    /// Logs of an enrollment, newest timestamp first
    fn get_dose_logs_by_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<DoseLog>>;
    /// Logs with `start <= timestamp < end`, newest timestamp first
    fn get_dose_logs_by_enrollment_and_range(
        &self,
        enrollment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DoseLog>>;
    fn update_dose_log(&self, log: &DoseLog) -> Result<()>;
}

/// Everything the tracker needs from a persistence collaborator
pub trait Store: UserRepository + MedicationRepository + EnrollmentRepository + DoseLogRepository {}

impl<T> Store for T where
    T: UserRepository + MedicationRepository + EnrollmentRepository + DoseLogRepository
{
}

// ============================================================================
// Query helpers shared by the implementations
// ============================================================================

pub(crate) fn page_by_name(
    mut medications: Vec<Medication>,
    limit: usize,
    offset: usize,
) -> Vec<Medication> {
    medications.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    medications.into_iter().skip(offset).take(limit).collect()
}

pub(crate) fn enrollments_of_user(
    enrollments: impl IntoIterator<Item = Enrollment>,
    user_id: Uuid,
    active_only: bool,
) -> Vec<Enrollment> {
    let mut found: Vec<_> = enrollments
        .into_iter()
        .filter(|e| e.user_id == user_id && (!active_only || e.active))
        .collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    found
}

pub(crate) fn logs_of_enrollment(
    logs: impl IntoIterator<Item = DoseLog>,
    enrollment_id: Uuid,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<DoseLog> {
    let mut found: Vec<_> = logs
        .into_iter()
        .filter(|log| log.enrollment_id == enrollment_id)
        .filter(|log| match range {
            Some((start, end)) => log.timestamp >= start && log.timestamp < end,
            None => true,
        })
        .collect();
    // Stable sort keeps schedule order among logs of the same day.
    found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    found
}

pub(crate) fn matches_ignoring_case(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
