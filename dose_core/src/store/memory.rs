//! In-process store backed by mutex-guarded vectors.

use super::{
    enrollments_of_user, logs_of_enrollment, matches_ignoring_case, page_by_name,
    DoseLogRepository, EnrollmentRepository, MedicationRepository, UserRepository,
};
use crate::{DoseLog, Enrollment, Error, Medication, Result, User};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    medications: Vec<Medication>,
    enrollments: Vec<Enrollment>,
    dose_logs: Vec<DoseLog>,
}

/// Store keeping every table in memory
///
/// Rows are kept in insertion order; updates replace the row in place.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Persistence("memory store lock poisoned".into()))
    }

    /// Number of dose logs across all enrollments
    pub fn dose_log_count(&self) -> Result<usize> {
        Ok(self.tables()?.dose_logs.len())
    }

    /// Number of enrollments across all users
    pub fn enrollment_count(&self) -> Result<usize> {
        Ok(self.tables()?.enrollments.len())
    }
}

fn replace<T: Clone>(
    rows: &mut [T],
    row: &T,
    id_of: impl Fn(&T) -> Uuid,
    entity: &'static str,
) -> Result<()> {
    let id = id_of(row);
    let slot = rows
        .iter_mut()
        .find(|r| id_of(r) == id)
        .ok_or_else(|| Error::not_found(entity, id))?;
    *slot = row.clone();
    Ok(())
}

impl UserRepository for MemoryStore {
    fn create_user(&self, user: &User) -> Result<()> {
        self.tables()?.users.push(user.clone());
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| matches_ignoring_case(&u.email, email))
            .cloned())
    }
}

impl MedicationRepository for MemoryStore {
    fn create_medication(&self, medication: &Medication) -> Result<()> {
        self.tables()?.medications.push(medication.clone());
        Ok(())
    }

    fn get_medication(&self, id: Uuid) -> Result<Option<Medication>> {
        Ok(self
            .tables()?
            .medications
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    fn get_medication_by_name(&self, name: &str) -> Result<Option<Medication>> {
        Ok(self
            .tables()?
            .medications
            .iter()
            .find(|m| matches_ignoring_case(&m.name, name))
            .cloned())
    }

    fn update_medication(&self, medication: &Medication) -> Result<()> {
        replace(
            &mut self.tables()?.medications,
            medication,
            |m| m.id,
            "Medication",
        )
    }

    fn list_medications(&self, limit: usize, offset: usize) -> Result<Vec<Medication>> {
        let medications = self.tables()?.medications.clone();
        Ok(page_by_name(medications, limit, offset))
    }
}

impl EnrollmentRepository for MemoryStore {
    fn create_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.tables()?.enrollments.push(enrollment.clone());
        Ok(())
    }

    fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>> {
        Ok(self
            .tables()?
            .enrollments
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    fn get_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let enrollments = self.tables()?.enrollments.clone();
        Ok(enrollments_of_user(enrollments, user_id, false))
    }

    fn get_active_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let enrollments = self.tables()?.enrollments.clone();
        Ok(enrollments_of_user(enrollments, user_id, true))
    }

    fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        replace(
            &mut self.tables()?.enrollments,
            enrollment,
            |e| e.id,
            "Enrollment",
        )
    }
}

impl DoseLogRepository for MemoryStore {
    fn create_dose_log(&self, log: &DoseLog) -> Result<()> {
        self.tables()?.dose_logs.push(log.clone());
        Ok(())
    }

    fn create_dose_logs(&self, logs: &[DoseLog]) -> Result<()> {
        self.tables()?.dose_logs.extend_from_slice(logs);
        Ok(())
    }

    fn get_dose_log(&self, id: Uuid) -> Result<Option<DoseLog>> {
        Ok(self
            .tables()?
            .dose_logs
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    fn get_dose_logs_by_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<DoseLog>> {
        let tables = self.tables()?;
        Ok(logs_of_enrollment(
            tables.dose_logs.iter().cloned(),
            enrollment_id,
            None,
        ))
    }

    fn get_dose_logs_by_enrollment_and_range(
        &self,
        enrollment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DoseLog>> {
        let tables = self.tables()?;
        Ok(logs_of_enrollment(
            tables.dose_logs.iter().cloned(),
            enrollment_id,
            Some((start, end)),
        ))
    }

    fn update_dose_log(&self, log: &DoseLog) -> Result<()> {
        replace(&mut self.tables()?.dose_logs, log, |l| l.id, "DoseLog")
    }
}
