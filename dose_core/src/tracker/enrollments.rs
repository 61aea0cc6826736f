use super::Tracker;
use crate::schedule::{check_supply, generate_dose_logs};
use crate::stock::compute_stats;
use crate::store::Store;
use crate::validation::{validate_enrollment_patch, validate_new_enrollment};
use crate::{Enrollment, EnrollmentPatch, Error, NewEnrollment, Result, StatsReport};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl<S: Store> Tracker<S> {
    /// Enroll a user in a medication, starting now
    ///
    /// See [`Tracker::create_enrollment_at`].
    pub fn create_enrollment(&self, user_id: Uuid, input: &NewEnrollment) -> Result<Enrollment> {
        self.create_enrollment_at(user_id, input, Utc::now())
    }

    /// Enroll a user in a medication with an explicit start instant
    ///
    /// The owned supply must cover the requested duration, otherwise
    /// [`Error::InsufficientSupply`] is returned and nothing is written.
    /// On success one untaken dose log exists for every day and schedule
    /// entry. A failure while writing the logs fails the whole call.
    pub fn create_enrollment_at(
        &self,
        user_id: Uuid,
        input: &NewEnrollment,
        start_at: DateTime<Utc>,
    ) -> Result<Enrollment> {
        validate_new_enrollment(input)?;
        self.get_user(user_id)?;
        let medication = self.get_medication(input.medication_id)?;

        let plan = check_supply(
            input.boxes_owned,
            medication.pills_per_box,
            &input.schedules,
            input.duration_days,
        )?;

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            medication_id: medication.id,
            boxes_owned: input.boxes_owned,
            schedules: input.schedules.clone(),
            duration_days: input.duration_days,
            start_at,
            active: true,
            created_at: start_at,
        };
        self.store.create_enrollment(&enrollment)?;

        let logs = generate_dose_logs(&enrollment);
        if let Err(e) = self.store.create_dose_logs(&logs) {
            tracing::error!(
                "Failed to create dose logs for enrollment {}: {}",
                enrollment.id,
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Enrolled user {} in {} for {} days (supply covers {}, {} dose logs)",
            user_id,
            medication.name,
            enrollment.duration_days,
            plan.max_days,
            logs.len()
        );
        Ok(enrollment)
    }

    /// Patch boxes, schedules or the active flag
    ///
    /// Existing dose logs are kept as they are and the supply is not
    /// re-checked against the new values.
    pub fn update_enrollment(&self, id: Uuid, patch: &EnrollmentPatch) -> Result<Enrollment> {
        validate_enrollment_patch(patch)?;

        let mut enrollment = self.get_enrollment(id)?;
        patch.apply(&mut enrollment);
        self.store.update_enrollment(&enrollment)?;

        tracing::info!("Updated enrollment {}", id);
        Ok(enrollment)
    }

    pub fn get_enrollment(&self, id: Uuid) -> Result<Enrollment> {
        self.store
            .get_enrollment(id)?
            .ok_or_else(|| Error::not_found("Enrollment", id))
    }

    /// Enrollments of a user, newest first
    pub fn list_enrollments(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        self.store.get_enrollments_by_user(user_id)
    }

    pub fn list_active_enrollments(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        self.store.get_active_enrollments_by_user(user_id)
    }

    /// Stock report of an enrollment as of now
    pub fn get_stats(&self, enrollment_id: Uuid) -> Result<StatsReport> {
        self.get_stats_at(enrollment_id, Utc::now())
    }

    /// Stock report of an enrollment as of `now`
    pub fn get_stats_at(&self, enrollment_id: Uuid, now: DateTime<Utc>) -> Result<StatsReport> {
        let enrollment = self.get_enrollment(enrollment_id)?;
        let medication = self.get_medication(enrollment.medication_id)?;
        let logs = self.store.get_dose_logs_by_enrollment(enrollment_id)?;

        Ok(compute_stats(
            &enrollment,
            &medication,
            &logs,
            &self.thresholds,
            now,
        ))
    }
}
