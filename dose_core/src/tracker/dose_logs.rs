use super::Tracker;
use crate::export::export_dose_logs;
use crate::store::Store;
use crate::{DoseLog, Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::path::Path;
use uuid::Uuid;

impl<S: Store> Tracker<S> {
    pub fn get_dose_log(&self, id: Uuid) -> Result<DoseLog> {
        self.store
            .get_dose_log(id)?
            .ok_or_else(|| Error::not_found("Dose log", id))
    }

    /// Mark a dose as taken
    ///
    /// Marking an already-taken dose is a no-op success; a dose counts
    /// towards used pills once.
    pub fn mark_dose_taken(&self, id: Uuid) -> Result<DoseLog> {
        let mut log = self.get_dose_log(id)?;
        if log.taken {
            tracing::debug!("Dose log {} already taken", id);
            return Ok(log);
        }

        log.taken = true;
        self.store.update_dose_log(&log)?;

        tracing::info!("Marked dose {} ({}) as taken", id, log.time_slot);
        Ok(log)
    }

    /// Logs of an enrollment, newest first
    pub fn list_dose_logs(&self, enrollment_id: Uuid) -> Result<Vec<DoseLog>> {
        self.get_enrollment(enrollment_id)?;
        self.store.get_dose_logs_by_enrollment(enrollment_id)
    }

    /// Logs with `start <= timestamp < end`, newest first
    pub fn list_dose_logs_in_range(
        &self,
        enrollment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DoseLog>> {
        if start >= end {
            return Err(Error::Validation(format!(
                "range start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        self.get_enrollment(enrollment_id)?;
        self.store
            .get_dose_logs_by_enrollment_and_range(enrollment_id, start, end)
    }

    /// Logs falling on one UTC calendar day, in schedule order
    pub fn dose_logs_for_day(&self, enrollment_id: Uuid, day: NaiveDate) -> Result<Vec<DoseLog>> {
        let start = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| {
            Error::Validation(format!("cannot build start of day for {}", day))
        })?;
        let mut logs = self.list_dose_logs_in_range(enrollment_id, start, start + Duration::days(1))?;
        logs.sort_by_key(|log| log.timestamp);
        Ok(logs)
    }

    /// Write all logs of an enrollment to `path` as CSV, oldest first
    pub fn export_dose_logs(&self, enrollment_id: Uuid, path: &Path) -> Result<usize> {
        let mut logs = self.list_dose_logs(enrollment_id)?;
        logs.sort_by_key(|log| log.timestamp);
        export_dose_logs(&logs, path)
    }
}
