//! JSON Lines tables with file locking.
//!
//! Every table is an append-only `.jsonl` file holding one full record per
//! line. Creating a row appends it; updating a row appends its new version.
//! Readers fold the file so that the last line written for an id wins.
//! [`JsonlTable::compact`] rewrites a table down to its latest versions.

use super::{
    enrollments_of_user, logs_of_enrollment, matches_ignoring_case, page_by_name,
    DoseLogRepository, EnrollmentRepository, MedicationRepository, UserRepository,
};
use crate::{DoseLog, Enrollment, Error, Medication, Result, User};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A row type that can live in a JSON Lines table
pub trait Record: Serialize + DeserializeOwned {
    const ENTITY: &'static str;

    fn record_id(&self) -> Uuid;
}

impl Record for User {
    const ENTITY: &'static str = "User";

    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Record for Medication {
    const ENTITY: &'static str = "Medication";

    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Record for Enrollment {
    const ENTITY: &'static str = "Enrollment";

    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Record for DoseLog {
    const ENTITY: &'static str = "DoseLog";

    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// One append-only table file
pub struct JsonlTable<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> JsonlTable<T> {
    /// Create a table handle for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append records under an exclusive lock
    pub fn append(&self, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let written = write_lines(&file, records);
        file.unlock()?;
        written?;

        tracing::debug!(
            "Appended {} {} record(s) to {:?}",
            records.len(),
            T::ENTITY,
            self.path
        );
        Ok(())
    }

    /// Read the latest version of every record, in first-insertion order
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn load(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let folded = fold_lines::<T>(&file, &self.path);
        file.unlock()?;

        let (records, _) = folded?;
        Ok(records)
    }

    /// Find the latest version of one record
    pub fn find(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self.load()?.into_iter().find(|r| r.record_id() == id))
    }

    /// Append a new version of an existing record
    pub fn replace(&self, record: &T) -> Result<()> {
        let id = record.record_id();
        if self.find(id)?.is_none() {
            return Err(Error::not_found(T::ENTITY, id));
        }
        self.append(std::slice::from_ref(record))
    }

    /// Rewrite the table so it holds exactly one line per record
    ///
    /// The snapshot goes to a temp file in the same directory which is then
    /// renamed over the table. Appends from another process that race the
    /// rename can be lost; run this while nothing else writes.
    /// Returns the number of superseded lines dropped.
    pub fn compact(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;
        let result = self.rewrite_locked(&file);
        file.unlock()?;

        let dropped = result?;
        if dropped > 0 {
            tracing::info!(
                "Compacted {:?}: dropped {} superseded line(s)",
                self.path,
                dropped
            );
        }
        Ok(dropped)
    }

    fn rewrite_locked(&self, file: &File) -> Result<usize> {
        let (records, lines) = fold_lines::<T>(file, &self.path)?;
        let dropped = lines - records.len();
        if dropped == 0 {
            return Ok(0);
        }

        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "table path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;
        write_lines(temp.as_file(), &records)?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(dropped)
    }
}

fn write_lines<T: Serialize>(file: &File, records: &[T]) -> Result<()> {
    let mut writer = std::io::BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Fold a table file into its latest records; also returns the number of
/// parsed lines.
fn fold_lines<T: Record>(file: &File, path: &Path) -> Result<(Vec<T>, usize)> {
    let reader = BufReader::new(file);
    let mut records: Vec<T> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut parsed = 0;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => {
                parsed += 1;
                match index.get(&record.record_id()) {
                    Some(&pos) => records[pos] = record,
                    None => {
                        index.insert(record.record_id(), records.len());
                        records.push(record);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable {} at {:?} line {}: {}",
                    T::ENTITY,
                    path,
                    line_num + 1,
                    e
                );
            }
        }
    }

    tracing::debug!("Read {} {} record(s) from {:?}", records.len(), T::ENTITY, path);
    Ok((records, parsed))
}

/// File-backed store: one JSON Lines table per entity under a data directory
pub struct JsonlStore {
    users: JsonlTable<User>,
    medications: JsonlTable<Medication>,
    enrollments: JsonlTable<Enrollment>,
    dose_logs: JsonlTable<DoseLog>,
}

impl JsonlStore {
    /// Open (lazily) the tables under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            users: JsonlTable::new(dir.join("users.jsonl")),
            medications: JsonlTable::new(dir.join("medications.jsonl")),
            enrollments: JsonlTable::new(dir.join("enrollments.jsonl")),
            dose_logs: JsonlTable::new(dir.join("dose_logs.jsonl")),
        }
    }

    /// Compact every table; returns the total number of lines dropped
    pub fn compact(&self) -> Result<usize> {
        Ok(self.users.compact()?
            + self.medications.compact()?
            + self.enrollments.compact()?
            + self.dose_logs.compact()?)
    }
}

impl UserRepository for JsonlStore {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users.append(std::slice::from_ref(user))
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.users.find(id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .load()?
            .into_iter()
            .find(|u| matches_ignoring_case(&u.email, email)))
    }
}

impl MedicationRepository for JsonlStore {
    fn create_medication(&self, medication: &Medication) -> Result<()> {
        self.medications.append(std::slice::from_ref(medication))
    }

    fn get_medication(&self, id: Uuid) -> Result<Option<Medication>> {
        self.medications.find(id)
    }

    fn get_medication_by_name(&self, name: &str) -> Result<Option<Medication>> {
        Ok(self
            .medications
            .load()?
            .into_iter()
            .find(|m| matches_ignoring_case(&m.name, name)))
    }

    fn update_medication(&self, medication: &Medication) -> Result<()> {
        self.medications.replace(medication)
    }

    fn list_medications(&self, limit: usize, offset: usize) -> Result<Vec<Medication>> {
        Ok(page_by_name(self.medications.load()?, limit, offset))
    }
}

impl EnrollmentRepository for JsonlStore {
    fn create_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.enrollments.append(std::slice::from_ref(enrollment))
    }

    fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>> {
        self.enrollments.find(id)
    }

    fn get_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        Ok(enrollments_of_user(self.enrollments.load()?, user_id, false))
    }

    fn get_active_enrollments_by_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        Ok(enrollments_of_user(self.enrollments.load()?, user_id, true))
    }

    fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.enrollments.replace(enrollment)
    }
}

impl DoseLogRepository for JsonlStore {
    fn create_dose_log(&self, log: &DoseLog) -> Result<()> {
        self.dose_logs.append(std::slice::from_ref(log))
    }

    fn create_dose_logs(&self, logs: &[DoseLog]) -> Result<()> {
        self.dose_logs.append(logs)
    }

    fn get_dose_log(&self, id: Uuid) -> Result<Option<DoseLog>> {
        self.dose_logs.find(id)
    }

    fn get_dose_logs_by_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<DoseLog>> {
        Ok(logs_of_enrollment(self.dose_logs.load()?, enrollment_id, None))
    }

    fn get_dose_logs_by_enrollment_and_range(
        &self,
        enrollment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DoseLog>> {
        Ok(logs_of_enrollment(
            self.dose_logs.load()?,
            enrollment_id,
            Some((start, end)),
        ))
    }

    fn update_dose_log(&self, log: &DoseLog) -> Result<()> {
        self.dose_logs.replace(log)
    }
}
