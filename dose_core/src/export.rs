//! CSV export of dose logs.
//!
//! The file is written to a temp file next to the destination, synced, and
//! renamed into place so a reader never sees a half-written export.

use crate::{DoseLog, Error, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    enrollment_id: String,
    time_slot: &'static str,
    planned_dose: f64,
    taken: bool,
    timestamp: String,
}

impl From<&DoseLog> for CsvRow {
    fn from(log: &DoseLog) -> Self {
        CsvRow {
            id: log.id.to_string(),
            enrollment_id: log.enrollment_id.to_string(),
            time_slot: log.time_slot.as_str(),
            planned_dose: log.planned_dose,
            taken: log.taken,
            timestamp: log.timestamp.to_rfc3339(),
        }
    }
}

/// Write dose logs to `csv_path`, replacing any previous export
///
/// Headers are always written, even for an empty log list.
/// Returns the number of rows written.
pub fn export_dose_logs(logs: &[DoseLog], csv_path: &Path) -> Result<usize> {
    let parent = match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());

        writer.write_record([
            "id",
            "enrollment_id",
            "time_slot",
            "planned_dose",
            "taken",
            "timestamp",
        ])?;
        for log in logs {
            writer.serialize(CsvRow::from(log))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} dose logs to {:?}", logs.len(), csv_path);
    Ok(logs.len())
}
