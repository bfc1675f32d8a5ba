//! File-backed patient store.
//!
//! ## Storage layout
//!
//! ```text
//! <data_dir>/
//!   last_update              # RFC 3339 cursor, no expiry
//!   patients/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           patient.json     # {"expiresAt": ..., "patient": {...}}
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the patient id.

use super::PatientStore;
use crate::constants::{LAST_UPDATE_FILENAME, PATIENTS_DIR_NAME, PATIENT_JSON_FILENAME};
use crate::patient::Patient;
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPatient {
    expires_at: DateTime<Utc>,
    patient: Patient,
}

/// Stores each patient as a JSON file in a sharded directory tree.
#[derive(Clone, Debug)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    fn cursor_path(&self) -> PathBuf {
        self.data_dir.join(LAST_UPDATE_FILENAME)
    }

    fn patient_dir(&self, id: &PatientId) -> PathBuf {
        id.sharded_dir(&self.patients_dir())
    }

    /// Reads one record. `Ok(None)` if the record is absent or expired; expired records are
    /// deleted on the way.
    fn read_record(&self, record_dir: &Path, now: DateTime<Utc>) -> QueueResult<Option<Patient>> {
        let path = record_dir.join(PATIENT_JSON_FILENAME);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(QueueError::FileRead(e)),
        };
        let stored: StoredPatient =
            serde_json::from_str(&contents).map_err(QueueError::Deserialization)?;

        if stored.expires_at <= now {
            tracing::debug!("dropping expired patient record {}", path.display());
            remove_dir_if_present(record_dir)?;
            return Ok(None);
        }
        Ok(Some(stored.patient))
    }
}

fn remove_dir_if_present(dir: &Path) -> QueueResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(QueueError::FileRemove(e)),
    }
}

/// Lists subdirectories of `dir`; a missing directory has none.
fn subdirs(dir: &Path) -> QueueResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(QueueError::FileRead(e)),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(QueueError::FileRead)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

impl PatientStore for FileStore {
    fn get_all(&self, now: DateTime<Utc>) -> QueueResult<BTreeMap<PatientId, Patient>> {
        let mut patients = BTreeMap::new();
        for s1 in subdirs(&self.patients_dir())? {
            for s2 in subdirs(&s1)? {
                for record_dir in subdirs(&s2)? {
                    if let Some(patient) = self.read_record(&record_dir, now)? {
                        patients.insert(patient.id, patient);
                    }
                }
            }
        }
        Ok(patients)
    }

    fn get(&self, id: &PatientId, now: DateTime<Utc>) -> QueueResult<Option<Patient>> {
        self.read_record(&self.patient_dir(id), now)
    }

    fn put(&self, patient: &Patient, expires_at: DateTime<Utc>) -> QueueResult<()> {
        let dir = self.patient_dir(&patient.id);
        fs::create_dir_all(&dir).map_err(QueueError::StorageDirCreation)?;

        let stored = StoredPatient {
            expires_at,
            patient: patient.clone(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(QueueError::Serialization)?;

        // Write then rename so readers never observe a half-written record.
        let tmp = dir.join(format!("{PATIENT_JSON_FILENAME}.tmp"));
        fs::write(&tmp, json).map_err(QueueError::FileWrite)?;
        fs::rename(&tmp, dir.join(PATIENT_JSON_FILENAME)).map_err(QueueError::FileWrite)
    }

    fn remove(&self, id: &PatientId) -> QueueResult<()> {
        remove_dir_if_present(&self.patient_dir(id))
    }

    fn cursor(&self) -> QueueResult<Option<DateTime<Utc>>> {
        let text = match fs::read_to_string(self.cursor_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(QueueError::FileRead(e)),
        };
        DateTime::parse_from_rfc3339(text.trim())
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| QueueError::InvalidTimestamp(format!("{:?}: {e}", text.trim())))
    }

    fn set_cursor(&self, at: DateTime<Utc>) -> QueueResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(QueueError::StorageDirCreation)?;
        fs::write(self.cursor_path(), at.to_rfc3339()).map_err(QueueError::FileWrite)
    }

    fn clear(&self) -> QueueResult<()> {
        remove_dir_if_present(&self.patients_dir())?;
        match fs::remove_file(self.cursor_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::FileRemove(e)),
        }
    }
}
