//! Patient persistence.
//!
//! The engine talks to storage only through [`PatientStore`]. A store is constructed once at
//! process start and shared as `Arc<dyn PatientStore>`; there is no ambient global handle.
//!
//! Every record carries an expiry. Expired records are dropped the next time the population
//! is read, which bounds growth from processes that crash mid-pass. The scheduler cursor has
//! no expiry.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::patient::Patient;
use crate::QueueResult;
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use std::collections::BTreeMap;

/// Keyed patient storage with expiry plus the scheduler's last-update cursor.
///
/// Failures are not retried; they propagate to the caller and fail the request.
pub trait PatientStore: Send + Sync {
    /// Every unexpired patient at `now`, keyed (and therefore ordered) by id.
    ///
    /// An empty map means "no population yet".
    fn get_all(&self, now: DateTime<Utc>) -> QueueResult<BTreeMap<PatientId, Patient>>;

    /// A single unexpired patient.
    fn get(&self, id: &PatientId, now: DateTime<Utc>) -> QueueResult<Option<Patient>> {
        Ok(self.get_all(now)?.remove(id))
    }

    /// Inserts or overwrites `patient`, live until `expires_at`.
    fn put(&self, patient: &Patient, expires_at: DateTime<Utc>) -> QueueResult<()>;

    /// Deletes a patient. Removing an absent id is not an error.
    fn remove(&self, id: &PatientId) -> QueueResult<()>;

    /// When the population was last advanced, if ever.
    fn cursor(&self) -> QueueResult<Option<DateTime<Utc>>>;

    fn set_cursor(&self, at: DateTime<Utc>) -> QueueResult<()>;

    /// Drops every patient and the cursor.
    fn clear(&self) -> QueueResult<()>;
}
