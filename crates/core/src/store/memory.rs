use super::PatientStore;
use crate::patient::Patient;
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    patients: BTreeMap<PatientId, (Patient, DateTime<Utc>)>,
    cursor: Option<DateTime<Utc>>,
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> QueueResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| QueueError::LockPoisoned)
    }
}

impl PatientStore for MemoryStore {
    fn get_all(&self, now: DateTime<Utc>) -> QueueResult<BTreeMap<PatientId, Patient>> {
        let mut inner = self.lock()?;
        inner.patients.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(inner
            .patients
            .iter()
            .map(|(id, (patient, _))| (*id, patient.clone()))
            .collect())
    }

    fn get(&self, id: &PatientId, now: DateTime<Utc>) -> QueueResult<Option<Patient>> {
        let inner = self.lock()?;
        Ok(inner
            .patients
            .get(id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(patient, _)| patient.clone()))
    }

    fn put(&self, patient: &Patient, expires_at: DateTime<Utc>) -> QueueResult<()> {
        self.lock()?
            .patients
            .insert(patient.id, (patient.clone(), expires_at));
        Ok(())
    }

    fn remove(&self, id: &PatientId) -> QueueResult<()> {
        self.lock()?.patients.remove(id);
        Ok(())
    }

    fn cursor(&self) -> QueueResult<Option<DateTime<Utc>>> {
        Ok(self.lock()?.cursor)
    }

    fn set_cursor(&self, at: DateTime<Utc>) -> QueueResult<()> {
        self.lock()?.cursor = Some(at);
        Ok(())
    }

    fn clear(&self) -> QueueResult<()> {
        let mut inner = self.lock()?;
        inner.patients.clear();
        inner.cursor = None;
        Ok(())
    }
}
