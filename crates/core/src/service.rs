//! Queue service: the single entry point used by the HTTP layer and the CLI.
//!
//! Every read-modify-write cycle (scheduling, passes, bootstrap) runs inside one `Mutex`
//! critical section that also owns the RNG, so concurrent requests against the same store
//! cannot interleave removals, replacements or renumbering within this process.

use crate::config::CoreConfig;
use crate::engine::{bootstrap_population, run_pass, PassReport};
use crate::generator::PatientGenerator;
use crate::patient::{Patient, TriageCategory};
use crate::scheduler::{SchedulerDecision, UpdateScheduler};
use crate::store::PatientStore;
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Attribute used to order the patient list returned by [`QueueService::queue`].
///
/// This only affects presentation; queue positions always follow the canonical ranking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    Id,
    TriageCategory,
    #[default]
    ArrivalTime,
    QueuePosition,
    TimeElapsed,
    Status,
}

impl FromStr for SortKey {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(SortKey::Id),
            "triage_category" | "triageCategory" => Ok(SortKey::TriageCategory),
            "arrival_time" | "arrivalTime" => Ok(SortKey::ArrivalTime),
            "queue_position" | "queuePosition" => Ok(SortKey::QueuePosition),
            "time_elapsed" | "timeElapsed" => Ok(SortKey::TimeElapsed),
            "status" | "current_phase" | "currentPhase" => Ok(SortKey::Status),
            other => Err(QueueError::InvalidInput(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

impl SortKey {
    /// Stable sort of `patients` by this key.
    pub fn apply(self, patients: &mut [Patient], now: DateTime<Utc>) {
        match self {
            SortKey::Id => patients.sort_by_key(|p| p.id),
            SortKey::TriageCategory => patients.sort_by_key(|p| p.triage_category),
            SortKey::ArrivalTime => patients.sort_by_key(|p| p.arrival_time),
            SortKey::QueuePosition => patients.sort_by_key(|p| p.queue_position),
            SortKey::TimeElapsed => patients.sort_by_key(|p| p.time_elapsed(now)),
            SortKey::Status => patients.sort_by_key(|p| p.phase()),
        }
    }
}

/// What [`QueueService::refresh`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub decision: SchedulerDecision,
    pub passes: Vec<PassReport>,
    /// Whether an empty store was seeded with a fresh population.
    pub bootstrapped: bool,
}

/// The live queue as served to clients.
#[derive(Clone, Debug)]
pub struct QueueSnapshot {
    pub as_of: DateTime<Utc>,
    pub waiting_count: usize,
    /// Longest current wait in minutes; 0 for an empty queue.
    pub longest_wait_minutes: i64,
    pub patients: Vec<Patient>,
}

/// Category breakdown over a freshly generated sample population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueStats {
    pub category_breakdown: BTreeMap<TriageCategory, usize>,
    /// Mean wait per category, rounded to the nearest minute; 0 for empty categories.
    pub average_wait_minutes: BTreeMap<TriageCategory, i64>,
}

pub struct QueueService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn PatientStore>,
    generator: Arc<dyn PatientGenerator>,
    scheduler: UpdateScheduler,
    rng: Mutex<StdRng>,
}

impl QueueService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn PatientStore>,
        generator: Arc<dyn PatientGenerator>,
        rng: StdRng,
    ) -> Self {
        let settings = cfg.settings();
        let scheduler =
            UpdateScheduler::new(settings.update_interval, settings.max_passes_per_request);
        Self {
            cfg,
            store,
            generator,
            scheduler,
            rng: Mutex::new(rng),
        }
    }

    /// Runs `f` inside the critical section.
    fn exclusive<T>(&self, f: impl FnOnce(&mut StdRng) -> QueueResult<T>) -> QueueResult<T> {
        let mut rng = self.rng.lock().map_err(|_| QueueError::LockPoisoned)?;
        f(&mut rng)
    }

    fn refresh_locked(&self, rng: &mut StdRng, now: DateTime<Utc>) -> QueueResult<RefreshOutcome> {
        let settings = self.cfg.settings();
        let decision = self.scheduler.plan(self.store.cursor()?, now);

        // An empty snapshot means no population, even if a stale cursor survived expiry.
        if self.store.get_all(now)?.is_empty() {
            bootstrap_population(
                self.store.as_ref(),
                self.generator.as_ref(),
                rng,
                settings,
                now,
            )?;
            self.store.set_cursor(now)?;
            return Ok(RefreshOutcome {
                decision,
                passes: Vec::new(),
                bootstrapped: true,
            });
        }

        let mut passes = Vec::new();
        match decision {
            SchedulerDecision::Bootstrap => self.store.set_cursor(now)?,
            SchedulerDecision::Idle { .. } => {}
            SchedulerDecision::Advance { passes: count, .. } => {
                for _ in 0..count {
                    passes.push(run_pass(
                        self.store.as_ref(),
                        self.generator.as_ref(),
                        rng,
                        settings,
                        now,
                    )?);
                }
                self.store.set_cursor(now)?;
            }
        }

        Ok(RefreshOutcome {
            decision,
            passes,
            bootstrapped: false,
        })
    }

    /// Brings the population up to date with `now`: runs whatever passes the scheduler asks
    /// for, then seeds an empty store.
    pub fn refresh(&self, now: DateTime<Utc>) -> QueueResult<RefreshOutcome> {
        self.exclusive(|rng| self.refresh_locked(rng, now))
    }

    /// Refreshes, then returns the live queue ordered by `sort`.
    pub fn queue(&self, now: DateTime<Utc>, sort: SortKey) -> QueueResult<QueueSnapshot> {
        let mut patients: Vec<Patient> = self.exclusive(|rng| {
            self.refresh_locked(rng, now)?;
            Ok(self.store.get_all(now)?.into_values().collect())
        })?;
        sort.apply(&mut patients, now);

        Ok(QueueSnapshot {
            as_of: now,
            waiting_count: patients.len(),
            longest_wait_minutes: patients
                .iter()
                .map(|p| p.time_elapsed(now))
                .max()
                .unwrap_or(0),
            patients,
        })
    }

    /// Looks up one patient. Unknown and malformed ids are both `NotFound`.
    pub fn patient(&self, id: &str, now: DateTime<Utc>) -> QueueResult<Patient> {
        let not_found = || QueueError::NotFound(format!("patient {id}"));
        let id = PatientId::parse(id).map_err(|_| not_found())?;
        self.store.get(&id, now)?.ok_or_else(not_found)
    }

    /// Category counts and mean waits over a freshly generated sample, not the live queue.
    pub fn stats(&self, now: DateTime<Utc>) -> QueueResult<QueueStats> {
        let sample_size = self.cfg.settings().bootstrap_population;
        let sample = self.exclusive(|rng| Ok(self.generator.backlog(rng, now, sample_size)))?;

        let mut waits: BTreeMap<TriageCategory, Vec<i64>> =
            TriageCategory::all().map(|c| (c, Vec::new())).collect();
        for patient in &sample {
            waits
                .entry(patient.triage_category)
                .or_default()
                .push(patient.time_elapsed(now));
        }

        let category_breakdown = waits.iter().map(|(c, w)| (*c, w.len())).collect();
        let average_wait_minutes = waits
            .iter()
            .map(|(c, w)| {
                let average = if w.is_empty() {
                    0
                } else {
                    (w.iter().sum::<i64>() as f64 / w.len() as f64).round() as i64
                };
                (*c, average)
            })
            .collect();

        Ok(QueueStats {
            category_breakdown,
            average_wait_minutes,
        })
    }

    /// Forces one pass regardless of the scheduler and moves the cursor to `now`.
    pub fn advance(&self, now: DateTime<Utc>) -> QueueResult<PassReport> {
        self.exclusive(|rng| {
            let report = run_pass(
                self.store.as_ref(),
                self.generator.as_ref(),
                rng,
                self.cfg.settings(),
                now,
            )?;
            self.store.set_cursor(now)?;
            Ok(report)
        })
    }

    /// Empties the store and forgets the cursor.
    pub fn reset(&self) -> QueueResult<()> {
        self.exclusive(|_| self.store.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;
    use crate::generator::MockPatientGenerator;
    use crate::ranking::tests::assert_dense;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn service_with(settings: SimulationSettings) -> (QueueService, Arc<MemoryStore>) {
        let cfg = Arc::new(
            CoreConfig::new(PathBuf::from("unused"), settings).expect("settings are valid"),
        );
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(MockPatientGenerator::new(cfg.settings().backlog_window));
        let service = QueueService::new(
            cfg,
            store.clone(),
            generator,
            StdRng::seed_from_u64(2026),
        );
        (service, store)
    }

    fn service() -> (QueueService, Arc<MemoryStore>) {
        service_with(SimulationSettings::default())
    }

    #[test]
    fn test_first_query_bootstraps_dense_population() {
        let (service, store) = service();

        let snapshot = service
            .queue(t(0), SortKey::default())
            .expect("queue should succeed");

        assert_eq!(snapshot.waiting_count, 25);
        assert_eq!(snapshot.patients.len(), 25);
        assert_dense(&snapshot.patients);
        assert_eq!(store.cursor().unwrap(), Some(t(0)));
        assert!(snapshot.longest_wait_minutes >= 0);
    }

    #[test]
    fn test_refresh_within_interval_changes_nothing() {
        let (service, store) = service();
        service.refresh(t(0)).expect("bootstrap refresh");
        let before = store.get_all(t(0)).unwrap();

        let outcome = service.refresh(t(14)).expect("idle refresh");

        assert_eq!(outcome.decision, SchedulerDecision::Idle { elapsed_minutes: 14 });
        assert!(outcome.passes.is_empty());
        assert!(!outcome.bootstrapped);
        assert_eq!(store.get_all(t(14)).unwrap(), before);
        assert_eq!(store.cursor().unwrap(), Some(t(0)), "cursor only moves on passes");
    }

    #[test]
    fn test_refresh_after_interval_runs_one_pass_and_moves_cursor() {
        let (service, store) = service();
        service.refresh(t(0)).expect("bootstrap refresh");

        let outcome = service.refresh(t(50)).expect("advancing refresh");

        assert_eq!(
            outcome.decision,
            SchedulerDecision::Advance {
                passes: 1,
                updates_needed: 3
            }
        );
        assert_eq!(outcome.passes.len(), 1);
        assert_eq!(outcome.passes[0].advanced, 25, "every bootstrap patient is non-terminal");
        assert_eq!(store.cursor().unwrap(), Some(t(50)));

        let population: Vec<Patient> = store.get_all(t(50)).unwrap().into_values().collect();
        assert!(population.iter().all(|p| !p.phase().is_terminal()));
        assert_dense(&population);
    }

    #[test]
    fn test_expired_population_is_rebootstrapped_not_grown() {
        let (service, store) = service_with(SimulationSettings {
            growth_probability: 1.0,
            ..SimulationSettings::default()
        });
        service.refresh(t(0)).expect("bootstrap refresh");
        assert_eq!(store.cursor().unwrap(), Some(t(0)));

        let later = t(25 * 60);
        assert!(store.get_all(later).unwrap().is_empty(), "records outlive their ttl");

        let snapshot = service
            .queue(later, SortKey::default())
            .expect("queue should succeed");

        assert_eq!(snapshot.waiting_count, 25);
        assert_dense(&snapshot.patients);
        assert_eq!(store.cursor().unwrap(), Some(later));
    }

    #[test]
    fn test_refresh_reports_bootstrap_on_stale_cursor() {
        let (service, _store) = service();
        service.refresh(t(0)).expect("bootstrap refresh");

        let outcome = service.refresh(t(25 * 60)).expect("refresh after expiry");
        assert!(outcome.bootstrapped);
        assert!(outcome.passes.is_empty(), "no pass runs over an empty population");
    }

    #[test]
    fn test_catch_up_runs_multiple_passes_when_allowed() {
        let (service, _store) = service_with(SimulationSettings {
            max_passes_per_request: 8,
            ..SimulationSettings::default()
        });
        service.refresh(t(0)).expect("bootstrap refresh");

        let outcome = service.refresh(t(60)).expect("catch-up refresh");
        assert_eq!(outcome.passes.len(), 4);
    }

    #[test]
    fn test_queue_sorting() {
        let (service, _store) = service();

        let by_category = service
            .queue(t(0), SortKey::TriageCategory)
            .expect("queue should succeed");
        assert!(by_category
            .patients
            .windows(2)
            .all(|w| w[0].triage_category <= w[1].triage_category));

        let by_position = service
            .queue(t(1), SortKey::QueuePosition)
            .expect("queue should succeed");
        let globals: Vec<u32> = by_position
            .patients
            .iter()
            .map(|p| p.queue_position.global)
            .collect();
        assert_eq!(globals, (1..=25).collect::<Vec<u32>>());

        let by_arrival = service
            .queue(t(2), SortKey::ArrivalTime)
            .expect("queue should succeed");
        assert!(by_arrival
            .patients
            .windows(2)
            .all(|w| w[0].arrival_time <= w[1].arrival_time));
        assert_eq!(
            by_arrival.longest_wait_minutes,
            by_arrival.patients[0].time_elapsed(t(2))
        );
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("arrival_time".parse::<SortKey>().unwrap(), SortKey::ArrivalTime);
        assert_eq!("triageCategory".parse::<SortKey>().unwrap(), SortKey::TriageCategory);
        assert_eq!("status".parse::<SortKey>().unwrap(), SortKey::Status);
        assert_eq!("time_elapsed".parse::<SortKey>().unwrap(), SortKey::TimeElapsed);
        assert!(matches!(
            "shoe_size".parse::<SortKey>(),
            Err(QueueError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_patient_lookup() {
        let (service, _store) = service();
        let snapshot = service.queue(t(0), SortKey::default()).unwrap();
        let known = &snapshot.patients[0];

        let found = service
            .patient(&known.id.to_string(), t(0))
            .expect("known patient should be found");
        assert_eq!(&found, known);

        let unknown = PatientId::new().to_string();
        assert!(matches!(
            service.patient(&unknown, t(0)),
            Err(QueueError::NotFound(_))
        ));
        assert!(matches!(
            service.patient("not-an-id", t(0)),
            Err(QueueError::NotFound(_))
        ));
    }

    #[test]
    fn test_stats_cover_every_category() {
        let (service, store) = service();
        let stats = service.stats(t(0)).expect("stats should succeed");

        assert_eq!(stats.category_breakdown.len(), 5);
        assert_eq!(stats.average_wait_minutes.len(), 5);
        assert_eq!(stats.category_breakdown.values().sum::<usize>(), 25);
        for (category, average) in &stats.average_wait_minutes {
            assert!(*average >= 0);
            if stats.category_breakdown[category] == 0 {
                assert_eq!(*average, 0);
            }
        }
        assert!(
            store.get_all(t(0)).unwrap().is_empty(),
            "stats must not touch the live queue"
        );
    }

    #[test]
    fn test_advance_forces_a_pass() {
        let (service, store) = service();
        service.refresh(t(0)).unwrap();

        let report = service.advance(t(1)).expect("forced pass should succeed");
        assert_eq!(report.population, store.get_all(t(1)).unwrap().len());
        assert_eq!(store.cursor().unwrap(), Some(t(1)));
    }

    #[test]
    fn test_reset_clears_store_and_cursor() {
        let (service, store) = service();
        service.refresh(t(0)).unwrap();

        service.reset().expect("reset should succeed");
        assert!(store.get_all(t(0)).unwrap().is_empty());
        assert_eq!(store.cursor().unwrap(), None);
    }

    #[test]
    fn test_concurrent_requests_keep_positions_dense() {
        let (service, store) = service();
        let service = Arc::new(service);
        service.refresh(t(0)).unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service
                        .queue(t(15 * i), SortKey::default())
                        .expect("queue should succeed")
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        let population: Vec<Patient> = store.get_all(t(200)).unwrap().into_values().collect();
        assert!(population.iter().all(|p| !p.phase().is_terminal()));
        assert_dense(&population);
    }
}
