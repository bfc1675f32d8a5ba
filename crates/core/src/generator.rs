//! Synthetic patient generation.
//!
//! The engine asks a [`PatientGenerator`] for fresh arrivals (replacements and opportunistic
//! growth) and for backlog populations (bootstrap and stats samples). Stores never generate.

use crate::lifecycle::advance_investigations;
use crate::patient::{ordered_investigations, Patient, Phase, TriageCategory};
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

/// Source of synthetic patients.
pub trait PatientGenerator: Send + Sync {
    /// A patient walking in at `now`: phase `registered`, unranked.
    fn arrival(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Patient;

    /// `count` patients who are already somewhere in the department at `now`.
    fn backlog(&self, rng: &mut dyn RngCore, now: DateTime<Utc>, count: usize) -> Vec<Patient>;
}

/// Relative frequency of triage categories 1..=5 in a typical department.
pub const DEFAULT_CATEGORY_WEIGHTS: [u32; 5] = [5, 15, 35, 30, 15];

const BACKLOG_PHASES: [Phase; 4] = [
    Phase::Registered,
    Phase::Triaged,
    Phase::InvestigationsPending,
    Phase::Treatment,
];

/// Default generator: weighted triage categories, backlog arrivals spread uniformly over a
/// window before `now`.
#[derive(Clone, Debug)]
pub struct MockPatientGenerator {
    categories: WeightedIndex<u32>,
    backlog_window: Duration,
}

impl MockPatientGenerator {
    pub fn new(backlog_window: Duration) -> Self {
        // The default weights are all non-zero.
        Self::with_weights(DEFAULT_CATEGORY_WEIGHTS, backlog_window)
            .expect("default category weights are valid")
    }

    /// # Errors
    ///
    /// Returns [`QueueError::InvalidInput`] if every weight is zero.
    pub fn with_weights(weights: [u32; 5], backlog_window: Duration) -> QueueResult<Self> {
        let categories = WeightedIndex::new(weights)
            .map_err(|e| QueueError::InvalidInput(format!("category weights: {e}")))?;
        Ok(Self {
            categories,
            backlog_window,
        })
    }

    fn category(&self, rng: &mut dyn RngCore) -> TriageCategory {
        let index = self.categories.sample(rng);
        TriageCategory::all()
            .nth(index)
            .unwrap_or(TriageCategory::LEAST_URGENT)
    }
}

impl PatientGenerator for MockPatientGenerator {
    fn arrival(&self, rng: &mut dyn RngCore, now: DateTime<Utc>) -> Patient {
        Patient::new(self.category(rng), now)
    }

    fn backlog(&self, rng: &mut dyn RngCore, now: DateTime<Utc>, count: usize) -> Vec<Patient> {
        let window = self.backlog_window.num_minutes().max(0);
        (0..count)
            .map(|_| {
                let waited = rng.gen_range(0..=window);
                let mut patient = Patient::new(self.category(rng), now - Duration::minutes(waited));

                let phase = BACKLOG_PHASES[rng.gen_range(0..BACKLOG_PHASES.len())];
                patient.status.current_phase = phase;
                match phase {
                    Phase::InvestigationsPending => {
                        patient.status.investigations = Some(ordered_investigations());
                    }
                    Phase::Treatment => {
                        let mut investigations = ordered_investigations();
                        advance_investigations(&mut investigations);
                        patient.status.investigations = Some(investigations);
                    }
                    _ => {}
                }
                patient
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::InvestigationState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn generator() -> MockPatientGenerator {
        MockPatientGenerator::new(Duration::minutes(240))
    }

    #[test]
    fn test_arrival_is_registered_and_unranked() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let patient = generator().arrival(&mut rng, now);

        assert_eq!(patient.phase(), Phase::Registered);
        assert_eq!(patient.arrival_time, now);
        assert_eq!(patient.queue_position.global, 0);
        assert!(patient.status.investigations.is_none());
    }

    #[test]
    fn test_backlog_respects_window_and_phase_invariants() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = Utc::now();
        let patients = generator().backlog(&mut rng, now, 200);

        assert_eq!(patients.len(), 200);
        for patient in &patients {
            assert!(patient.arrival_time <= now);
            assert!(now - patient.arrival_time <= Duration::minutes(240));
            assert!(!patient.phase().is_terminal());

            let has_investigations = patient.status.investigations.is_some();
            match patient.phase() {
                Phase::Registered | Phase::Triaged => assert!(!has_investigations),
                Phase::InvestigationsPending => assert!(patient
                    .status
                    .investigations
                    .as_ref()
                    .unwrap()
                    .values()
                    .all(|s| *s == InvestigationState::Ordered)),
                Phase::Treatment => assert!(has_investigations),
                other => panic!("unexpected backlog phase {other}"),
            }
        }
    }

    #[test]
    fn test_all_zero_weights_are_rejected() {
        let err = MockPatientGenerator::with_weights([0; 5], Duration::zero())
            .expect_err("all-zero weights should fail");
        assert!(matches!(err, QueueError::InvalidInput(_)));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut rng = StdRng::seed_from_u64(3);
        let patients = generator().backlog(&mut rng, Utc::now(), 100);
        let ids: BTreeSet<_> = patients.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_single_weight_pins_category() {
        let mut rng = StdRng::seed_from_u64(5);
        let only_category_two =
            MockPatientGenerator::with_weights([0, 1, 0, 0, 0], Duration::zero())
                .expect("one non-zero weight is enough");
        for _ in 0..20 {
            let patient = only_category_two.arrival(&mut rng, Utc::now());
            assert_eq!(patient.triage_category.get(), 2);
        }
    }
}
