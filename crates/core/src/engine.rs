//! One advancement pass over the whole population.
//!
//! A pass reads the stored snapshot, advances every patient one step in canonical order,
//! purges patients that are terminal, renumbers the survivors densely, generates one
//! replacement per removal at the back of the queue, and may add one extra arrival while the
//! population is below its floor. Each write goes straight to the store; a failure part-way
//! through is returned as-is with no rollback.

use crate::config::SimulationSettings;
use crate::generator::PatientGenerator;
use crate::lifecycle::{advance_patient, Advance};
use crate::patient::Patient;
use crate::ranking::{canonical_sort, rank_in_place, PositionCounter};
use crate::store::PatientStore;
use crate::QueueResult;
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use rand::{Rng, RngCore};
use std::collections::BTreeSet;

/// Summary of a single pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Patients whose phase moved this pass.
    pub advanced: usize,
    pub removed: BTreeSet<PatientId>,
    pub replacements: usize,
    /// Whether an extra arrival was added below the population floor.
    pub grown: bool,
    /// Live population after the pass.
    pub population: usize,
}

/// Runs one pass against `store`.
///
/// # Errors
///
/// Propagates the first store failure. Writes already made are kept.
pub fn run_pass(
    store: &dyn PatientStore,
    generator: &dyn PatientGenerator,
    rng: &mut dyn RngCore,
    settings: &SimulationSettings,
    now: DateTime<Utc>,
) -> QueueResult<PassReport> {
    let mut patients: Vec<Patient> = store.get_all(now)?.into_values().collect();
    canonical_sort(&mut patients);

    let mut report = PassReport::default();
    for patient in patients.iter_mut() {
        let step = advance_patient(patient, rng, settings.admission_probability);
        if let Advance::Phase { .. } = step {
            report.advanced += 1;
        }
        if patient.phase().is_terminal() {
            store.remove(&patient.id)?;
            tracing::debug!(
                this_pass = step.reached_terminal(),
                "patient {} left the queue ({})",
                patient.id,
                patient.phase()
            );
            report.removed.insert(patient.id);
        }
    }
    patients.retain(|p| !report.removed.contains(&p.id));

    let expires_at = now + settings.patient_ttl;
    let mut counter = PositionCounter::new();
    for patient in patients.iter_mut() {
        counter.assign(patient);
        store.put(patient, expires_at)?;
    }

    for _ in 0..report.removed.len() {
        let mut replacement = generator.arrival(rng, now);
        counter.assign(&mut replacement);
        store.put(&replacement, expires_at)?;
        patients.push(replacement);
        report.replacements += 1;
    }

    if patients.len() < settings.population_floor && rng.gen_bool(settings.growth_probability) {
        let mut arrival = generator.arrival(rng, now);
        counter.assign(&mut arrival);
        store.put(&arrival, expires_at)?;
        patients.push(arrival);
        report.grown = true;
    }

    report.population = patients.len();
    tracing::info!(
        advanced = report.advanced,
        removed = report.removed.len(),
        replacements = report.replacements,
        grown = report.grown,
        population = report.population,
        "queue pass complete"
    );
    Ok(report)
}

/// Seeds an empty store with a ranked backlog population.
pub fn bootstrap_population(
    store: &dyn PatientStore,
    generator: &dyn PatientGenerator,
    rng: &mut dyn RngCore,
    settings: &SimulationSettings,
    now: DateTime<Utc>,
) -> QueueResult<Vec<Patient>> {
    let mut patients = generator.backlog(rng, now, settings.bootstrap_population);
    let ranked = rank_in_place(&mut patients);

    let expires_at = now + settings.patient_ttl;
    for patient in &patients {
        store.put(patient, expires_at)?;
    }
    tracing::info!("bootstrapped queue with {} patients", ranked.assigned());
    Ok(patients)
}
