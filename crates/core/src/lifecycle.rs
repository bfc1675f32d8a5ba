//! Per-patient phase and investigation state machines.
//!
//! One call to [`advance_patient`] is one pass for one patient. The transition is keyed off the
//! phase captured on entry, so a patient entering `investigations_pending` in this pass gets
//! freshly ordered tests, while a patient already there has its tests advanced one step as it
//! moves on to treatment. Investigation completeness never gates the phase.

use crate::patient::{ordered_investigations, Investigations, Patient, Phase};
use rand::{Rng, RngCore};

/// What a single pass did to one patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The patient was already terminal and was left alone.
    Unchanged,
    Phase { from: Phase, to: Phase },
}

impl Advance {
    /// True when this pass moved the patient into a terminal phase.
    pub fn reached_terminal(self) -> bool {
        matches!(self, Advance::Phase { to, .. } if to.is_terminal())
    }
}

/// Advances `patient` exactly one phase step.
///
/// `treatment` resolves to `admitted` with probability `admission_probability`, otherwise
/// `discharged`, using one draw from `rng`.
pub fn advance_patient(
    patient: &mut Patient,
    rng: &mut dyn RngCore,
    admission_probability: f64,
) -> Advance {
    let from = patient.status.current_phase;
    let to = match from {
        Phase::Registered => Phase::Triaged,
        Phase::Triaged => {
            patient.status.investigations = Some(ordered_investigations());
            Phase::InvestigationsPending
        }
        Phase::InvestigationsPending => {
            let investigations = patient
                .status
                .investigations
                .get_or_insert_with(ordered_investigations);
            advance_investigations(investigations);
            Phase::Treatment
        }
        Phase::Treatment => {
            if rng.gen_bool(admission_probability) {
                Phase::Admitted
            } else {
                Phase::Discharged
            }
        }
        Phase::Admitted | Phase::Discharged => return Advance::Unchanged,
    };

    patient.status.current_phase = to;
    Advance::Phase { from, to }
}

/// Moves every test one step along `ordered → pending → reported`; `reported` stays put.
pub fn advance_investigations(investigations: &mut Investigations) {
    for state in investigations.values_mut() {
        *state = state.next();
    }
}
