//! Patient records and their clinical status.
//!
//! A [`Patient`] carries an immutable identity (id, triage category, arrival time) plus the
//! mutable status the lifecycle state machines advance and the queue position the ranking
//! step recomputes every pass. Records are stored and served as camelCase JSON.

use crate::constants::TRIAGE_CATEGORY_COUNT;
use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use edq_uuid::PatientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Urgency class from 1 (most urgent) to 5 (least urgent).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriageCategory(u8);

impl TriageCategory {
    pub const MOST_URGENT: TriageCategory = TriageCategory(1);
    pub const LEAST_URGENT: TriageCategory = TriageCategory(TRIAGE_CATEGORY_COUNT as u8);

    /// # Errors
    ///
    /// Returns [`QueueError::InvalidInput`] if `value` is outside 1..=5.
    pub fn new(value: u8) -> QueueResult<Self> {
        if (1..=TRIAGE_CATEGORY_COUNT as u8).contains(&value) {
            Ok(Self(value))
        } else {
            Err(QueueError::InvalidInput(format!(
                "triage category must be within 1..={TRIAGE_CATEGORY_COUNT}, got {value}"
            )))
        }
    }

    /// Every category, most urgent first.
    pub fn all() -> impl Iterator<Item = TriageCategory> {
        (1..=TRIAGE_CATEGORY_COUNT as u8).map(TriageCategory)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot for per-category tables.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl fmt::Display for TriageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TriageCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for TriageCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        TriageCategory::new(value).map_err(serde::de::Error::custom)
    }
}

/// Coarse clinical stage of a patient's journey through the department.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Registered,
    Triaged,
    InvestigationsPending,
    Treatment,
    Admitted,
    Discharged,
}

impl Phase {
    /// Admitted and discharged patients leave the queue at the end of the pass.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Admitted | Phase::Discharged)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Registered => "registered",
            Phase::Triaged => "triaged",
            Phase::InvestigationsPending => "investigations_pending",
            Phase::Treatment => "treatment",
            Phase::Admitted => "admitted",
            Phase::Discharged => "discharged",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic test kinds tracked while a patient is under investigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Labs,
    Imaging,
}

impl TestKind {
    pub const ALL: [TestKind; 2] = [TestKind::Labs, TestKind::Imaging];

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Labs => "labs",
            TestKind::Imaging => "imaging",
        }
    }
}

/// Lifecycle of a single test: `ordered → pending → reported`.
///
/// Variants are declared in lifecycle order so `Ord` reflects progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestigationState {
    Ordered,
    Pending,
    Reported,
}

impl InvestigationState {
    /// The following state; `Reported` stays `Reported`.
    pub fn next(self) -> Self {
        match self {
            InvestigationState::Ordered => InvestigationState::Pending,
            InvestigationState::Pending | InvestigationState::Reported => {
                InvestigationState::Reported
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvestigationState::Ordered => "ordered",
            InvestigationState::Pending => "pending",
            InvestigationState::Reported => "reported",
        }
    }
}

/// Per-test investigation state.
pub type Investigations = BTreeMap<TestKind, InvestigationState>;

/// Investigations as they stand the moment a patient enters `investigations_pending`.
pub fn ordered_investigations() -> Investigations {
    TestKind::ALL
        .into_iter()
        .map(|kind| (kind, InvestigationState::Ordered))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatus {
    pub current_phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigations: Option<Investigations>,
}

impl PatientStatus {
    pub fn new(current_phase: Phase) -> Self {
        Self {
            current_phase,
            investigations: None,
        }
    }
}

/// Dense queue positions; `0` means "not ranked yet".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueuePosition {
    pub global: u32,
    pub category: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub triage_category: TriageCategory,
    pub arrival_time: DateTime<Utc>,
    pub status: PatientStatus,
    #[serde(default)]
    pub queue_position: QueuePosition,
}

impl Patient {
    /// A newly registered, unranked patient.
    pub fn new(triage_category: TriageCategory, arrival_time: DateTime<Utc>) -> Self {
        Self {
            id: PatientId::new(),
            triage_category,
            arrival_time,
            status: PatientStatus::new(Phase::Registered),
            queue_position: QueuePosition::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.current_phase
    }

    /// Whole minutes since arrival at `now`; never negative.
    pub fn time_elapsed(&self, now: DateTime<Utc>) -> i64 {
        (now - self.arrival_time).num_minutes().max(0)
    }
}
