//! Constants used throughout the queue core crate.
//!
//! Storage names and simulation defaults live here so the stores, the config layer and the
//! binaries agree on them.

/// Default directory for queue data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "queue_data";

/// Directory name (under the data directory) holding one sharded record per patient.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Filename for a patient's JSON record.
pub const PATIENT_JSON_FILENAME: &str = "patient.json";

/// Filename for the scheduler's last-update cursor.
pub const LAST_UPDATE_FILENAME: &str = "last_update";

/// Number of triage categories; category 1 is the most urgent.
pub const TRIAGE_CATEGORY_COUNT: usize = 5;

/// Soft minimum population the engine nudges towards.
pub const DEFAULT_POPULATION_FLOOR: usize = 30;

/// Size of a freshly generated population (bootstrap and stats samples).
pub const DEFAULT_BOOTSTRAP_POPULATION: usize = 25;

/// Minutes of wall-clock time per simulated step.
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: i64 = 15;

/// Upper bound on passes run while serving a single request.
pub const DEFAULT_MAX_PASSES_PER_REQUEST: u32 = 1;

/// Chance per pass of one extra arrival while below the population floor.
pub const DEFAULT_GROWTH_PROBABILITY: f64 = 0.3;

/// Chance that a patient leaving treatment is admitted rather than discharged.
pub const DEFAULT_ADMISSION_PROBABILITY: f64 = 0.15;

/// Hours a persisted patient record lives without being rewritten.
pub const DEFAULT_PATIENT_TTL_HOURS: i64 = 24;

/// How far back generated backlog patients may have arrived.
pub const DEFAULT_BACKLOG_WINDOW_MINUTES: i64 = 240;
