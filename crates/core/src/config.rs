//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the queue service
//! as an `Arc<CoreConfig>`. Nothing in the core reads process-wide environment variables while
//! serving a request; binaries hand a lookup function to [`SimulationSettings::from_env_values`]
//! instead.

use crate::constants::{
    DEFAULT_ADMISSION_PROBABILITY, DEFAULT_BACKLOG_WINDOW_MINUTES, DEFAULT_BOOTSTRAP_POPULATION,
    DEFAULT_GROWTH_PROBABILITY, DEFAULT_MAX_PASSES_PER_REQUEST, DEFAULT_PATIENT_TTL_HOURS,
    DEFAULT_POPULATION_FLOOR, DEFAULT_UPDATE_INTERVAL_MINUTES,
};
use crate::{QueueError, QueueResult};
use chrono::Duration;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Tunable parameters of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    /// Soft minimum population; below it the engine may add one extra arrival per pass.
    pub population_floor: usize,
    /// Patients generated when the store is empty, and per stats sample.
    pub bootstrap_population: usize,
    /// Wall-clock time per simulated step.
    pub update_interval: Duration,
    /// Cap on catch-up passes run while serving one request.
    pub max_passes_per_request: u32,
    pub growth_probability: f64,
    pub admission_probability: f64,
    /// Expiry horizon applied every time a patient record is written.
    pub patient_ttl: Duration,
    /// How far back generated backlog patients may have arrived.
    pub backlog_window: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            population_floor: DEFAULT_POPULATION_FLOOR,
            bootstrap_population: DEFAULT_BOOTSTRAP_POPULATION,
            update_interval: Duration::minutes(DEFAULT_UPDATE_INTERVAL_MINUTES),
            max_passes_per_request: DEFAULT_MAX_PASSES_PER_REQUEST,
            growth_probability: DEFAULT_GROWTH_PROBABILITY,
            admission_probability: DEFAULT_ADMISSION_PROBABILITY,
            patient_ttl: Duration::hours(DEFAULT_PATIENT_TTL_HOURS),
            backlog_window: Duration::minutes(DEFAULT_BACKLOG_WINDOW_MINUTES),
        }
    }
}

impl SimulationSettings {
    /// Builds settings from `EDQ_*` variables supplied by `lookup`.
    ///
    /// Missing or blank values fall back to the defaults. `lookup` is usually
    /// `|key| std::env::var(key).ok()`; tests pass a map.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidInput`] if a present value does not parse.
    pub fn from_env_values<F>(lookup: F) -> QueueResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            population_floor: parse_env_value(
                "EDQ_POPULATION_FLOOR",
                lookup("EDQ_POPULATION_FLOOR"),
                defaults.population_floor,
            )?,
            bootstrap_population: parse_env_value(
                "EDQ_BOOTSTRAP_POPULATION",
                lookup("EDQ_BOOTSTRAP_POPULATION"),
                defaults.bootstrap_population,
            )?,
            update_interval: Duration::minutes(parse_env_value(
                "EDQ_UPDATE_INTERVAL_MINUTES",
                lookup("EDQ_UPDATE_INTERVAL_MINUTES"),
                DEFAULT_UPDATE_INTERVAL_MINUTES,
            )?),
            max_passes_per_request: parse_env_value(
                "EDQ_MAX_PASSES_PER_REQUEST",
                lookup("EDQ_MAX_PASSES_PER_REQUEST"),
                defaults.max_passes_per_request,
            )?,
            growth_probability: parse_env_value(
                "EDQ_GROWTH_PROBABILITY",
                lookup("EDQ_GROWTH_PROBABILITY"),
                defaults.growth_probability,
            )?,
            admission_probability: parse_env_value(
                "EDQ_ADMISSION_PROBABILITY",
                lookup("EDQ_ADMISSION_PROBABILITY"),
                defaults.admission_probability,
            )?,
            patient_ttl: Duration::hours(parse_env_value(
                "EDQ_PATIENT_TTL_HOURS",
                lookup("EDQ_PATIENT_TTL_HOURS"),
                DEFAULT_PATIENT_TTL_HOURS,
            )?),
            backlog_window: defaults.backlog_window,
        })
    }

    fn validate(&self) -> QueueResult<()> {
        for (name, p) in [
            ("growth_probability", self.growth_probability),
            ("admission_probability", self.admission_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(QueueError::InvalidInput(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.update_interval < Duration::minutes(1) {
            return Err(QueueError::InvalidInput(
                "update_interval must be at least one minute".into(),
            ));
        }
        if self.max_passes_per_request == 0 {
            return Err(QueueError::InvalidInput(
                "max_passes_per_request must be at least 1".into(),
            ));
        }
        if self.patient_ttl <= Duration::zero() {
            return Err(QueueError::InvalidInput(
                "patient_ttl must be positive".into(),
            ));
        }
        if self.backlog_window < Duration::zero() {
            return Err(QueueError::InvalidInput(
                "backlog_window cannot be negative".into(),
            ));
        }
        if self.bootstrap_population == 0 {
            return Err(QueueError::InvalidInput(
                "bootstrap_population must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    settings: SimulationSettings,
}

impl CoreConfig {
    /// Create a new `CoreConfig`, validating the simulation settings.
    pub fn new(data_dir: PathBuf, settings: SimulationSettings) -> QueueResult<Self> {
        settings.validate()?;
        Ok(Self { data_dir, settings })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }
}

/// Parse an optional environment value, falling back to `default` when absent or blank.
pub fn parse_env_value<T>(name: &str, value: Option<String>, default: T) -> QueueResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|e| QueueError::InvalidInput(format!("{name}={v:?}: {e}"))),
    }
}
