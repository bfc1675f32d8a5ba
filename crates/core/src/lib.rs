//! # EDQ Core
//!
//! Simulation and queue logic for the emergency department queue service.
//!
//! This crate owns everything that decides who is in the queue and in what order:
//! - Patient records, triage categories and the care lifecycle
//! - Canonical ranking and dense queue-position assignment
//! - Mock arrivals and backlog generation
//! - Time-gated update passes over an expiring patient store
//! - File (sharded JSON under `EDQ_DATA_DIR`) and in-memory stores
//!
//! **No API concerns**: HTTP routing, OpenAPI docs and command-line parsing belong in
//! `api-rest` and `edq-cli`.

pub mod config;
pub mod constants;
pub mod engine;
mod error;
pub mod generator;
pub mod lifecycle;
pub mod patient;
pub mod ranking;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::{CoreConfig, SimulationSettings};
pub use error::{QueueError, QueueResult};
pub use generator::{MockPatientGenerator, PatientGenerator};
pub use patient::{
    InvestigationState, Investigations, Patient, PatientStatus, Phase, QueuePosition, TestKind,
    TriageCategory,
};
pub use service::{QueueService, QueueSnapshot, QueueStats, SortKey};
pub use store::{FileStore, MemoryStore, PatientStore};

pub use edq_uuid::PatientId;
