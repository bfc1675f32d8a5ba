//! Patient identifiers and sharded-path utilities.
//!
//! The queue stores one record per patient under a sharded directory derived from the
//! patient's identifier. To keep path derivation deterministic, identifiers use a *canonical*
//! representation: **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`PatientId`], a wrapper that *guarantees* the canonical format once constructed.
//! - Shared sharding logic to derive a patient's record directory from its identifier.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (HTTP path segments, CLI arguments) must already be
//! canonical. Use [`PatientId::parse`] to validate them; hyphenated or uppercase forms are
//! rejected.
//!
//! ## Sharded directory layout
//! For a canonical identifier `u`, records live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`

mod patient_id;

pub use patient_id::PatientId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
