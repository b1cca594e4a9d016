//! Error types for ludus-magnus operations.
//!
//! This module defines the canonical error type used throughout the trainer.
//! All subsystems return `Result<T, LudusError>` and propagate with `?`.
//! The taxonomy is flat: every failure a command can surface maps to exactly
//! one variant, and the command boundary renders it as a single line (text)
//! or `{"error": "..."}` (JSON).

use std::io;
use thiserror::Error;

/// Canonical error type for all ludus-magnus operations.
#[derive(Error, Debug)]
pub enum LudusError {
    /// Missing or invalid input (score out of range, empty need, bad type,
    /// duplicate or malformed ids).
    #[error("{0}")]
    Validation(String),

    /// Session, lineage, agent, artifact, or directive not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A supposedly unique id matched in more than one place.
    #[error("{0}")]
    NotUnique(String),

    /// Second evaluation of an already-evaluated artifact.
    #[error("artifact already evaluated")]
    AlreadyEvaluated,

    /// Operation requires a different session mode (e.g. promote on a
    /// non-quickstart session).
    #[error("{0}")]
    WrongMode(String),

    /// State file exists but cannot be decoded.
    #[error("state file corrupt: {0}")]
    StoreCorrupt(String),

    /// State file carries a schema version this binary cannot migrate.
    #[error("unsupported state version {0:?}")]
    UnsupportedVersion(String),

    /// Provider call failed or returned empty/undecodable output.
    #[error("provider: {0}")]
    Provider(String),

    /// A mutation operator produced an empty prompt.
    #[error("mutation produced empty prompt")]
    MutationEmpty,

    /// The challenge generator could not decode the provider response.
    #[error("parse challenge response: {0}")]
    ChallengeDecode(String),

    /// Pre-flight budget admission rejected the operation.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// An external binary failed, or an execution hit its deadline.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Cancellation was observed.
    #[error("cancelled")]
    Cancelled,

    /// I/O error (auto-converts from `std::io::Error`)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encode error (auto-converts from `serde_json::Error`)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
