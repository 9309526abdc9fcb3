//! Error types for SDE operations

use crate::identity::ObjectId;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store procedure '{procedure}' failed: {reason}")]
    ProcedureFailed { procedure: String, reason: String },

    #[error("No owner found for table '{table}'")]
    TableOwnerNotFound { table: String },

    #[error("Catalog introspection failed: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Row not found in '{table}' with id {id}")]
    NotFound { table: String, id: ObjectId },

    #[error("Insert into '{table}' failed: {reason}")]
    InsertFailed { table: String, reason: String },

    #[error("Update of '{table}' row {id} failed: {reason}")]
    UpdateFailed {
        table: String,
        id: ObjectId,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Optimistic-lock conflicts surfaced during form validation.
///
/// Never retried automatically - the user must reload and resubmit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConcurrencyConflict {
    #[error("This record was modified by another session while you were editing. Reload the record and re-apply your changes.")]
    Modified,

    #[error("This record has been removed or archived since you loaded it. Reload to see the current data.")]
    Removed,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No acting username available for edit tracking on '{table}'")]
    MissingEditor { table: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Validation errors for caller-supplied data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid caption: {reason}")]
    InvalidCaption { reason: String },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid global id: {reason}")]
    InvalidGlobalId { reason: String },
}

/// Master error type for all SDE operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Concurrency conflict: {0}")]
    Concurrency(#[from] ConcurrencyConflict),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for SDE operations.
pub type SdeResult<T> = Result<T, SdeError>;

// =============================================================================
// TESTS
// =============================================================================
