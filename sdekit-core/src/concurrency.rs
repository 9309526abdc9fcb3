//! Client-submitted optimistic-lock check.
//!
//! Form-driven edits carry the version token the client last observed
//! (the row's `last_edited_at`, usually a hidden field) and optionally the
//! primary key it knew. Validation compares both against the persisted
//! row before any stamping happens. This is a single check per
//! submission, not a retry loop: two near-simultaneous submissions with
//! the same stale token can both win against a later read - soft
//! concurrency is the deliberate trade for a small user population.

use crate::error::ConcurrencyConflict;
use crate::feature::Feature;
use crate::identity::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// The client's snapshot of a row's identity and version, as submitted
/// with an edit form. Absent fields mean the client did not carry them,
/// and that part of the check is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedVersion {
    /// `last_edited_at` as last observed by the client.
    pub last_edited_at: Option<Timestamp>,
    /// Primary key as known to the client.
    pub object_id: Option<ObjectId>,
}

impl SubmittedVersion {
    pub fn new(last_edited_at: Option<Timestamp>, object_id: Option<ObjectId>) -> Self {
        Self {
            last_edited_at,
            object_id,
        }
    }
}

/// Result of a passing optimistic-lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// Both the version token and the key matched (or were not submitted).
    Acquired,
    /// Concurrency checking is disabled; nothing was compared.
    Skipped,
}

/// Validate a form submission against the persisted row state.
///
/// The lock is acquired iff the submitted version token matches the row's
/// current `last_edited_at` and the submitted key identifies the same row;
/// either comparison is vacuously true when the client submitted nothing
/// for it. On failure the conflict distinguishes a row that disappeared
/// between read and write ([`ConcurrencyConflict::Removed`]) from one
/// another session updated ([`ConcurrencyConflict::Modified`]).
pub fn check_optimistic_lock(
    feature: &Feature,
    submitted: &SubmittedVersion,
    lock_enabled: bool,
) -> Result<LockOutcome, ConcurrencyConflict> {
    if !lock_enabled {
        return Ok(LockOutcome::Skipped);
    }

    let version_matches = match submitted.last_edited_at {
        None => true,
        Some(token) => feature.revision.last_edited_at == Some(token),
    };

    let pk_matches = match submitted.object_id {
        None => true,
        Some(pk) => feature.pk() == Some(pk),
    };

    if version_matches && pk_matches {
        return Ok(LockOutcome::Acquired);
    }

    if submitted.object_id.is_some() && feature.pk().is_none() {
        Err(ConcurrencyConflict::Removed)
    } else {
        Err(ConcurrencyConflict::Modified)
    }
}
