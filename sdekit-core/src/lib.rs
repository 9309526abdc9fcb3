//! SDEKIT Core - Feature Data Types and Edit Protocol
//!
//! Pure data structures and protocol logic for Arc SDE feature schemas:
//! identity types, table/view resolution, the revision stamping engine,
//! and the optimistic-lock version check. No I/O lives here - the storage
//! seam is in sdekit-storage.

pub mod attachment;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod identity;
pub mod relation;
pub mod revision;

pub use attachment::{Attachment, MAX_CAPTION_LEN};
pub use concurrency::{check_optimistic_lock, LockOutcome, SubmittedVersion};
pub use config::SdeConfig;
pub use error::{
    ConcurrencyConflict, ConfigError, SdeError, SdeResult, StorageError, ValidationError,
};
pub use feature::{Feature, FeatureSchema};
pub use geometry::{GeometryKind, Shape};
pub use identity::{end_of_time, GlobalId, GlobalIdParseError, ObjectId, RawContent, Timestamp};
pub use relation::{attachment_db_table, base_db_table, feature_db_table, VIEW_SUFFIX};
pub use revision::{EditTracker, Revision, VersionInfo};
