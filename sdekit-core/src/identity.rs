//! Identity types for SDE feature rows

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Table-local row identifier. SDE row ids are 32-bit sequence values
/// minted by the store's `next_rowid` procedure.
pub type ObjectId = i32;

/// Timestamp type using UTC timezone. SDE stores all datetime data in UTC;
/// localization is the caller's concern.
pub type Timestamp = DateTime<Utc>;

/// Raw binary content for attachment payloads.
pub type RawContent = Vec<u8>;

/// Length of a stored global id: a GUID in braced registry format.
pub const GLOBAL_ID_LEN: usize = 38;

/// The "end of time" sentinel marking the active version of an archived
/// row. Rows superseded by a newer version carry an earlier `archive_end`.
pub fn end_of_time() -> Timestamp {
    // single_unwrap: 9999-12-31 23:59:59 is always a valid UTC instant
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).single().unwrap_or_else(Utc::now)
}

/// Store-wide unique feature identifier.
///
/// SDE global ids are GUIDs rendered in uppercase braced registry format,
/// e.g. `{B3A16F2C-6CE1-4C2F-9F0D-6E2D3A6B1C44}` - exactly 38 characters.
/// They identify a feature across its archive versions and carry the
/// software-maintained relations to attachment rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(String);

impl GlobalId {
    /// Wrap a braced GUID string, validating shape and length.
    pub fn parse(s: impl Into<String>) -> Result<Self, GlobalIdParseError> {
        let s = s.into();
        if s.len() != GLOBAL_ID_LEN {
            return Err(GlobalIdParseError::BadLength(s.len()));
        }
        if !s.starts_with('{') || !s.ends_with('}') {
            return Err(GlobalIdParseError::NotBraced(s));
        }
        // the inner 36 chars must parse as a GUID
        let inner = &s[1..GLOBAL_ID_LEN - 1];
        if Uuid::parse_str(inner).is_err() {
            return Err(GlobalIdParseError::NotAGuid(s));
        }
        Ok(GlobalId(s.to_uppercase()))
    }

    /// Render a Uuid in the stored braced uppercase format.
    pub fn from_uuid(uuid: Uuid) -> Self {
        GlobalId(format!("{{{}}}", uuid.hyphenated()).to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GlobalId {
    type Err = GlobalIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error when parsing an invalid global id string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalIdParseError {
    /// Stored ids are exactly 38 characters.
    BadLength(usize),
    /// Stored ids are brace-delimited.
    NotBraced(String),
    /// The braced content must be a GUID.
    NotAGuid(String),
}

impl fmt::Display for GlobalIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalIdParseError::BadLength(len) => {
                write!(f, "global id must be {} chars, got {}", GLOBAL_ID_LEN, len)
            }
            GlobalIdParseError::NotBraced(s) => write!(f, "global id not brace-delimited: {}", s),
            GlobalIdParseError::NotAGuid(s) => write!(f, "global id is not a GUID: {}", s),
        }
    }
}

impl std::error::Error for GlobalIdParseError {}
