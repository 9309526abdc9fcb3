//! Attachment rows for SDE features.
//!
//! An `__attach` table is a standard SDE base table whose rows relate a
//! binary payload (usually a photo) to exactly one feature through
//! `related_global_id`. The relation lives only in software - SDE does not
//! enforce it in the database.

use crate::identity::{GlobalId, ObjectId, RawContent};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Maximum caption length accepted by the caption-edit operation.
pub const MAX_CAPTION_LEN: usize = 250;

/// One attachment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Auto-incrementing primary key of the `__attach` table.
    pub attachment_id: Option<ObjectId>,
    /// Attach tables are SDE base tables and carry their own global id.
    pub global_id: Option<GlobalId>,
    /// Global id of the owning feature (software-maintained relation).
    pub related_global_id: GlobalId,
    /// MIME content type of the payload.
    pub content_type: String,
    /// User-editable caption.
    pub caption: String,
    /// Payload size in bytes as recorded by the store.
    pub data_size: i64,
    /// The binary payload itself; deferred/absent in list queries.
    pub data: Option<RawContent>,
}

impl Attachment {
    /// True iff the content type indicates an image.
    pub fn is_image(&self) -> bool {
        self.content_type.contains("image")
    }

    /// Base64-encode the payload for transmission, empty when absent.
    pub fn base64_payload(&self) -> String {
        self.data
            .as_deref()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
            .unwrap_or_default()
    }

    /// Data URI suitable for the `src` attribute of an img tag.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.base64_payload())
    }
}
