//! Per-instance attachment access.
//!
//! An [`AttachmentsApi`] binds one feature instance to its (possibly
//! absent) attachment collection. All operations degrade to
//! empty/zero/false when the feature type has no attachment model or the
//! instance has no global id yet - absence is a state, not an error.

use crate::attachments::registry::{AttachmentModel, AttachmentRegistry};
use crate::SdeBackend;
use once_cell::unsync::OnceCell;
use sdekit_core::{
    attachment_db_table, Attachment, Feature, FeatureSchema, GlobalId, ObjectId, SdeConfig,
    SdeResult, StorageError, ValidationError, MAX_CAPTION_LEN,
};
use std::sync::Arc;

/// Cached access to one feature instance's attachments.
pub struct AttachmentsApi<'a, B: SdeBackend> {
    backend: &'a B,
    model: Option<Arc<AttachmentModel>>,
    related_global_id: Option<GlobalId>,
    /// Precomputed count carried by the query annotation, when present.
    annotated_count: Option<i64>,
    /// The relation name, kept for error reporting when the model is
    /// absent.
    attach_table: String,
    images: OnceCell<Vec<Attachment>>,
}

impl<'a, B: SdeBackend> AttachmentsApi<'a, B> {
    /// Bind a feature instance to its attachment collection, creating and
    /// registering the attachment model on first access for the type.
    pub fn bind(
        backend: &'a B,
        registry: &AttachmentRegistry,
        schema: &FeatureSchema,
        feature: &Feature,
        config: &SdeConfig,
    ) -> SdeResult<Self> {
        let model = registry.get_or_create(backend, schema, config)?;
        Ok(Self {
            backend,
            model,
            related_global_id: feature.global_id.clone(),
            annotated_count: feature.attachment_count,
            attach_table: attachment_db_table(&schema.base_table, config.use_active_view),
            images: OnceCell::new(),
        })
    }

    /// True iff an attachment model is registered for this feature type.
    pub fn has_attachments(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Arc<AttachmentModel>> {
        self.model.as_ref()
    }

    /// Number of attachments related to this instance. Prefers the
    /// precomputed query annotation over a live count.
    pub fn count(&self) -> SdeResult<i64> {
        if let Some(count) = self.annotated_count {
            return Ok(count);
        }
        match (&self.model, &self.related_global_id) {
            (Some(model), Some(related)) => model.count_for(self.backend, related),
            _ => Ok(0),
        }
    }

    /// True iff at least one related attachment exists. Same annotation
    /// shortcut as [`count`](Self::count).
    pub fn exists(&self) -> SdeResult<bool> {
        Ok(self.count()? > 0)
    }

    /// All attachments related to this instance.
    pub fn all(&self) -> SdeResult<Vec<Attachment>> {
        match (&self.model, &self.related_global_id) {
            (Some(model), Some(related)) => model.attachments_for(self.backend, related),
            _ => Ok(Vec::new()),
        }
    }

    /// Image attachments for this instance, computed once and reused for
    /// the life of the API instance.
    pub fn images(&self) -> SdeResult<&[Attachment]> {
        let images = self.images.get_or_try_init(|| -> SdeResult<Vec<Attachment>> {
            match (&self.model, &self.related_global_id) {
                (Some(model), Some(related)) => model.images_for(self.backend, related),
                _ => Ok(Vec::new()),
            }
        })?;
        Ok(images.as_slice())
    }

    /// Validate and persist a new caption for one attachment row.
    ///
    /// The caption is trimmed, must be non-empty and at most
    /// [`MAX_CAPTION_LEN`] characters. Only the caption column is
    /// written.
    pub fn save_caption(
        &self,
        attachment_id: ObjectId,
        caption: &str,
    ) -> SdeResult<Attachment> {
        let caption = caption.trim();
        if caption.is_empty() {
            return Err(ValidationError::InvalidCaption {
                reason: "caption must not be empty".to_string(),
            }
            .into());
        }
        if caption.chars().count() > MAX_CAPTION_LEN {
            return Err(ValidationError::InvalidCaption {
                reason: format!("caption exceeds {} characters", MAX_CAPTION_LEN),
            }
            .into());
        }

        let model = self.model.as_ref().ok_or_else(|| {
            StorageError::NotFound {
                table: self.attach_table.clone(),
                id: attachment_id,
            }
        })?;
        model.save_caption(self.backend, attachment_id, caption)
    }
}
