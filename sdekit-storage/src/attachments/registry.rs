//! The attachment model registry.
//!
//! Process-wide mapping from feature type to its attachment model
//! descriptor, or to the recorded absence of one. Populated lazily on
//! first access and never invalidated - the backing schema is static for
//! the life of the process. The catalog probe behind the first lookup is
//! memoized per table name for the same reason.

use crate::query::FeatureQuery;
use crate::SdeBackend;
use once_cell::sync::Lazy;
use sdekit_core::{
    attachment_db_table, Attachment, Feature, FeatureSchema, GlobalId, ObjectId, SdeConfig,
    SdeResult, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Descriptor of a synthesized attachment model: the schema of the
/// `__attach` relation bound to one feature type, plus its query
/// operations. Plain data, not a language-level type - one instance is
/// synthesized per feature type and shared through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentModel {
    /// Synthesized model name, e.g. `RoadSegmentAttachments`.
    pub model_name: String,
    /// The attachment relation this model reads from.
    pub db_table: String,
    /// Schema of the related feature type.
    pub related: FeatureSchema,
}

impl AttachmentModel {
    /// All attachments related to a feature, by global id.
    pub fn attachments_for<B: SdeBackend>(
        &self,
        backend: &B,
        related: &GlobalId,
    ) -> SdeResult<Vec<Attachment>> {
        backend.attachments_for(&self.db_table, related)
    }

    /// Count of attachments related to a feature.
    pub fn count_for<B: SdeBackend>(&self, backend: &B, related: &GlobalId) -> SdeResult<i64> {
        backend.attachment_count(&self.db_table, related)
    }

    /// Image attachments related to a feature.
    pub fn images_for<B: SdeBackend>(
        &self,
        backend: &B,
        related: &GlobalId,
    ) -> SdeResult<Vec<Attachment>> {
        Ok(self
            .attachments_for(backend, related)?
            .into_iter()
            .filter(Attachment::is_image)
            .collect())
    }

    /// Resolve the feature a row is attached to.
    ///
    /// The relation is software-maintained and a denormalized view can
    /// expose more than one row per global id, so this is a filtered
    /// lookup returning the first match rather than a unique fetch. The
    /// default schema contract is still exactly one feature per
    /// attachment.
    pub fn related_feature<B: SdeBackend>(
        &self,
        backend: &B,
        attachment: &Attachment,
        config: &SdeConfig,
    ) -> SdeResult<Option<Feature>> {
        let query = FeatureQuery::active(&self.related, config)
            .by_global_id(attachment.related_global_id.clone());
        Ok(backend.query_features(&query)?.into_iter().next())
    }

    /// Persist a new caption for an attachment row. Only the caption
    /// column is written, so a concurrent binary-payload write cannot be
    /// clobbered.
    pub fn save_caption<B: SdeBackend>(
        &self,
        backend: &B,
        attachment_id: ObjectId,
        caption: &str,
    ) -> SdeResult<Attachment> {
        backend.update_attachment_caption(&self.db_table, attachment_id, caption)
    }
}

/// Registry entry state: the model, or recorded absence.
type Entry = Option<Arc<AttachmentModel>>;

/// Lazily populated registry of attachment models, keyed by feature type
/// name.
///
/// Readers take the read lock only; the creation path re-checks under the
/// write lock so concurrent first access converges on a single registered
/// model.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    catalog_cache: Mutex<HashMap<String, bool>>,
}

static GLOBAL: Lazy<AttachmentRegistry> = Lazy::new(AttachmentRegistry::new);

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-process registry instance. Convenience only - components
    /// accept any registry reference.
    pub fn global() -> &'static AttachmentRegistry {
        &GLOBAL
    }

    /// Look up the attachment model for a feature type, synthesizing and
    /// registering it on first access.
    ///
    /// Returns `None` for types with no `__attach` relation; the absence
    /// is registered too, so repeated calls never re-probe the catalog.
    pub fn get_or_create<B: SdeBackend>(
        &self,
        backend: &B,
        schema: &FeatureSchema,
        config: &SdeConfig,
    ) -> SdeResult<Entry> {
        if let Some(entry) = self.get(&schema.type_name)? {
            return Ok(entry);
        }

        let db_table = attachment_db_table(&schema.base_table, config.use_active_view);
        let exists = self.table_exists(backend, &db_table)?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        // another caller may have won the race between our read and write
        if let Some(entry) = entries.get(&schema.type_name) {
            return Ok(entry.clone());
        }

        let entry: Entry = if exists {
            let model = Arc::new(AttachmentModel {
                model_name: format!("{}Attachments", schema.type_name),
                db_table,
                related: schema.clone(),
            });
            tracing::debug!(
                model = %model.model_name,
                table = %model.db_table,
                "registered attachment model"
            );
            Some(model)
        } else {
            tracing::debug!(
                feature_type = %schema.type_name,
                table = %db_table,
                "no attachment relation; registering absence"
            );
            None
        };

        entries.insert(schema.type_name.clone(), entry.clone());
        Ok(entry)
    }

    /// Peek at the registry without triggering creation. The outer
    /// `Option` distinguishes "never looked up" from a registered
    /// absence.
    pub fn get(&self, type_name: &str) -> SdeResult<Option<Entry>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(type_name).cloned())
    }

    /// Names of all feature types with a registered attachment model.
    pub fn registered_types(&self) -> SdeResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut types: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        types.sort();
        Ok(types)
    }

    /// Memoized catalog-existence probe. The schema is static for the
    /// process, so a table is probed at most once.
    fn table_exists<B: SdeBackend>(&self, backend: &B, table: &str) -> SdeResult<bool> {
        let mut cache = self
            .catalog_cache
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        if let Some(&known) = cache.get(table) {
            return Ok(known);
        }
        let exists = backend.table_names()?.iter().any(|name| name == table);
        cache.insert(table.to_string(), exists);
        Ok(exists)
    }
}
