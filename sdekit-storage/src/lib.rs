//! SDEKIT Storage - Backend Trait and Mock Implementation
//!
//! The storage seam for SDE feature access: the [`SdeBackend`] trait wraps
//! the store procedures and catalog introspection every SDE schema
//! provides, and [`MockSdeBackend`] implements it over in-memory maps for
//! tests and offline development. The query layer, key generator, save
//! pipeline and attachment binding subsystem all speak to the store only
//! through the trait.

pub mod attachments;
pub mod keygen;
pub mod query;
pub mod repository;

pub use attachments::{AttachmentModel, AttachmentRegistry, AttachmentsApi};
pub use keygen::assign_keys;
pub use query::{AttachmentCountAnnotation, FeatureQuery, FieldFilter, FilterOp};
pub use repository::FeatureRepository;

use sdekit_core::{
    Attachment, Feature, GlobalId, ObjectId, SdeError, SdeResult, StorageError,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use uuid::Uuid;

// ============================================================================
// BACKEND TRAIT
// ============================================================================

/// Callable surface of the underlying SDE store.
///
/// The id-issuing procedures mirror the store's `next_globalid` /
/// `next_rowid` functions; catalog introspection backs the attachment
/// binding probe and the table-owner lookup `next_rowid` requires.
pub trait SdeBackend: Send + Sync {
    // === Store procedures ===

    /// Mint a new store-wide unique global id.
    fn next_global_id(&self) -> SdeResult<GlobalId>;

    /// Mint the next row id for a table. The store requires the owning
    /// principal alongside the table name.
    fn next_row_id(&self, owner: &str, table: &str) -> SdeResult<ObjectId>;

    // === Catalog introspection ===

    /// Owning principal of a table.
    fn table_owner(&self, table: &str) -> SdeResult<String>;

    /// Names of all existing tables and views.
    fn table_names(&self) -> SdeResult<Vec<String>>;

    // === Feature rows ===

    /// Evaluate a feature query.
    fn query_features(&self, query: &FeatureQuery) -> SdeResult<Vec<Feature>>;

    /// Insert a new feature row. Keys must already be assigned.
    fn feature_insert(&self, table: &str, feature: &Feature) -> SdeResult<()>;

    /// Update an existing feature row, matched by its object id.
    fn feature_update(&self, table: &str, feature: &Feature) -> SdeResult<()>;

    // === Attachment rows ===

    /// All attachments related to a feature.
    fn attachments_for(&self, table: &str, related: &GlobalId) -> SdeResult<Vec<Attachment>>;

    /// Count of attachments related to a feature.
    fn attachment_count(&self, table: &str, related: &GlobalId) -> SdeResult<i64>;

    /// Update only the caption of an attachment row, leaving every other
    /// field untouched. Returns the updated row.
    fn update_attachment_caption(
        &self,
        table: &str,
        attachment_id: ObjectId,
        caption: &str,
    ) -> SdeResult<Attachment>;
}

// ============================================================================
// MOCK BACKEND
// ============================================================================

/// In-memory mock store for testing.
///
/// Catalog probes are counted so tests can assert the registry's
/// memoization; the id procedures can be switched off to exercise the
/// fatal key-generation path.
#[derive(Debug)]
pub struct MockSdeBackend {
    catalog: RwLock<BTreeSet<String>>,
    owners: RwLock<HashMap<String, String>>,
    row_counters: Mutex<HashMap<String, ObjectId>>,
    features: RwLock<HashMap<String, Vec<Feature>>>,
    attachments: RwLock<HashMap<String, Vec<Attachment>>>,
    catalog_probes: AtomicUsize,
    procedures_available: AtomicBool,
}

impl Default for MockSdeBackend {
    fn default() -> Self {
        Self {
            catalog: RwLock::default(),
            owners: RwLock::default(),
            row_counters: Mutex::default(),
            features: RwLock::default(),
            attachments: RwLock::default(),
            catalog_probes: AtomicUsize::new(0),
            procedures_available: AtomicBool::new(true),
        }
    }
}

impl MockSdeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table or view in the catalog, with its owner.
    pub fn register_table(&self, name: impl Into<String>, owner: impl Into<String>) {
        let name = name.into();
        if let Ok(mut catalog) = self.catalog.write() {
            catalog.insert(name.clone());
        }
        if let Ok(mut owners) = self.owners.write() {
            owners.insert(name, owner.into());
        }
    }

    /// Seed a feature row.
    pub fn add_feature(&self, table: &str, feature: Feature) {
        if let Ok(mut features) = self.features.write() {
            features.entry(table.to_string()).or_default().push(feature);
        }
    }

    /// Seed an attachment row.
    pub fn add_attachment(&self, table: &str, attachment: Attachment) {
        if let Ok(mut attachments) = self.attachments.write() {
            attachments
                .entry(table.to_string())
                .or_default()
                .push(attachment);
        }
    }

    /// Number of catalog introspection calls served so far.
    pub fn catalog_probe_count(&self) -> usize {
        self.catalog_probes.load(Ordering::SeqCst)
    }

    /// Simulate the store's id procedures being unavailable.
    pub fn set_procedures_available(&self, available: bool) {
        self.procedures_available.store(available, Ordering::SeqCst);
    }

    /// Rows currently stored for a table.
    pub fn feature_rows(&self, table: &str) -> Vec<Feature> {
        self.features
            .read()
            .map(|f| f.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn procedures_up(&self, procedure: &str) -> SdeResult<()> {
        if self.procedures_available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::ProcedureFailed {
                procedure: procedure.to_string(),
                reason: "no row returned".to_string(),
            }
            .into())
        }
    }
}

fn poisoned() -> SdeError {
    StorageError::LockPoisoned.into()
}

impl SdeBackend for MockSdeBackend {
    fn next_global_id(&self) -> SdeResult<GlobalId> {
        self.procedures_up("next_globalid")?;
        Ok(GlobalId::from_uuid(Uuid::new_v4()))
    }

    fn next_row_id(&self, owner: &str, table: &str) -> SdeResult<ObjectId> {
        self.procedures_up("next_rowid")?;
        let owners = self.owners.read().map_err(|_| poisoned())?;
        match owners.get(table) {
            Some(registered) if registered == owner => {}
            _ => {
                return Err(StorageError::ProcedureFailed {
                    procedure: "next_rowid".to_string(),
                    reason: format!("owner '{}' does not own table '{}'", owner, table),
                }
                .into());
            }
        }
        drop(owners);

        let mut counters = self.row_counters.lock().map_err(|_| poisoned())?;
        let next = counters.entry(table.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn table_owner(&self, table: &str) -> SdeResult<String> {
        let owners = self.owners.read().map_err(|_| poisoned())?;
        owners
            .get(table)
            .cloned()
            .ok_or_else(|| {
                StorageError::TableOwnerNotFound {
                    table: table.to_string(),
                }
                .into()
            })
    }

    fn table_names(&self) -> SdeResult<Vec<String>> {
        self.catalog_probes.fetch_add(1, Ordering::SeqCst);
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        Ok(catalog.iter().cloned().collect())
    }

    fn query_features(&self, query: &FeatureQuery) -> SdeResult<Vec<Feature>> {
        let features = self.features.read().map_err(|_| poisoned())?;
        let rows = features.get(query.table()).cloned().unwrap_or_default();
        drop(features);

        let mut rows = query.evaluate(rows);

        for row in &mut rows {
            if let Some(username) = query.edited_by() {
                row.edited_by = Some(username.to_string());
            }
            match query.attachment_annotation() {
                AttachmentCountAnnotation::Skip => {}
                AttachmentCountAnnotation::Zero => row.attachment_count = Some(0),
                AttachmentCountAnnotation::FromTable(attach_table) => {
                    if let Some(related) = row.global_id.clone() {
                        row.attachment_count =
                            Some(self.attachment_count(attach_table, &related)?);
                    } else {
                        row.attachment_count = Some(0);
                    }
                }
            }
        }

        Ok(rows)
    }

    fn feature_insert(&self, table: &str, feature: &Feature) -> SdeResult<()> {
        let mut features = self.features.write().map_err(|_| poisoned())?;
        let rows = features.entry(table.to_string()).or_default();
        if feature
            .pk()
            .is_some_and(|pk| rows.iter().any(|r| r.pk() == Some(pk)))
        {
            return Err(StorageError::InsertFailed {
                table: table.to_string(),
                reason: "duplicate object id".to_string(),
            }
            .into());
        }
        rows.push(feature.clone());
        Ok(())
    }

    fn feature_update(&self, table: &str, feature: &Feature) -> SdeResult<()> {
        let id = feature.pk().ok_or_else(|| {
            SdeError::from(StorageError::UpdateFailed {
                table: table.to_string(),
                id: 0,
                reason: "row has no object id".to_string(),
            })
        })?;

        let mut features = self.features.write().map_err(|_| poisoned())?;
        let rows = features.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|r| r.pk() == Some(id)) {
            Some(row) => {
                *row = feature.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                table: table.to_string(),
                id,
            }
            .into()),
        }
    }

    fn attachments_for(&self, table: &str, related: &GlobalId) -> SdeResult<Vec<Attachment>> {
        let attachments = self.attachments.read().map_err(|_| poisoned())?;
        Ok(attachments
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|a| &a.related_global_id == related)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn attachment_count(&self, table: &str, related: &GlobalId) -> SdeResult<i64> {
        let attachments = self.attachments.read().map_err(|_| poisoned())?;
        Ok(attachments
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|a| &a.related_global_id == related)
                    .count() as i64
            })
            .unwrap_or(0))
    }

    fn update_attachment_caption(
        &self,
        table: &str,
        attachment_id: ObjectId,
        caption: &str,
    ) -> SdeResult<Attachment> {
        let mut attachments = self.attachments.write().map_err(|_| poisoned())?;
        let rows = attachments.entry(table.to_string()).or_default();
        match rows
            .iter_mut()
            .find(|a| a.attachment_id == Some(attachment_id))
        {
            Some(row) => {
                row.caption = caption.to_string();
                Ok(row.clone())
            }
            None => Err(StorageError::NotFound {
                table: table.to_string(),
                id: attachment_id,
            }
            .into()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
