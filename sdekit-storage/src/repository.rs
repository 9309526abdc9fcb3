//! Feature repository: the save pipeline and default query surface for
//! one feature type.
//!
//! Binds a backend, schema, configuration and attachment registry
//! together so callers get the full protocol in the right order: the
//! optimistic-lock check inspects pre-save state, then the edit tracker
//! stamps, then new rows get keys, then the row is persisted. Nothing may
//! reorder these steps.

use crate::attachments::{AttachmentRegistry, AttachmentsApi};
use crate::keygen::assign_keys;
use crate::query::{AttachmentCountAnnotation, FeatureQuery};
use crate::SdeBackend;
use sdekit_core::{
    check_optimistic_lock, end_of_time, EditTracker, Feature, FeatureSchema, LockOutcome,
    ObjectId, SdeConfig, SdeResult, SubmittedVersion,
};

/// Query and persistence operations for one feature type.
pub struct FeatureRepository<'a, B: SdeBackend> {
    backend: &'a B,
    schema: FeatureSchema,
    config: SdeConfig,
    tracker: EditTracker,
    registry: &'a AttachmentRegistry,
}

impl<'a, B: SdeBackend> FeatureRepository<'a, B> {
    pub fn new(
        backend: &'a B,
        schema: FeatureSchema,
        config: SdeConfig,
        registry: &'a AttachmentRegistry,
    ) -> Self {
        let tracker = EditTracker::new(config.clone());
        Self {
            backend,
            schema,
            config,
            tracker,
            registry,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &SdeConfig {
        &self.config
    }

    /// The relation this repository reads and writes.
    pub fn db_table(&self) -> String {
        self.schema.db_table(self.config.use_active_view)
    }

    /// The default query for this type - active rows only, shape
    /// deferred.
    pub fn query(&self) -> FeatureQuery {
        FeatureQuery::active(&self.schema, &self.config)
    }

    /// The default query with the attachment-count annotation resolved
    /// through the registry: a live count when the type has an attachment
    /// model, a constant zero otherwise.
    pub fn annotated_query(&self) -> SdeResult<FeatureQuery> {
        let annotation = match self
            .registry
            .get_or_create(self.backend, &self.schema, &self.config)?
        {
            Some(model) => AttachmentCountAnnotation::FromTable(model.db_table.clone()),
            None => AttachmentCountAnnotation::Zero,
        };
        Ok(self.query().annotate_attachment_count(annotation))
    }

    /// Run a query against the backend.
    pub fn fetch(&self, query: &FeatureQuery) -> SdeResult<Vec<Feature>> {
        self.backend.query_features(query)
    }

    /// Fetch the active row with the given object id, if any.
    pub fn get(&self, object_id: ObjectId) -> SdeResult<Option<Feature>> {
        Ok(self
            .fetch(&self.query().by_object_id(object_id))?
            .into_iter()
            .next())
    }

    /// Validate a form submission against the pre-save database state.
    ///
    /// The persisted row is re-fetched by key; a row that vanished
    /// between read and write fails the check the same way a missing key
    /// does. Must run before [`save`](Self::save).
    pub fn validate_submission(
        &self,
        feature: &Feature,
        submitted: &SubmittedVersion,
    ) -> SdeResult<LockOutcome> {
        let persisted = match feature.pk() {
            Some(pk) => self.get(pk)?,
            None => None,
        };
        // with no persisted row the check runs against an empty record:
        // a submitted key then reports the row as removed
        let blank = Feature::new();
        let target = persisted.as_ref().unwrap_or(&blank);
        let outcome = check_optimistic_lock(target, submitted, self.config.concurrency_lock)?;
        Ok(outcome)
    }

    /// Stamp and persist a feature row.
    ///
    /// New rows get keys from the store's id procedures and, when backed
    /// by the archive table directly, the active archive horizon. The
    /// edit tracker runs unconditionally (unless disabled by
    /// configuration) before the row is written.
    pub fn save(&self, feature: &mut Feature, editor: Option<&str>) -> SdeResult<()> {
        let table = self.db_table();
        self.tracker.stamp(feature, editor, &table)?;

        if feature.is_new() {
            assign_keys(self.backend, &self.schema, &self.config, feature)?;
            if !self.config.use_active_view && feature.archive_end.is_none() {
                feature.archive_end = Some(end_of_time());
            }
            self.backend.feature_insert(&table, feature)
        } else {
            self.backend.feature_update(&table, feature)
        }
    }

    /// The full form-driven update pipeline: concurrency check, then
    /// stamp and persist.
    pub fn save_submission(
        &self,
        feature: &mut Feature,
        editor: Option<&str>,
        submitted: &SubmittedVersion,
    ) -> SdeResult<()> {
        self.validate_submission(feature, submitted)?;
        self.save(feature, editor)
    }

    /// Bind a feature instance to its attachment collection.
    pub fn attachments(&self, feature: &Feature) -> SdeResult<AttachmentsApi<'a, B>> {
        AttachmentsApi::bind(
            self.backend,
            self.registry,
            &self.schema,
            feature,
            &self.config,
        )
    }
}
