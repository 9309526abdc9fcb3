//! Feature queries with the active-record policy built in.
//!
//! [`FeatureQuery::active`] is the only way to build a query, so every
//! query path starts constrained to non-archived rows and with the
//! proprietary shape payload deferred. The query is a plain description;
//! [`FeatureQuery::evaluate`] gives backends a reference evaluation over
//! in-memory rows.

use chrono::Duration;
use sdekit_core::{
    end_of_time, Feature, FeatureSchema, GlobalId, ObjectId, SdeConfig, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Filter operator for attribute comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Contains substring (for strings)
    Contains,
}

/// A predicate over one attribute of the feature's domain payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    fn matches(&self, feature: &Feature) -> bool {
        let Some(actual) = feature.attribute(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Contains => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            FilterOp::Gt | FilterOp::Lt | FilterOp::Gte | FilterOp::Lte => {
                compare(actual, &self.value).is_some_and(|ord| match self.op {
                    FilterOp::Gt => ord.is_gt(),
                    FilterOp::Lt => ord.is_lt(),
                    FilterOp::Gte => ord.is_ge(),
                    FilterOp::Lte => ord.is_le(),
                    _ => unreachable!(),
                })
            }
        }
    }
}

fn compare(a: &serde_json::Value, b: &serde_json::Value) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

/// How a query annotates the related-attachment count on returned rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttachmentCountAnnotation {
    /// No annotation requested.
    #[default]
    Skip,
    /// The feature type has no attachment model; annotate a constant zero.
    Zero,
    /// Count rows in the named attachment relation.
    FromTable(String),
}

/// A query over one feature type.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    schema: FeatureSchema,
    table: String,
    archive_filtered: bool,
    include_shape: bool,
    edited_by: Option<String>,
    attachment_annotation: AttachmentCountAnnotation,
    created_since: Option<Timestamp>,
    filters: Vec<FieldFilter>,
    global_id: Option<GlobalId>,
    object_id: Option<ObjectId>,
}

impl FeatureQuery {
    /// Build the default query for a feature type: constrained to active
    /// rows when archive-table-backed (the `_evw` view pre-filters), with
    /// the shape payload deferred whenever the schema declares geometry.
    pub fn active(schema: &FeatureSchema, config: &SdeConfig) -> Self {
        Self {
            schema: schema.clone(),
            table: schema.db_table(config.use_active_view),
            archive_filtered: !config.use_active_view,
            include_shape: false,
            edited_by: None,
            attachment_annotation: AttachmentCountAnnotation::Skip,
            created_since: None,
            filters: Vec::new(),
            global_id: None,
            object_id: None,
        }
    }

    // === Builders ===

    /// Annotate rows with the acting username, to be carried through to
    /// the edit tracker on save.
    pub fn set_edited_by(mut self, username: impl Into<String>) -> Self {
        self.edited_by = Some(username.into());
        self
    }

    /// Explicitly request the shape payload. Off by default: the blob is
    /// unusable without a spatial engine and must not be tampered with.
    pub fn with_shape(mut self) -> Self {
        self.include_shape = true;
        self
    }

    /// Request the attachment-count annotation.
    pub fn annotate_attachment_count(mut self, annotation: AttachmentCountAnnotation) -> Self {
        self.attachment_annotation = annotation;
        self
    }

    /// Restrict to features created in the trailing period, newest first.
    pub fn recent(mut self, period_in_hours: i64, now: Timestamp) -> Self {
        self.created_since = Some(now - Duration::hours(period_in_hours));
        self
    }

    /// Add an attribute predicate.
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: serde_json::Value) -> Self {
        self.filters.push(FieldFilter::new(field, op, value));
        self
    }

    /// Restrict to the feature with the given global id.
    pub fn by_global_id(mut self, id: GlobalId) -> Self {
        self.global_id = Some(id);
        self
    }

    /// Restrict to the feature with the given object id.
    pub fn by_object_id(mut self, id: ObjectId) -> Self {
        self.object_id = Some(id);
        self
    }

    // === Accessors ===

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// The relation this query reads from.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn edited_by(&self) -> Option<&str> {
        self.edited_by.as_deref()
    }

    pub fn attachment_annotation(&self) -> &AttachmentCountAnnotation {
        &self.attachment_annotation
    }

    pub fn defers_shape(&self) -> bool {
        self.schema.has_shape() && !self.include_shape
    }

    // === Evaluation ===

    /// Whether a row satisfies every predicate of this query.
    pub fn matches(&self, feature: &Feature) -> bool {
        if self.archive_filtered {
            let active = feature
                .archive_end
                .is_some_and(|horizon| horizon >= end_of_time());
            if !active {
                return false;
            }
        }
        if let Some(id) = &self.global_id {
            if feature.global_id.as_ref() != Some(id) {
                return false;
            }
        }
        if let Some(id) = self.object_id {
            if feature.pk() != Some(id) {
                return false;
            }
        }
        if let Some(since) = self.created_since {
            let recent = feature
                .revision
                .created_at
                .is_some_and(|created| created >= since);
            if !recent {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(feature))
    }

    /// Apply the default projection: drop the deferred shape payload.
    pub fn project(&self, mut feature: Feature) -> Feature {
        if self.defers_shape() {
            feature.shape = None;
        }
        feature
    }

    /// Reference evaluation over in-memory rows: predicate, projection
    /// and the newest-first ordering of recent-window queries.
    pub fn evaluate(&self, rows: impl IntoIterator<Item = Feature>) -> Vec<Feature> {
        let mut rows: Vec<Feature> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .map(|row| self.project(row))
            .collect();
        if self.created_since.is_some() {
            rows.sort_by(|a, b| b.revision.created_at.cmp(&a.revision.created_at));
        }
        rows
    }
}
