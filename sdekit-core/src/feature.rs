//! Feature schema descriptors and the composed feature row.

use crate::geometry::{GeometryKind, Shape};
use crate::identity::{end_of_time, GlobalId, ObjectId, Timestamp};
use crate::relation::feature_db_table;
use crate::revision::Revision;
use serde::{Deserialize, Serialize};

/// Describes one feature *type*: its logical name, backing base table and
/// declared geometry. Schemas are the identity the attachment registry
/// keys off, standing in for the model classes of a dynamic-language ORM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Logical type name, e.g. `RoadSegment`.
    pub type_name: String,
    /// Base (archive) table name - never the `_evw` name.
    pub base_table: String,
    /// Geometry column kind, if the table has a shape.
    pub geometry: Option<GeometryKind>,
}

impl FeatureSchema {
    pub fn new(type_name: impl Into<String>, base_table: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            base_table: base_table.into(),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, kind: GeometryKind) -> Self {
        self.geometry = Some(kind);
        self
    }

    pub fn has_shape(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn is_point(&self) -> bool {
        self.geometry == Some(GeometryKind::Point)
    }

    /// The relation this type reads from under the given view policy.
    pub fn db_table(&self, use_view: bool) -> String {
        feature_db_table(&self.base_table, use_view)
    }
}

/// One feature row.
///
/// Keys and archive state are optional because they depend on how the
/// row was created and which relation backs it. `attachment_count` and `edited_by` are
/// query-time annotations, not columns - they ride along with the row so
/// downstream consumers (the attachments API, the edit tracker) can use
/// them without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Table-local primary key; unset until the key generator runs.
    pub object_id: Option<ObjectId>,
    /// Store-wide unique id; unset until the key generator runs.
    pub global_id: Option<GlobalId>,
    /// Archive horizon. `Some(end_of_time())` marks the active version of
    /// an archive-table-backed row; view-backed rows carry `None`.
    pub archive_end: Option<Timestamp>,
    /// Revision audit fields, maintained by the edit tracker.
    pub revision: Revision,
    /// Proprietary geometry payload, if the schema declares one.
    pub shape: Option<Shape>,
    /// Domain attributes as a JSON object.
    pub attributes: serde_json::Value,

    /// Annotation: related attachment count, when the query precomputed it.
    pub attachment_count: Option<i64>,
    /// Annotation: acting username carried from `set_edited_by`.
    pub edited_by: Option<String>,
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            object_id: None,
            global_id: None,
            archive_end: None,
            revision: Revision::default(),
            shape: None,
            attributes: serde_json::Value::Object(serde_json::Map::new()),
            attachment_count: None,
            edited_by: None,
        }
    }
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the key generator has assigned a primary key.
    pub fn is_new(&self) -> bool {
        self.object_id.is_none()
    }

    pub fn pk(&self) -> Option<ObjectId> {
        self.object_id
    }

    /// Whether this row is the current (non-archived) version. Rows from
    /// the pre-filtered view carry no archive horizon and are active by
    /// definition.
    pub fn is_active(&self) -> bool {
        match self.archive_end {
            None => true,
            Some(horizon) => horizon >= end_of_time(),
        }
    }

    /// Attach the acting username for the next save. Mirrors the
    /// query-level annotation for instances constructed directly.
    pub fn set_edited_by(&mut self, username: impl Into<String>) {
        self.edited_by = Some(username.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        if let serde_json::Value::Object(map) = &mut self.attributes {
            map.insert(name.into(), value);
        }
    }
}
