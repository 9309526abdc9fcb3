//! SDE geometry variants.
//!
//! SDE stores shapes in a proprietary format that cannot be manipulated
//! without a spatial engine - the payload is an opaque hex blob that must
//! not be tampered with. The shape is a tagged union over the geometry
//! kinds a feature table may declare; features without geometry simply
//! carry no shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry kind a feature schema declares for its shape column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "st_point",
            GeometryKind::Line => "st_line",
            GeometryKind::Polygon => "st_geometry",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// An SDE shape value: the kind plus the proprietary hex-encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Point(String),
    Line(String),
    Polygon(String),
}

impl Shape {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Point(_) => GeometryKind::Point,
            Shape::Line(_) => GeometryKind::Line,
            Shape::Polygon(_) => GeometryKind::Polygon,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Shape::Point(_))
    }

    /// The raw hex payload. Opaque - useful only to hand back to the store.
    pub fn payload(&self) -> &str {
        match self {
            Shape::Point(hex) | Shape::Line(hex) | Shape::Polygon(hex) => hex,
        }
    }
}
