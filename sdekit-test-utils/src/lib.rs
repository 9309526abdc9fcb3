//! SDEKIT Test Utilities
//!
//! Centralized test infrastructure for the sdekit workspace:
//! - Mock id generators standing in for the store's id procedures
//! - Feature and attachment fixtures
//! - A pre-seeded mock backend for integration-style tests

// Re-export the mock backend from its source crate
pub use sdekit_storage::MockSdeBackend;

// Re-export core types for convenience
pub use sdekit_core::{
    end_of_time, Attachment, Feature, FeatureSchema, GeometryKind, GlobalId, ObjectId,
    Revision, SdeConfig, SdeError, SdeResult, Shape, SubmittedVersion, Timestamp,
};
pub use sdekit_storage::{AttachmentRegistry, FeatureQuery, FeatureRepository};

use base64::Engine;
use uuid::Uuid;

/// Fixture username stamped onto features created by the helpers below.
pub const FIXTURE_EDITOR: &str = "sdekit-test-fixture";

/// Postgres uses 4-byte integers; keep mock ids in the positive half.
const MAX_OBJECT_ID: u32 = 0xffff_ffff / 2;

/// A 5x5 red-dot PNG, the smallest payload that renders as an image.
const RED_DOT_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAUAAAAFCAYAAACNbyblAAAAHElEQVQI12P4//8/w38GIAXDIBKE0DHxgljNBAAO9TXL0Y4OHwAAAABJRU5ErkJggg==";

/// Mint a mock global id, as the store's `next_globalid` would.
pub fn mock_global_id() -> GlobalId {
    GlobalId::from_uuid(Uuid::new_v4())
}

/// Mint a mock object id suitable for fixture rows.
pub fn mock_object_id() -> ObjectId {
    (Uuid::new_v4().as_u128() % MAX_OBJECT_ID as u128) as ObjectId
}

/// Create a feature instance suitable for testing: keys assigned, active
/// archive horizon set, revision stamped with [`FIXTURE_EDITOR`].
pub fn create_test_feature() -> Feature {
    let now = chrono::Utc::now();
    let mut feature = Feature::new();
    feature.object_id = Some(mock_object_id());
    feature.global_id = Some(mock_global_id());
    feature.archive_end = Some(end_of_time());
    feature.revision = Revision {
        created_by: Some(FIXTURE_EDITOR.to_string()),
        created_at: Some(now),
        last_edited_by: Some(FIXTURE_EDITOR.to_string()),
        last_edited_at: Some(now),
    };
    feature
}

/// A tiny PNG attachment related to the given feature global id.
pub fn create_test_image_attachment(related: &GlobalId) -> Attachment {
    let data = base64::engine::general_purpose::STANDARD
        .decode(RED_DOT_PNG_B64)
        .unwrap_or_default();
    Attachment {
        attachment_id: Some(mock_object_id()),
        global_id: Some(mock_global_id()),
        related_global_id: related.clone(),
        content_type: "image/png".to_string(),
        caption: "test image".to_string(),
        data_size: data.len() as i64,
        data: Some(data),
    }
}

/// A mock backend with a feature table, its `__attach` table and one
/// seeded feature row. Returns the backend and the seeded feature.
pub fn seeded_backend(schema: &FeatureSchema, config: &SdeConfig) -> (MockSdeBackend, Feature) {
    let backend = MockSdeBackend::new();
    let table = schema.db_table(config.use_active_view);
    backend.register_table(table.clone(), "sde");
    backend.register_table(
        sdekit_core::attachment_db_table(&schema.base_table, config.use_active_view),
        "sde",
    );

    let mut feature = create_test_feature();
    if config.use_active_view {
        // view rows are pre-filtered; they carry no archive horizon
        feature.archive_end = None;
    }
    backend.add_feature(&table, feature.clone());
    (backend, feature)
}
