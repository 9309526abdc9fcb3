//! Key assignment for newly created feature rows.
//!
//! Creating SDE-native features from application code is a rare,
//! exceptional operation - the external system is authoritative. When it
//! is unavoidable, the two identifying values must come from the store's
//! own id procedures: `next_globalid` for the global id and `next_rowid`
//! for the table-local sequence, the latter requiring the table's owning
//! principal.

use crate::SdeBackend;
use sdekit_core::{Feature, FeatureSchema, SdeConfig, SdeResult};

/// Assign any missing keys to a feature about to be persisted for the
/// first time.
///
/// Idempotent with respect to already-assigned keys: a non-empty
/// `global_id` or `object_id` is never overwritten. Store-procedure
/// failures propagate as hard errors; there is no retry or fallback.
pub fn assign_keys<B: SdeBackend>(
    backend: &B,
    schema: &FeatureSchema,
    config: &SdeConfig,
    feature: &mut Feature,
) -> SdeResult<()> {
    if feature.global_id.is_none() {
        feature.global_id = Some(backend.next_global_id()?);
    }

    if feature.object_id.is_none() {
        let table = schema.db_table(config.use_active_view);
        let owner = backend.table_owner(&table)?;
        feature.object_id = Some(backend.next_row_id(&owner, &table)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockSdeBackend;
    use sdekit_core::{GlobalId, SdeError, StorageError};
    use uuid::Uuid;

    fn setup() -> (MockSdeBackend, FeatureSchema, SdeConfig) {
        let backend = MockSdeBackend::new();
        backend.register_table("road_segment", "sde");
        let schema = FeatureSchema::new("RoadSegment", "road_segment");
        let config = SdeConfig {
            use_active_view: false,
            ..SdeConfig::default()
        };
        (backend, schema, config)
    }

    #[test]
    fn test_assigns_both_keys_when_absent() {
        let (backend, schema, config) = setup();
        let mut feature = Feature::new();
        assign_keys(&backend, &schema, &config, &mut feature).unwrap();
        assert!(feature.global_id.is_some());
        assert_eq!(feature.object_id, Some(1));
    }

    #[test]
    fn test_assignment_is_idempotent() {
        let (backend, schema, config) = setup();
        let mut feature = Feature::new();
        assign_keys(&backend, &schema, &config, &mut feature).unwrap();

        let global_id = feature.global_id.clone();
        let object_id = feature.object_id;
        assign_keys(&backend, &schema, &config, &mut feature).unwrap();
        assert_eq!(feature.global_id, global_id);
        assert_eq!(feature.object_id, object_id);
    }

    #[test]
    fn test_preassigned_keys_are_kept() {
        let (backend, schema, config) = setup();
        let preset = GlobalId::from_uuid(Uuid::new_v4());
        let mut feature = Feature::new();
        feature.global_id = Some(preset.clone());
        feature.object_id = Some(99);

        assign_keys(&backend, &schema, &config, &mut feature).unwrap();
        assert_eq!(feature.global_id, Some(preset));
        assert_eq!(feature.object_id, Some(99));
    }

    #[test]
    fn test_partial_assignment_fills_only_the_gap() {
        let (backend, schema, config) = setup();
        let preset = GlobalId::from_uuid(Uuid::new_v4());
        let mut feature = Feature::new();
        feature.global_id = Some(preset.clone());

        assign_keys(&backend, &schema, &config, &mut feature).unwrap();
        assert_eq!(feature.global_id, Some(preset));
        assert_eq!(feature.object_id, Some(1));
    }

    #[test]
    fn test_view_backed_uses_view_relation_for_rowid() {
        let backend = MockSdeBackend::new();
        backend.register_table("road_segment_evw", "sde");
        let schema = FeatureSchema::new("RoadSegment", "road_segment");
        let config = SdeConfig::default();

        let mut feature = Feature::new();
        assign_keys(&backend, &schema, &config, &mut feature).unwrap();
        assert_eq!(feature.object_id, Some(1));
    }

    #[test]
    fn test_procedure_failure_propagates() {
        let (backend, schema, config) = setup();
        backend.set_procedures_available(false);
        let mut feature = Feature::new();
        let result = assign_keys(&backend, &schema, &config, &mut feature);
        assert!(matches!(
            result,
            Err(SdeError::Storage(StorageError::ProcedureFailed { .. }))
        ));
        assert!(feature.global_id.is_none());
    }

    #[test]
    fn test_unknown_table_owner_propagates() {
        let backend = MockSdeBackend::new();
        let schema = FeatureSchema::new("RoadSegment", "road_segment");
        let config = SdeConfig {
            use_active_view: false,
            ..SdeConfig::default()
        };
        let mut feature = Feature::new();
        let result = assign_keys(&backend, &schema, &config, &mut feature);
        assert!(matches!(
            result,
            Err(SdeError::Storage(StorageError::TableOwnerNotFound { .. }))
        ));
    }
}
