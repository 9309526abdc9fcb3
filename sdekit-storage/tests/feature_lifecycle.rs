//! End-to-end tests of the feature edit protocol and attachment binding
//! over the mock backend: create, concurrent edit, conflict, attachment
//! access and caption editing.

use sdekit_core::{
    end_of_time, ConcurrencyConflict, Feature, FeatureSchema, GeometryKind, SdeConfig,
    SdeError, Shape, SubmittedVersion,
};
use sdekit_storage::{AttachmentRegistry, FeatureRepository, MockSdeBackend};
use uuid::Uuid;

fn table_config() -> SdeConfig {
    SdeConfig {
        use_active_view: false,
        ..SdeConfig::default()
    }
}

fn seeded_backend() -> MockSdeBackend {
    let backend = MockSdeBackend::new();
    backend.register_table("culvert_pt", "sde");
    backend.register_table("culvert_pt__attach", "sde");
    backend
}

fn schema() -> FeatureSchema {
    FeatureSchema::new("Culvert", "culvert_pt").with_geometry(GeometryKind::Point)
}

#[test]
fn create_edit_and_requery_lifecycle() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), table_config(), &registry);

    // create: keys come from the store procedures, revision is stamped
    let mut culvert = Feature::new();
    culvert.set_attribute("diameter_mm", serde_json::json!(600));
    culvert.shape = Some(Shape::Point("0101000020110f0000".into()));
    repo.save(&mut culvert, Some("inspector1")).unwrap();

    let global_id = culvert.global_id.clone().expect("assigned");
    assert_eq!(global_id.as_str().len(), 38);
    assert_eq!(culvert.archive_end, Some(end_of_time()));
    assert!(culvert.revision.was_created_by("inspector1"));

    // requery through the default path: active rows, shape deferred
    let fetched = repo
        .fetch(&repo.query())
        .unwrap()
        .into_iter()
        .next()
        .expect("row visible");
    assert_eq!(fetched.global_id, Some(global_id));
    assert!(fetched.shape.is_none(), "shape payload must be deferred");

    // the payload is there when explicitly requested
    let with_shape = repo
        .fetch(&repo.query().with_shape())
        .unwrap()
        .into_iter()
        .next()
        .expect("row visible");
    assert!(with_shape.shape.is_some());
}

#[test]
fn optimistic_lock_scenarios() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), table_config(), &registry);

    let mut culvert = Feature::new();
    repo.save(&mut culvert, Some("inspector1")).unwrap();
    let t1 = culvert.revision.last_edited_at;

    // 1. token matches the persisted version: accepted
    let ok = repo.validate_submission(&culvert, &SubmittedVersion::new(t1, culvert.pk()));
    assert!(ok.is_ok());

    // 2. another session saves; the old token is now stale: "modified"
    let mut other_session = culvert.clone();
    repo.save(&mut other_session, Some("inspector2")).unwrap();
    let stale = repo.validate_submission(&culvert, &SubmittedVersion::new(t1, culvert.pk()));
    assert!(matches!(
        stale,
        Err(SdeError::Concurrency(ConcurrencyConflict::Modified))
    ));

    // 3. the client knows a key that no longer has a row: "removed"
    let mut ghost = Feature::new();
    ghost.object_id = Some(987_654);
    let removed = repo.validate_submission(&ghost, &SubmittedVersion::new(None, Some(987_654)));
    assert!(matches!(
        removed,
        Err(SdeError::Concurrency(ConcurrencyConflict::Removed))
    ));

    // 4. no version fields submitted: no check performed
    let unchecked = repo.validate_submission(&culvert, &SubmittedVersion::default());
    assert!(unchecked.is_ok());
}

#[test]
fn conflicting_edit_is_not_persisted() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), table_config(), &registry);

    let mut culvert = Feature::new();
    repo.save(&mut culvert, Some("inspector1")).unwrap();
    let observed_token = culvert.revision.last_edited_at;

    let mut other_session = culvert.clone();
    other_session.set_attribute("condition", serde_json::json!("poor"));
    repo.save(&mut other_session, Some("inspector2")).unwrap();

    let mut stale_edit = culvert.clone();
    stale_edit.set_attribute("condition", serde_json::json!("good"));
    let result = repo.save_submission(
        &mut stale_edit,
        Some("inspector1"),
        &SubmittedVersion::new(observed_token, culvert.pk()),
    );
    assert!(result.is_err());

    // the other session's write survives
    let persisted = repo.get(culvert.pk().expect("pk")).unwrap().expect("row");
    assert_eq!(
        persisted.attribute("condition"),
        Some(&serde_json::json!("poor"))
    );
    assert!(persisted.revision.was_last_edited_by("inspector2"));
}

#[test]
fn attachment_binding_full_flow() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), table_config(), &registry);

    let mut culvert = Feature::new();
    repo.save(&mut culvert, Some("inspector1")).unwrap();
    let gid = culvert.global_id.clone().expect("assigned");

    for (id, content_type) in [(1, "image/jpeg"), (2, "application/pdf"), (3, "image/png")] {
        backend.add_attachment(
            "culvert_pt__attach",
            sdekit_core::Attachment {
                attachment_id: Some(id),
                global_id: None,
                related_global_id: gid.clone(),
                content_type: content_type.to_string(),
                caption: format!("photo {}", id),
                data_size: 0,
                data: None,
            },
        );
    }

    let api = repo.attachments(&culvert).unwrap();
    assert!(api.has_attachments());
    assert_eq!(api.count().unwrap(), 3);
    assert_eq!(api.images().unwrap().len(), 2);

    let updated = api.save_caption(1, "upstream end, spring freshet").unwrap();
    assert_eq!(updated.caption, "upstream end, spring freshet");

    // binding a second repository reuses the registered model without
    // another catalog probe
    let probes = backend.catalog_probe_count();
    let api2 = repo.attachments(&culvert).unwrap();
    assert_eq!(api2.count().unwrap(), 3);
    assert_eq!(backend.catalog_probe_count(), probes);
}

#[test]
fn view_backed_configuration_reads_the_view() {
    let backend = MockSdeBackend::new();
    backend.register_table("culvert_pt_evw", "sde");
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), SdeConfig::default(), &registry);

    let mut culvert = Feature::new();
    repo.save(&mut culvert, Some("inspector1")).unwrap();

    // view rows never carry the archive horizon
    assert_eq!(culvert.archive_end, None);
    assert_eq!(backend.feature_rows("culvert_pt_evw").len(), 1);
    assert_eq!(backend.feature_rows("culvert_pt").len(), 0);

    let fetched = repo.fetch(&repo.query()).unwrap();
    assert_eq!(fetched.len(), 1);
}

#[test]
fn strict_mode_refuses_unattributed_saves() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), SdeConfig::strict(), &registry);

    let mut culvert = Feature::new();
    let result = repo.save(&mut culvert, None);
    assert!(matches!(result, Err(SdeError::Config(_))));
    assert!(backend.feature_rows("culvert_pt").is_empty());
}

#[test]
fn archived_versions_stay_hidden() {
    let backend = seeded_backend();
    let registry = AttachmentRegistry::new();
    let repo = FeatureRepository::new(&backend, schema(), table_config(), &registry);

    // the external system archived an old version of this feature
    let gid = sdekit_core::GlobalId::from_uuid(Uuid::new_v4());
    let mut superseded = Feature::new();
    superseded.object_id = Some(1);
    superseded.global_id = Some(gid.clone());
    superseded.archive_end = Some(chrono::Utc::now());
    backend.add_feature("culvert_pt", superseded);

    let mut current = Feature::new();
    current.object_id = Some(1);
    current.global_id = Some(gid);
    current.archive_end = Some(end_of_time());
    backend.add_feature("culvert_pt", current);

    let rows = repo.fetch(&repo.query()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].archive_end, Some(end_of_time()));
}
