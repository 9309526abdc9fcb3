//! Table/view name resolution for SDE feature relations.
//!
//! Every SDE feature table has a "base table" that carries archive history
//! and an `_evw` view exposing only current records. Models are configured
//! to draw from either relation; attachment tables follow the same scheme
//! with a `__attach` suffix on the base name.

/// Suffix of the filtered "active records" view over an archive table.
pub const VIEW_SUFFIX: &str = "_evw";

/// Suffix joining a feature base table to its attachment table.
const ATTACH_SUFFIX: &str = "__attach";

/// Resolve a base table name to the relation a feature type reads from:
/// the `_evw` view when `use_view` is set, the archive table otherwise.
pub fn feature_db_table(base_table: &str, use_view: bool) -> String {
    if use_view {
        format!("{}{}", base_table, VIEW_SUFFIX)
    } else {
        base_table.to_string()
    }
}

/// Recover the base table name from a resolved relation name.
/// Inverse of [`feature_db_table`] for the same `use_view` flag.
pub fn base_db_table(relation: &str, use_view: bool) -> String {
    if use_view {
        relation
            .strip_suffix(VIEW_SUFFIX)
            .unwrap_or(relation)
            .to_string()
    } else {
        relation.to_string()
    }
}

/// Relation holding attachments for a feature base table. The `__attach`
/// table is itself an SDE base table, so it resolves through the same
/// view-switching scheme.
pub fn attachment_db_table(base_table: &str, use_view: bool) -> String {
    feature_db_table(&format!("{}{}", base_table, ATTACH_SUFFIX), use_view)
}
