//! Revision fields and the edit-tracking engine.
//!
//! Every save of a feature row stamps who made the edit and when. The
//! acting username arrives either as an explicit argument or as the
//! `edited_by` annotation attached upstream by `set_edited_by`; a save
//! with neither is a configuration error. An edit record is never written
//! without attribution - the configured fallback username is substituted
//! (with a warning) when the policy allows it.

use crate::config::SdeConfig;
use crate::error::{ConfigError, SdeResult};
use crate::feature::Feature;
use crate::identity::Timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Revision audit fields carried on every feature row.
///
/// `last_edited_at` doubles as the optimistic-lock version token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub created_by: Option<String>,
    pub created_at: Option<Timestamp>,
    pub last_edited_by: Option<String>,
    pub last_edited_at: Option<Timestamp>,
}

impl Revision {
    /// The version token, falling back to the minimum timestamp when the
    /// row has never been stamped.
    pub fn effective_last_edited_at(&self) -> Timestamp {
        self.last_edited_at.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Snapshot of the audit trail for display.
    pub fn version_info(&self) -> VersionInfo {
        VersionInfo {
            created_by: self.created_by.clone(),
            created_on: self.created_at,
            edited_by: self.last_edited_by.clone(),
            edited_on: self.effective_last_edited_at(),
        }
    }

    /// True iff this row was likely created by the given user. "Likely"
    /// because the store keeps only a username text field, not a relation.
    pub fn was_created_by(&self, username: &str) -> bool {
        self.created_by
            .as_deref()
            .is_some_and(|u| u.eq_ignore_ascii_case(username))
    }

    /// True iff this row was likely last edited by the given user.
    pub fn was_last_edited_by(&self, username: &str) -> bool {
        self.last_edited_by
            .as_deref()
            .is_some_and(|u| u.eq_ignore_ascii_case(username))
    }
}

/// Audit-trail snapshot of a row version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub created_by: Option<String>,
    pub created_on: Option<Timestamp>,
    pub edited_by: Option<String>,
    pub edited_on: Timestamp,
}

/// Server-side stamping half of the edit-tracking protocol.
#[derive(Debug, Clone)]
pub struct EditTracker {
    config: SdeConfig,
}

impl EditTracker {
    pub fn new(config: SdeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SdeConfig {
        &self.config
    }

    /// Stamp a row about to be saved.
    ///
    /// Resolves the acting username from `explicit` or the row's
    /// `edited_by` annotation, sets `last_edited_by`/`last_edited_at`,
    /// and on the first save of a new row also sets `created_by`/
    /// `created_at` - once only, never overwritten later.
    ///
    /// No-op when edit tracking is disabled. With no username available,
    /// strict mode fails with [`ConfigError::MissingEditor`]; otherwise
    /// the fallback username is written and a warning logged.
    pub fn stamp(
        &self,
        feature: &mut Feature,
        explicit: Option<&str>,
        table: &str,
    ) -> SdeResult<()> {
        if !self.config.edit_tracking {
            return Ok(());
        }

        let username = match explicit.or(feature.edited_by.as_deref()) {
            Some(name) => name.to_string(),
            None if self.config.strict_edit_tracking => {
                return Err(ConfigError::MissingEditor {
                    table: table.to_string(),
                }
                .into());
            }
            None => {
                tracing::warn!(
                    table,
                    fallback = %self.config.fallback_username,
                    "edit tracking had no acting username; was set_edited_by missed?"
                );
                self.config.fallback_username.clone()
            }
        };

        let now = Utc::now();
        feature.revision.last_edited_by = Some(username.clone());
        feature.revision.last_edited_at = Some(now);

        if feature.revision.created_at.is_none() {
            feature.revision.created_by = Some(username);
            feature.revision.created_at = Some(now);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdeError;

    fn tracker(config: SdeConfig) -> EditTracker {
        EditTracker::new(config)
    }

    #[test]
    fn test_stamp_with_explicit_username() {
        let mut feature = Feature::new();
        tracker(SdeConfig::default())
            .stamp(&mut feature, Some("jsmith"), "road_segment")
            .unwrap();
        assert_eq!(feature.revision.last_edited_by.as_deref(), Some("jsmith"));
        assert!(feature.revision.last_edited_at.is_some());
    }

    #[test]
    fn test_stamp_uses_edited_by_annotation() {
        let mut feature = Feature::new();
        feature.set_edited_by("annotated");
        tracker(SdeConfig::default())
            .stamp(&mut feature, None, "road_segment")
            .unwrap();
        assert_eq!(
            feature.revision.last_edited_by.as_deref(),
            Some("annotated")
        );
    }

    #[test]
    fn test_explicit_username_wins_over_annotation() {
        let mut feature = Feature::new();
        feature.set_edited_by("annotated");
        tracker(SdeConfig::default())
            .stamp(&mut feature, Some("explicit"), "road_segment")
            .unwrap();
        assert_eq!(feature.revision.last_edited_by.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_first_stamp_sets_created_fields() {
        let before = Utc::now();
        let mut feature = Feature::new();
        tracker(SdeConfig::default())
            .stamp(&mut feature, Some("jsmith"), "road_segment")
            .unwrap();
        let after = Utc::now();

        assert_eq!(feature.revision.created_by.as_deref(), Some("jsmith"));
        let created = feature.revision.created_at.unwrap();
        assert!(created >= before && created <= after);
        assert_eq!(feature.revision.created_at, feature.revision.last_edited_at);
    }

    #[test]
    fn test_created_fields_never_overwritten() {
        let mut feature = Feature::new();
        let t = tracker(SdeConfig::default());
        t.stamp(&mut feature, Some("creator"), "road_segment").unwrap();
        let created_at = feature.revision.created_at;

        t.stamp(&mut feature, Some("editor"), "road_segment").unwrap();
        assert_eq!(feature.revision.created_by.as_deref(), Some("creator"));
        assert_eq!(feature.revision.created_at, created_at);
        assert_eq!(feature.revision.last_edited_by.as_deref(), Some("editor"));
    }

    #[test]
    fn test_missing_editor_strict_fails() {
        let mut feature = Feature::new();
        let result = tracker(SdeConfig::strict()).stamp(&mut feature, None, "road_segment");
        assert!(matches!(
            result,
            Err(SdeError::Config(ConfigError::MissingEditor { table })) if table == "road_segment"
        ));
        assert!(feature.revision.last_edited_by.is_none());
    }

    #[test]
    fn test_missing_editor_falls_back_with_default() {
        let mut feature = Feature::new();
        tracker(SdeConfig::default())
            .stamp(&mut feature, None, "road_segment")
            .unwrap();
        assert_eq!(
            feature.revision.last_edited_by.as_deref(),
            Some("sdekit-webapp")
        );
    }

    #[test]
    fn test_disabled_tracking_is_noop() {
        let mut feature = Feature::new();
        let config = SdeConfig {
            edit_tracking: false,
            ..SdeConfig::default()
        };
        tracker(config)
            .stamp(&mut feature, Some("jsmith"), "road_segment")
            .unwrap();
        assert_eq!(feature.revision, Revision::default());
    }

    #[test]
    fn test_was_edited_by_is_case_insensitive() {
        let mut feature = Feature::new();
        tracker(SdeConfig::default())
            .stamp(&mut feature, Some("JSmith"), "road_segment")
            .unwrap();
        assert!(feature.revision.was_last_edited_by("jsmith"));
        assert!(feature.revision.was_created_by("JSMITH"));
        assert!(!feature.revision.was_last_edited_by("other"));
    }

    #[test]
    fn test_effective_version_token_fallback() {
        let revision = Revision::default();
        assert_eq!(
            revision.effective_last_edited_at(),
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[test]
    fn test_version_info_snapshot() {
        let mut feature = Feature::new();
        tracker(SdeConfig::default())
            .stamp(&mut feature, Some("jsmith"), "road_segment")
            .unwrap();
        let info = feature.revision.version_info();
        assert_eq!(info.edited_by.as_deref(), Some("jsmith"));
        assert_eq!(info.created_by.as_deref(), Some("jsmith"));
        assert_eq!(Some(info.edited_on), feature.revision.last_edited_at);
    }
}
