//! Configuration for the SDE access layer.
//!
//! An explicit struct handed to the components that need it - there is no
//! ambient global state. Defaults match a production deployment backed by
//! `_evw` views with edit tracking on.

use crate::error::{ConfigError, SdeResult};
use serde::{Deserialize, Serialize};

/// Master configuration for SDE feature access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdeConfig {
    /// Back feature types with the `_evw` active view rather than the
    /// archive table. When false, queries must filter archived versions
    /// themselves.
    pub use_active_view: bool,

    /// Maintain the revision fields on every save. Disable only when the
    /// schema genuinely has no revision columns.
    pub edit_tracking: bool,

    /// Fail saves that have no acting username instead of substituting
    /// `fallback_username`. Intended for tests and debug deployments.
    pub strict_edit_tracking: bool,

    /// Username written when edit tracking is on but the caller supplied
    /// no editor. Every use is logged as a warning - an edit record is
    /// never written without attribution.
    pub fallback_username: String,

    /// Enable the optimistic-lock version check on form submissions.
    pub concurrency_lock: bool,
}

impl Default for SdeConfig {
    fn default() -> Self {
        Self {
            use_active_view: true,
            edit_tracking: true,
            strict_edit_tracking: false,
            fallback_username: "sdekit-webapp".to_string(),
            concurrency_lock: true,
        }
    }
}

impl SdeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> SdeResult<()> {
        if self.edit_tracking && self.fallback_username.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "fallback_username".to_string(),
                value: self.fallback_username.clone(),
                reason: "must be non-empty while edit tracking is enabled".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// A strict configuration for test suites: archive-table-backed, no
    /// silent fallback username.
    pub fn strict() -> Self {
        Self {
            use_active_view: false,
            strict_edit_tracking: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdeError;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SdeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_blank_fallback_username_rejected() {
        let config = SdeConfig {
            fallback_username: "  ".to_string(),
            ..SdeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SdeError::Config(ConfigError::InvalidValue { field, .. })) if field == "fallback_username"
        ));
    }

    #[test]
    fn test_blank_fallback_ok_without_edit_tracking() {
        let config = SdeConfig {
            edit_tracking: false,
            fallback_username: String::new(),
            ..SdeConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = SdeConfig::strict();
        assert!(config.strict_edit_tracking);
        assert!(!config.use_active_view);
        assert!(config.validate().is_ok());
    }
}
