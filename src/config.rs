// In: src/config.rs

//! The single source of truth for all molvis core configuration.
//!
//! This module defines the unified `MolvisConfig` struct, which is designed to be
//! created once at the application boundary (e.g., from the host's JSON settings)
//! and then passed down through the system via a shared, read-only
//! `Arc<MolvisConfig>`. Modifiers see it through their `ApplyContext`.

use serde::{Deserialize, Serialize};

use crate::error::MolvisError;

//==================================================================================
// I. Core Configuration Enums & Structs
//==================================================================================

/// What a `Trajectory` does when its cursor is advanced past either end.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// **Default:** The cursor stops at the first or last frame.
    #[default]
    Clamp,

    /// The cursor wraps around, so playback loops.
    Wrap,
}

/// How `HideSelectionModifier` treats rows flagged by the selection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HideMode {
    /// **Default:** Flagged atoms are removed, and bonds touching them are dropped.
    #[default]
    Remove,

    /// Row counts are preserved; atoms and bonds receive a `visible` column instead.
    Mask,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TrajectoryConfig {
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Column written by a selection modifier that was not given a name.
    #[serde(default = "default_selection_name")]
    pub default_name: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_name: default_selection_name(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HideConfig {
    #[serde(default)]
    pub mode: HideMode,
}

/// Settings for `observability::init_logging`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// A `log` level name: "error", "warn", "info", "debug" or "trace".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// If set, log lines are appended to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

//==================================================================================
// II. The Unified MolvisConfig
//==================================================================================

/// The single, unified configuration for a molvis session.
/// This struct is created once and shared throughout the system via an `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MolvisConfig {
    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub hide: HideConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MolvisConfig {
    /// Parses a configuration from JSON. Every field is optional.
    pub fn from_json_str(json: &str) -> Result<Self, MolvisError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Helper for `serde` to provide a default for `selection.default_name`.
fn default_selection_name() -> String {
    "selected".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = MolvisConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MolvisConfig::default());
        assert_eq!(config.trajectory.boundary, BoundaryPolicy::Clamp);
        assert_eq!(config.hide.mode, HideMode::Remove);
        assert_eq!(config.selection.default_name, "selected");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let config = MolvisConfig::from_json_str(
            r#"{ "trajectory": { "boundary": "wrap" }, "hide": { "mode": "mask" } }"#,
        )
        .unwrap();
        assert_eq!(config.trajectory.boundary, BoundaryPolicy::Wrap);
        assert_eq!(config.hide.mode, HideMode::Mask);
        assert_eq!(config.selection.default_name, "selected");
    }

    #[test]
    fn test_unknown_policy_is_an_error() {
        let result = MolvisConfig::from_json_str(r#"{ "trajectory": { "boundary": "bounce" } }"#);
        assert!(matches!(result, Err(MolvisError::SerdeJson(_))));
    }
}
