//! CLI configuration
//!
//! Loaded from a RON file given with `--config`. Every field is optional in
//! the file; missing fields take their defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use kinetree_core::{DEFAULT_SIGNIFICANT_DIGITS, NumberFormat, SerializeOptions};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Significant digits for numbers written to URDF and CSV
    pub significant_digits: usize,
    /// Spaces per nesting level in URDF output
    pub indent: usize,
    /// Robot name for CSV input, which does not carry one; defaults to the
    /// file stem
    pub robot_name: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
            indent: SerializeOptions::default().indent,
            robot_name: None,
        }
    }
}

impl CliConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_ron(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat::new(self.significant_digits)
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            number_format: self.number_format(),
            indent: self.indent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = CliConfig::from_ron("(significant_digits: 3)").unwrap();
        assert_eq!(config.significant_digits, 3);
        assert_eq!(config.indent, 2);
        assert_eq!(config.robot_name, None);
    }

    #[test]
    fn test_robot_name() {
        let config = CliConfig::from_ron(r#"(robot_name: Some("arm"))"#).unwrap();
        assert_eq!(config.robot_name.as_deref(), Some("arm"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kinetree.ron");
        std::fs::write(&path, "(indent: 4)").unwrap();
        assert_eq!(CliConfig::load(&path).unwrap().indent, 4);
        assert!(CliConfig::load(dir.path().join("missing.ron")).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(CliConfig::from_ron("(colour: 1)").is_err());
    }
}
