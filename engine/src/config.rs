//! Engine configuration.
//!
//! All tunables the registry and parsers consult live here, constructed
//! explicitly and passed to [`CommandRegistry::new`]; there is no global
//! configuration state. The struct is YAML-serializable for loading from a
//! settings file.
//!
//! # Example YAML
//!
//! ```yaml
//! default_namespace: main
//! fuzzy_match: true
//! fuzzy_threshold: 0.6
//! raise_on_failure: false
//! command_max_count: 200
//! message_max_cache: 100
//! enable_message_cache: true
//! separators: " "
//! ```
//!
//! [`CommandRegistry::new`]: crate::CommandRegistry::new

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the registry and its compiled parsers.
///
/// # Examples
///
/// ```
/// use command_grammar_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.command_max_count, 200);
/// assert_eq!(config.fuzzy_threshold, 0.6);
/// assert!(!config.fuzzy_match);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace assumed for bare command names.
    pub default_namespace: String,
    /// Offer "did you mean" suggestions on near-miss failures.
    pub fuzzy_match: bool,
    /// Similarity cutoff in `(0, 1)` for suggestions.
    pub fuzzy_threshold: f64,
    /// Default failure policy for parses (commands may override).
    pub raise_on_failure: bool,
    /// Maximum number of live registered commands.
    pub command_max_count: usize,
    /// Capacity of the message-result cache.
    pub message_max_cache: usize,
    /// Consult the message-result cache for static parses.
    pub enable_message_cache: bool,
    /// Default token separators.
    pub separators: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_namespace: "main".to_string(),
            fuzzy_match: false,
            fuzzy_threshold: 0.6,
            raise_on_failure: false,
            command_max_count: 200,
            message_max_cache: 100,
            enable_message_cache: true,
            separators: " ".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// [`Io`](crate::RegistryError::Io) if the file cannot be read,
    /// [`Config`](crate::RegistryError::Config) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// [`Io`](crate::RegistryError::Io) if the file cannot be written,
    /// [`Config`](crate::RegistryError::Config) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EngineConfig =
            serde_yaml::from_str("fuzzy_match: true\ncommand_max_count: 8\n").unwrap();
        assert!(config.fuzzy_match);
        assert_eq!(config.command_max_count, 8);
        assert_eq!(config.fuzzy_threshold, 0.6);
        assert_eq!(config.default_namespace, "main");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = EngineConfig::default();
        config.fuzzy_match = true;
        config.message_max_cache = 12;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = std::env::temp_dir().join("command_grammar_config_rt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.yml");

        let mut original = EngineConfig::default();
        original.command_max_count = 32;
        original.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, original);

        std::fs::remove_dir_all(&dir).ok();
    }
}
