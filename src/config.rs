//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-refs.toml)
//! - Environment variables (SCHEMA_REFS__*)
//!
//! ## Example config file (schema-refs.toml):
//! ```toml
//! [resolver]
//! lookup_deleted = true
//! # unset by default; bounds acyclic chains and the recursion they cost
//! max_depth = 256
//!
//! [store]
//! seed_path = "./fixtures/schemas.json"
//!
//! [logging]
//! filter = "schema_refs=debug"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefsConfig {
    /// Reference resolution settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// In-memory store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Reference resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Ask the store for soft-deleted versions too
    #[serde(default = "default_true")]
    pub lookup_deleted: bool,

    /// Maximum nesting of reference chains; unset means unlimited
    ///
    /// Resolution recurses once per level, so very deep chains cost stack.
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
}

/// Store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// JSON array of REST schemas to preload
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when RUST_LOG is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> Option<usize> {
    None
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            lookup_deleted: true,
            max_depth: default_max_depth(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl RefsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    ///
    /// Missing or malformed sources surface as [`crate::SchemaError::Config`].
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-refs.toml",
            ".schema-refs.toml",
            "config/schema-refs.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-refs") {
            let xdg_config = config_dir.config_dir().join("schema-refs.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_REFS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    #[test]
    fn test_default_config() {
        let config = RefsConfig::default();
        assert!(config.resolver.lookup_deleted);
        assert_eq!(config.resolver.max_depth, None);
        assert!(config.store.seed_path.is_none());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_serialize_config() {
        let config = RefsConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[resolver]\nlookup_deleted = false\nmax_depth = 8\n\n[store]\nseed_path = \"seed.json\"\n",
        )
        .unwrap();

        let config = RefsConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(!config.resolver.lookup_deleted);
        assert_eq!(config.resolver.max_depth, Some(8));
        assert_eq!(config.store.seed_path, Some(PathBuf::from("seed.json")));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RefsConfig::load_from(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)), "{:?}", err);
        assert!(!err.is_integrity_error());
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[resolver]
max_depth = \"deep\"
").unwrap();
        let err = RefsConfig::load_from(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)), "{:?}", err);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = RefsConfig::default();
        config.logging.filter = "debug".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = RefsConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.logging.filter, "debug");
        assert_eq!(loaded.resolver, config.resolver);
    }
}
