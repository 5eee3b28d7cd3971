//! Configuration loading for melodist.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/melodist/config.toml` (system)
//! 2. `~/.config/melodist/config.toml` (user)
//! 3. `./melodist.toml` (local override, or the `--config` path)
//! 4. Environment variables (`MELODIST_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! training_dir = "~/midi/training"
//! output_dir = "."
//!
//! [enhance]
//! insert_prob = 0.35
//! seed = 42
//! max_training_files = 500
//!
//! [logging]
//! log_level = "info"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use settings::{EnhanceConfig, LoggingConfig, PathsConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Complete melodist configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MelodistConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub enhance: EnhanceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MelodistConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` stand in for the local
    /// `./melodist.toml`. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables were used.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = MelodistConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values no command could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.enhance.insert_prob;
        if p.is_nan() || !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid {
                field: "enhance.insert_prob".to_string(),
                message: format!("{p} is not within [0, 1]"),
            });
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# melodist configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "training_dir = \"{}\"\n",
            self.paths.training_dir.display()
        ));
        output.push_str(&format!(
            "output_dir = \"{}\"\n",
            self.paths.output_dir.display()
        ));

        output.push_str("\n[enhance]\n");
        // Debug formatting keeps a decimal point, so 1.0 stays a float
        output.push_str(&format!("insert_prob = {:?}\n", self.enhance.insert_prob));
        if let Some(seed) = self.enhance.seed {
            output.push_str(&format!("seed = {seed}\n"));
        }
        if let Some(max) = self.enhance.max_training_files {
            output.push_str(&format!("max_training_files = {max}\n"));
        }

        output.push_str("\n[logging]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.logging.log_level));

        output
    }
}
