//! Configuration sections and their compiled defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where training data is read from and results are written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Folder of `.mid`/`.midi` files used to train the interval model.
    /// Default: ./training_midis
    #[serde(default = "PathsConfig::default_training_dir")]
    pub training_dir: PathBuf,

    /// Directory that corrected and enhanced files are written into.
    /// Default: the current directory
    #[serde(default = "PathsConfig::default_output_dir")]
    pub output_dir: PathBuf,
}

impl PathsConfig {
    fn default_training_dir() -> PathBuf {
        PathBuf::from("training_midis")
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            training_dir: Self::default_training_dir(),
            output_dir: Self::default_output_dir(),
        }
    }
}

/// Melody enhancement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Chance that a gap between two notes is filled, in [0, 1].
    /// Default: 0.35
    #[serde(default = "EnhanceConfig::default_insert_prob")]
    pub insert_prob: f64,

    /// Seed for reproducible runs. Unset draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Stop training after this many files. Unset reads the whole folder.
    #[serde(default)]
    pub max_training_files: Option<usize>,
}

impl EnhanceConfig {
    fn default_insert_prob() -> f64 {
        0.35
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            insert_prob: Self::default_insert_prob(),
            seed: None,
            max_training_files: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `tonality=debug`.
    /// Default: info
    #[serde(default = "LoggingConfig::default_log_level")]
    pub log_level: String,
}

impl LoggingConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
