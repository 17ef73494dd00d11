//! Tree configuration.
//!
//! Layered: built-in defaults -> config file -> environment variables.
//! Environment variables use the `METRIC_TREE_` prefix with `__` between
//! nested keys, e.g. `METRIC_TREE_LEAF_CAPACITY=64` or
//! `METRIC_TREE_SPLIT__STRATEGY=random`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::MetricError;

/// Environment variable prefix for settings.
pub const ENV_PREFIX: &str = "METRIC_TREE";

/// Routing-object selection policy used when a node overflows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategyKind {
    /// Promote the pair with the largest pairwise distance (MLB_DIST)
    #[default]
    FarthestPair,
    /// Promote two uniformly drawn entries
    Random,
}

/// Node split configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitSettings {
    #[serde(default)]
    pub strategy: SplitStrategyKind,

    /// Seed for the random strategy, fixed for reproducible trees.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    0x5eed
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            strategy: SplitStrategyKind::default(),
            seed: default_seed(),
        }
    }
}

/// Metric tree settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeSettings {
    /// Maximum entries in a leaf before it splits
    #[serde(default = "default_capacity")]
    pub leaf_capacity: usize,

    /// Maximum entries in a directory node before it splits
    #[serde(default = "default_capacity")]
    pub directory_capacity: usize,

    #[serde(default)]
    pub split: SplitSettings,

    /// Pages kept in the LRU page cache
    #[serde(default = "default_page_cache_size")]
    pub page_cache_size: usize,

    /// Relations with fewer objects than this are always scanned linearly
    #[serde(default = "default_linear_scan_threshold")]
    pub linear_scan_threshold: usize,

    /// Run a full integrity check after every insertion (slow)
    #[serde(default)]
    pub integrity_checks: bool,
}

fn default_capacity() -> usize {
    32
}

fn default_page_cache_size() -> usize {
    256
}

fn default_linear_scan_threshold() -> usize {
    32
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            leaf_capacity: default_capacity(),
            directory_capacity: default_capacity(),
            split: SplitSettings::default(),
            page_cache_size: default_page_cache_size(),
            linear_scan_threshold: default_linear_scan_threshold(),
            integrity_checks: false,
        }
    }
}

impl TreeSettings {
    pub fn with_capacity(mut self, leaf: usize, directory: usize) -> Self {
        self.leaf_capacity = leaf;
        self.directory_capacity = directory;
        self
    }

    pub fn with_split(mut self, strategy: SplitStrategyKind, seed: u64) -> Self {
        self.split = SplitSettings { strategy, seed };
        self
    }

    pub fn with_linear_scan_threshold(mut self, threshold: usize) -> Self {
        self.linear_scan_threshold = threshold;
        self
    }

    pub fn with_integrity_checks(mut self, enabled: bool) -> Self {
        self.integrity_checks = enabled;
        self
    }

    /// Validate configuration values.
    ///
    /// A node is split once it holds more than `capacity` entries, and a
    /// split needs at least three entries, so capacities start at 2.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.leaf_capacity < 2 {
            return Err(MetricError::Config(format!(
                "leaf_capacity must be >= 2, got {}",
                self.leaf_capacity
            )));
        }
        if self.directory_capacity < 2 {
            return Err(MetricError::Config(format!(
                "directory_capacity must be >= 2, got {}",
                self.directory_capacity
            )));
        }
        if self.page_cache_size == 0 {
            return Err(MetricError::Config(
                "page_cache_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/metric-tree/config.toml)
    /// 3. Explicit config file (optional)
    /// 4. Environment variables (METRIC_TREE_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, MetricError> {
        Self::load_with_prefix(config_path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(
        config_path: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self, MetricError> {
        let config_dir = ProjectDirs::from("", "", "metric-tree")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("leaf_capacity", default_capacity() as i64)
            .map_err(|e| MetricError::Config(e.to_string()))?
            .set_default("directory_capacity", default_capacity() as i64)
            .map_err(|e| MetricError::Config(e.to_string()))?
            .set_default("page_cache_size", default_page_cache_size() as i64)
            .map_err(|e| MetricError::Config(e.to_string()))?
            .set_default(
                "linear_scan_threshold",
                default_linear_scan_threshold() as i64,
            )
            .map_err(|e| MetricError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: TreeSettings = builder
            .build()
            .map_err(|e| MetricError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| MetricError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }
}
