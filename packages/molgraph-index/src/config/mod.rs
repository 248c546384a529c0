//! Controller configuration
//!
//! Everything the lifecycle controller needs besides the per-build
//! parameters: where indexes live, writer memory, and logging cadence.
//! Loaded from YAML or built in code, then validated once.

mod error;

pub use error::{ConfigError, ConfigResult};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const MIN_WRITER_HEAP: usize = 15_000_000;
const MAX_WRITER_HEAP: usize = 4_000_000_000;
const MAX_SEARCH_RESULTS: usize = 1_000_000;

/// Lifecycle controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Root directory; each index gets its own sub-directory
    pub data_dir: PathBuf,

    /// Memory budget handed to the index writer (bytes)
    pub writer_heap_bytes: usize,

    /// Entities between progress log lines during builds and updates
    pub progress_interval: u64,

    /// Analyzer used when no `analyzer` parameter is set
    pub default_analyzer: String,

    /// Upper clamp on search result limits
    pub max_search_results: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("fts-data"),
            writer_heap_bytes: 50_000_000,
            progress_interval: 100_000,
            default_analyzer: "standard".to_string(),
            max_search_results: 10_000,
        }
    }
}

impl ControllerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load from a YAML file and validate.
    pub fn from_yaml(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.writer_heap_bytes < MIN_WRITER_HEAP || self.writer_heap_bytes > MAX_WRITER_HEAP {
            return Err(ConfigError::range_with_hint(
                "writer_heap_bytes",
                self.writer_heap_bytes,
                MIN_WRITER_HEAP,
                MAX_WRITER_HEAP,
                "The index writer needs at least 15MB of heap",
            ));
        }

        if self.progress_interval == 0 {
            return Err(ConfigError::range_with_hint(
                "progress_interval",
                self.progress_interval,
                1,
                u64::MAX,
                "Progress must be reported at some interval",
            ));
        }

        if self.max_search_results == 0 || self.max_search_results > MAX_SEARCH_RESULTS {
            return Err(ConfigError::range_with_hint(
                "max_search_results",
                self.max_search_results,
                1,
                MAX_SEARCH_RESULTS,
                "Search limits must be reasonable",
            ));
        }

        Ok(())
    }

    /// Builder: Set writer heap
    pub fn writer_heap_bytes(mut self, v: usize) -> Self {
        self.writer_heap_bytes = v;
        self
    }

    /// Builder: Set progress interval
    pub fn progress_interval(mut self, v: u64) -> Self {
        self.progress_interval = v;
        self
    }

    /// Builder: Set default analyzer
    pub fn default_analyzer(mut self, v: impl Into<String>) -> Self {
        self.default_analyzer = v.into();
        self
    }

    /// Builder: Set max search results
    pub fn max_search_results(mut self, v: usize) -> Self {
        self.max_search_results = v;
        self
    }
}
