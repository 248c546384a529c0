//! Per-index properties record
//!
//! A small YAML file next to the index files holding the analyzer choice,
//! the format version and the content fingerprint. Written atomically
//! (temporary file, then rename).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;

pub const PROPERTIES_FILE: &str = "index_properties.yaml";
pub const FORMAT_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexProperties {
    pub analyzer: String,
    pub version: String,
    pub fingerprint: u64,
}

impl IndexProperties {
    pub fn new(analyzer: impl Into<String>, fingerprint: u64) -> Self {
        Self {
            analyzer: analyzer.into(),
            version: FORMAT_VERSION.to_string(),
            fingerprint,
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(PROPERTIES_FILE)
    }

    /// Read the record of `dir`, falling back to `default_analyzer` and a
    /// zero fingerprint when it is missing or unreadable.
    pub fn load_or_default(dir: &Path, default_analyzer: &str) -> Self {
        let path = Self::path(dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed reading index properties");
                }
                return Self::new(default_analyzer, 0);
            }
        };
        match serde_yaml::from_str(&text) {
            Ok(props) => props,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed index properties");
                Self::new(default_analyzer, 0)
            }
        }
    }

    pub fn store(&self, dir: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        let path = Self::path(dir);
        let tmp = dir.join(format!("{}.tmp", PROPERTIES_FILE));
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
