//! Accessor configuration, readable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What a write does with a value wider than its declared type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail with [`AccessorError::ValueOutOfRange`](crate::AccessorError::ValueOutOfRange)
    /// before touching storage.
    #[default]
    Reject,
    /// Keep the low bits that fit, as a masked packed write does, and report
    /// the write as truncated.
    Truncate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessorConfig {
    pub overflow: OverflowPolicy,
}

impl AccessorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading config `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing config")]
    Parse(#[source] toml::de::Error),
}
