//! Engine tuning constants.
//!
//! Every constant has a default matching the values the engine was tuned with;
//! with the `config` feature they can be overridden from a TOML file.

use crate::error::{LinescopeError, Result};
use std::time::Duration;

/// Tunable sizes and intervals shared by the document and its worker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    /// Bytes read from the file per scanner block
    pub block_size: usize,

    /// Records or matches accumulated before a batch is flushed
    pub notify_per_line: usize,

    /// Maximum number of decoded lines kept in the line cache
    pub line_cache_capacity: usize,

    /// Tail-follow poll interval in milliseconds
    pub watch_poll_interval_ms: u64,

    /// Block size used by tail-follow scans
    pub watch_block_size: usize,

    /// Batch size used by tail-follow scans
    pub watch_notify_per_line: usize,

    /// Occurrence cap used when a caller does not supply one
    pub default_max_occurrences: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: 1_000_000,
            notify_per_line: 1_000,
            line_cache_capacity: 500,
            watch_poll_interval_ms: 1_000,
            watch_block_size: 1_000_000,
            watch_notify_per_line: 1_000,
            default_max_occurrences: 500,
        }
    }
}

impl EngineConfig {
    /// Poll interval as a `Duration`
    pub fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }

    /// Check that no size is zero.
    pub fn validated(self) -> Result<Self> {
        let checks = [
            ("block_size", self.block_size),
            ("notify_per_line", self.notify_per_line),
            ("line_cache_capacity", self.line_cache_capacity),
            ("watch_block_size", self.watch_block_size),
            ("watch_notify_per_line", self.watch_notify_per_line),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(LinescopeError::config(format!("{name} must be positive")));
            }
        }
        if self.watch_poll_interval_ms == 0 {
            return Err(LinescopeError::config(
                "watch_poll_interval_ms must be positive",
            ));
        }
        Ok(self)
    }
}

#[cfg(feature = "config")]
impl EngineConfig {
    /// Parse a configuration from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| LinescopeError::config(e.to_string()))?;
        config.validated()
    }

    /// Load a configuration file from disk.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LinescopeError::file_error("Failed to read configuration file", e))?;
        Self::from_toml_str(&text)
    }

    /// `<config_dir>/linescope/config.toml`, if the platform has a config directory.
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("linescope").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.block_size, 1_000_000);
        assert_eq!(config.notify_per_line, 1_000);
        assert_eq!(config.line_cache_capacity, 500);
        assert_eq!(config.watch_poll_interval(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = EngineConfig {
            block_size: 0,
            ..EngineConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("block_size"));

        let config = EngineConfig {
            watch_poll_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("block_size = 4096\n").unwrap();
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.notify_per_line, 1_000);
    }
}
