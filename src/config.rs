// Configuration loaded from ~/.trendline/rc
//
// The rc file is a plain `key=value` line file:
//
//     # where the build ledger lives (relative paths resolve against this file)
//     data.location=./builds.db
//     # how many recent builds feed the trend engine
//     history.depth=50

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Number of most recent builds consulted when no depth is configured
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_location: PathBuf,
    pub history_depth: usize,
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn home_dir() -> PathBuf {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".trendline")
    }

    /// Get the configuration file path
    pub fn rc_path() -> PathBuf {
        Self::home_dir().join("rc")
    }

    /// Get the default database path
    pub fn default_data_location() -> PathBuf {
        Self::home_dir().join("builds.db")
    }

    /// Load configuration from the rc file, falling back to defaults
    pub fn load() -> Result<Self> {
        let rc_path = Self::rc_path();
        if !rc_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&rc_path)
            .with_context(|| format!("Failed to read config file: {}", rc_path.display()))?;
        let rc_dir = rc_path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, rc_dir)
    }

    /// Parse rc content. Relative data locations resolve against `rc_dir`.
    pub fn parse(content: &str, rc_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                log::warn!("Ignoring malformed config line {}: {}", line_no + 1, line);
                continue;
            };

            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value.trim());
                    config.data_location = if path.is_relative() {
                        rc_dir.join(path)
                    } else {
                        path
                    };
                }
                "history.depth" => {
                    config.history_depth = value.trim().parse::<usize>()
                        .ok()
                        .filter(|depth| *depth > 0)
                        .with_context(|| format!(
                            "Invalid history.depth '{}' on line {}: must be a positive integer",
                            value.trim(), line_no + 1
                        ))?;
                }
                other => log::warn!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: Self::default_data_location(),
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}
