// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Log file path (defaults to log_YYYYMMDD.txt)
    pub log_file: Option<String>,

    /// Echo messages to the console as well as the log
    pub echo: Option<bool>,

    /// Hold an advisory lock on the log file while writing each block
    pub lock_writes: Option<bool>,

    /// Record the conda package list in the header when available
    pub capture_packages: Option<bool>,
}

impl Config {
    /// Load config from a file, or return default if file doesn't exist
    pub fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Merge a config value with a CLI arg, where the CLI arg takes precedence
    pub fn merge_with_cli<T>(cli_value: T, config_value: Option<T>, default_value: T) -> T
    where
        T: PartialEq + Clone,
    {
        if cli_value != default_value {
            cli_value
        } else if let Some(config_val) = config_value {
            config_val
        } else {
            default_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("textlog.toml")).unwrap();
        assert!(config.log_file.is_none());
        assert!(config.echo.is_none());
    }

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("textlog.toml");
        fs::write(
            &path,
            "log_file = \"nightly.log\"\necho = true\ncapture_packages = false\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_file.as_deref(), Some("nightly.log"));
        assert_eq!(config.echo, Some(true));
        assert_eq!(config.lock_writes, None);
        assert_eq!(config.capture_packages, Some(false));
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("textlog.toml");
        fs::write(&path, "echo = \"loud\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_precedence() {
        let config = Config {
            echo: Some(true),
            ..Default::default()
        };

        // CLI flag left at default: config wins
        assert!(Config::merge_with_cli(false, config.echo, false));
        // nothing configured: default
        assert!(!Config::merge_with_cli(false, config.lock_writes, false));
        // CLI flag set: CLI wins
        assert!(Config::merge_with_cli(true, Some(false), false));
    }
}
