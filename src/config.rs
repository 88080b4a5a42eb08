/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Host configuration.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::PathBuf;

use crate::logging::DEFAULT_MAX_LOG_BYTES;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "vibeide";

/// Host settings layered from defaults, config files and `VIBEIDE_*` variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Where settings and logs live (default: platform data dir + "vibeide")
    pub data_dir: Option<PathBuf>,

    /// Filter for the stderr log layer, in `EnvFilter` syntax (default: "info")
    pub log_level: String,

    /// Size at which the log file is rotated (default: 10 MiB)
    pub log_max_bytes: u64,

    /// Initial window geometry written into fresh settings documents
    pub window: WindowDefaults,

    /// Terminal defaults written into fresh settings documents
    pub terminal: TerminalDefaults,
}

/// Machine-dependent values the default settings document is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentDefaults {
    /// Window geometry.
    pub window: WindowDefaults,
    /// Terminal shell.
    pub terminal: TerminalDefaults,
}

/// Initial window geometry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WindowDefaults {
    /// Width in logical pixels.
    pub width: u32,
    /// Height in logical pixels.
    pub height: u32,
}

/// Terminal defaults.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TerminalDefaults {
    /// Shell executable.
    pub shell: String,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 900,
        }
    }
}

impl Default for TerminalDefaults {
    fn default() -> Self {
        let shell = if cfg!(windows) { "cmd.exe" } else { "bash" };
        Self {
            shell: shell.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: "info".to_string(),
            log_max_bytes: DEFAULT_MAX_LOG_BYTES,
            window: WindowDefaults::default(),
            terminal: TerminalDefaults::default(),
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or holds values of the
    /// wrong type.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("log_level", "info")?
            .set_default("log_max_bytes", DEFAULT_MAX_LOG_BYTES)?;

        // 2. Load from user config directory (~/.config/vibeide/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (VIBEIDE_DATA_DIR, VIBEIDE_WINDOW__WIDTH, etc.)
        builder = builder.add_source(
            config::Environment::with_prefix("VIBEIDE")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Resolved data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the platform has no
    /// data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| anyhow!("No data directory available; set VIBEIDE_DATA_DIR"))
    }

    /// Location of the settings document.
    ///
    /// # Errors
    ///
    /// See [`Config::data_dir`].
    pub fn settings_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("settings.json"))
    }

    /// Location of the live log file.
    ///
    /// # Errors
    ///
    /// See [`Config::data_dir`].
    pub fn log_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("logs").join("app.log"))
    }

    /// Values the default settings document is derived from.
    #[must_use]
    pub fn environment(&self) -> EnvironmentDefaults {
        EnvironmentDefaults {
            window: self.window.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_file_overrides_defaults() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("host.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/vibeide\"\nlog_max_bytes = 2048\n\n[window]\nwidth = 800\n",
        )?;

        let config = Config::load(Some(path))?;

        assert_eq!(config.data_dir()?, PathBuf::from("/srv/vibeide"));
        assert_eq!(config.log_max_bytes, 2048);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 900);
        assert_eq!(
            config.log_path()?,
            PathBuf::from("/srv/vibeide/logs/app.log")
        );
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.environment(), EnvironmentDefaults::default());
    }
}
