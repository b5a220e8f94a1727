//! Settings for the vwgen command line tool.
//!
//! Settings come from built-in defaults, then an optional YAML settings file,
//! then `VWGEN_*` environment variables, then command line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the network file directory
pub const ENV_DIR: &str = "VWGEN_DIR";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "VWGEN_LOG_LEVEL";
/// Environment variable forcing color on (`1`, `true`) or off
pub const ENV_COLOR: &str = "VWGEN_COLOR";

/// Effective tool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `<network>.conf` files
    pub dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Whether `show` and log output use ANSI colors
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            log_level: "warn".to_string(),
            color: false,
        }
    }
}

/// Settings file layout; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    dir: Option<PathBuf>,
    log_level: Option<String>,
    color: Option<bool>,
}

impl Settings {
    /// Load settings from `path` and the process environment.
    ///
    /// A missing settings file is not an error; a malformed one is.
    pub fn load_from_file<P: AsRef<Path>>(path: P, color_default: bool) -> Result<Self> {
        Self::load_with_env(path.as_ref(), color_default, |key| std::env::var(key).ok())
    }

    fn load_with_env<F>(path: &Path, color_default: bool, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self {
            color: color_default,
            ..Self::default()
        };

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let file: SettingsFile = serde_yaml::from_str(&content)
                    .with_context(|| format!("invalid settings file {:?}", path))?;
                settings.apply_file(file);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("cannot read {:?}", path)),
        }

        settings.apply_environment_overrides(lookup);
        Ok(settings)
    }

    fn apply_file(&mut self, file: SettingsFile) {
        if let Some(dir) = file.dir {
            self.dir = dir;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if let Some(color) = file.color {
            self.color = color;
        }
    }

    /// Apply `VWGEN_*` overrides looked up through `lookup`
    fn apply_environment_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DIR).filter(|d| !d.is_empty()) {
            self.dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.is_empty()) {
            self.log_level = level;
        }
        if let Some(color) = lookup(ENV_COLOR) {
            self.color = matches!(color.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// Apply command line flags, which win over everything else
    pub fn apply_cli(&mut self, dir: Option<PathBuf>, log_level: Option<String>) {
        if let Some(dir) = dir {
            self.dir = dir;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
    }
}
