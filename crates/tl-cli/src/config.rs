//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Text files above this size are skipped unless configured otherwise.
pub const DEFAULT_MAX_TEXT_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Year for timestamps that carry none, when the file itself does not say.
    /// Falls back to the current year.
    pub default_year: Option<i32>,

    /// Parsers to consider, by name. Empty means all of them.
    pub parsers: Vec<String>,

    /// Text files larger than this many bytes are skipped.
    pub max_text_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_year: None,
            parsers: Vec::new(),
            max_text_file_size: DEFAULT_MAX_TEXT_FILE_SIZE,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // TL_DEFAULT_YEAR, TL_MAX_TEXT_FILE_SIZE, ...
        figment = figment.merge(Env::prefixed("TL_"));

        figment.extract()
    }

    /// The year handed to scanners for year-less timestamps.
    pub fn year(&self) -> i32 {
        self.default_year.unwrap_or_else(|| Utc::now().year())
    }
}

/// Returns the platform-specific config directory for tl.
///
/// On Linux: `~/.config/tl`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tl"))
}
