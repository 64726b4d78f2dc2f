//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lm_core::product::DEFAULT_PRODUCTS;
use lm_core::{DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS, TrackedProducts, ValidationError};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Products whose usage is stored; everything else in a report is dropped.
    pub products: Vec<String>,

    /// Command line that prints the license manager status report.
    pub status_command: Vec<String>,

    /// Seconds to wait for the status command before giving up.
    pub status_timeout_secs: u64,

    /// Days of history covered by summaries.
    pub history_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("lmstat.db"),
            products: DEFAULT_PRODUCTS.iter().map(|p| (*p).to_string()).collect(),
            status_command: [
                "/usr/local/MATLAB/R2011b/etc/glnx86/lmutil",
                "lmstat",
                "-c",
                "/usr/local/MATLAB/R2011b/licenses/network.lic",
                "-a",
            ]
            .iter()
            .map(|arg| (*arg).to_string())
            .collect(),
            status_timeout_secs: 30,
            history_days: DEFAULT_HISTORY_DAYS,
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

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (LMSTAT_*)
        figment = figment.merge(Env::prefixed("LMSTAT_"));

        let config: Self = figment.extract()?;
        if !(1..=MAX_HISTORY_DAYS).contains(&config.history_days) {
            return Err(figment::Error::from(format!(
                "history_days must be between 1 and {MAX_HISTORY_DAYS}, got {}",
                config.history_days
            )));
        }
        Ok(config)
    }

    /// The configured product list as a validated tracked set.
    pub fn tracked_products(&self) -> Result<TrackedProducts, ValidationError> {
        TrackedProducts::from_names(self.products.iter().cloned())
    }

    pub const fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

/// Returns the platform-specific config directory for lmstat.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lmstat"))
}

/// Returns the platform-specific data directory for lmstat.
///
/// On Linux: `~/.local/share/lmstat`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("lmstat"))
}
