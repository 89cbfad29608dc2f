use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nugetw_exe::{NUGET_EXE_URL, Verbosity};
use nugetw_feed::{DEFAULT_FEED_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use nugetw_platform::AppPaths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Overrides the per-user `NuGet/NuGet.config`.
    #[serde(default)]
    pub nuget_config_file: Option<PathBuf>,

    /// Overrides the cache directory for `nuget.exe`.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,

    #[serde(default = "default_min_version")]
    pub min_version: String,

    #[serde(default = "default_download_url")]
    pub download_url: String,

    #[serde(default)]
    pub download_sha256: Option<String>,

    #[serde(default)]
    pub verbosity: Verbosity,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_min_version() -> String {
    nugetw_exe::min_nuget_version().to_string()
}

fn default_download_url() -> String {
    NUGET_EXE_URL.to_string()
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            nuget_config_file: None,
            bin_dir: None,
            min_version: default_min_version(),
            download_url: default_download_url(),
            download_sha256: None,
            verbosity: Verbosity::Normal,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl CliSettings {
    /// Settings from the per-user settings file. A missing file is created
    /// with defaults; an unreadable one yields defaults.
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            let settings = Self::default();
            if let Err(e) = settings.save_to(&settings_path) {
                log::debug!("Could not write default settings: {e}");
            }
            return settings;
        }

        Self::load_from(&settings_path)
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid settings in {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        nugetw_platform::ensure_parent_dir(path)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
