use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NUGET_EXE_NAME: &str = "nuget.exe";

const NUGET_DIR: &str = "NuGet";
const NUGET_CONFIG_NAME: &str = "NuGet.config";
const APP_DIR: &str = "nugetw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine local data directory")]
    LocalDataDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Locations shared by the wrapper and the tool it drives.
///
/// `bin_dir` and `nuget_config_file` follow the layout nuget itself uses
/// (`%LocalAppData%\NuGet\bin` and `%AppData%\NuGet\NuGet.config` on
/// Windows, the XDG equivalents elsewhere). `config_dir` and `data_dir`
/// belong to nugetw.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub bin_dir: PathBuf,
    pub nuget_config_file: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build paths for the current platform.
    ///
    /// # Errors
    /// Returns an error when one of the user base directories cannot be
    /// determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let local_data = dirs::data_local_dir().ok_or(AppPathsError::LocalDataDirUnavailable)?;
        let config = dirs::config_dir().ok_or(AppPathsError::ConfigDirUnavailable)?;
        let data = dirs::data_dir().ok_or(AppPathsError::DataDirUnavailable)?;

        Ok(Self {
            bin_dir: local_data.join(NUGET_DIR).join("bin"),
            nuget_config_file: config.join(NUGET_DIR).join(NUGET_CONFIG_NAME),
            config_dir: config.join(APP_DIR),
            data_dir: data.join(APP_DIR),
        })
    }

    #[must_use]
    pub fn nuget_exe(&self) -> PathBuf {
        self.bin_dir.join(NUGET_EXE_NAME)
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// Ensure the nugetw-owned directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// Create the directory that will hold `file` if it is missing.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            log::debug!("Creating directory {}", parent.display());
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}
