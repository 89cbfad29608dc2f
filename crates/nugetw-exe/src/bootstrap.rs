//! Locating, verifying and downloading the nuget binary.
//!
//! A [`NugetExe`] owns the bootstrap state. The first call that needs the
//! binary checks the cached copy and its version, downloading a fresh one
//! when it is missing, unreadable or older than the configured minimum.
//! The state sits behind an async mutex so concurrent first uses wait for a
//! single initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use nugetw_core::PackageVersion;
use nugetw_platform::NUGET_EXE_NAME;
use tokio::sync::Mutex;

use crate::command::{NugetCommand, Verbosity};
use crate::download::{BinaryFetcher, HttpFetcher, NUGET_EXE_URL, download_to};
use crate::error::ExeError;
use crate::executor::{Launcher, finalize_command_line, run};

const VERSION_PREFIX: &str = "NuGet Version:";
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[must_use]
pub fn min_nuget_version() -> PackageVersion {
    PackageVersion::new(4, 3, 0)
}

#[derive(Debug, Clone)]
pub struct ExeConfig {
    /// Directory holding the cached `nuget.exe`.
    pub bin_dir: PathBuf,
    pub min_version: PackageVersion,
    pub download_url: String,
    pub download_sha256: Option<String>,
    /// `None` picks [`Launcher::detect`] on first use.
    pub launcher: Option<Launcher>,
}

impl ExeConfig {
    #[must_use]
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            min_version: min_nuget_version(),
            download_url: NUGET_EXE_URL.to_string(),
            download_sha256: None,
            launcher: None,
        }
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    #[must_use]
    pub fn with_min_version(mut self, version: PackageVersion) -> Self {
        self.min_version = version;
        self
    }

    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    #[must_use]
    pub fn with_download_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.download_sha256 = Some(sha256.into());
        self
    }

    #[must_use]
    pub fn exe_path(&self) -> PathBuf {
        self.bin_dir.join(NUGET_EXE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Downloading,
    BinaryVerified { path: PathBuf },
    Ready { path: PathBuf, launcher: Launcher },
    DownloadFailed { reason: String },
}

pub struct NugetExe {
    config: ExeConfig,
    fetcher: Arc<dyn BinaryFetcher>,
    state: Mutex<BootstrapState>,
}

impl NugetExe {
    /// # Errors
    /// Returns an error if the download client cannot be created.
    pub fn new(config: ExeConfig) -> Result<Self, ExeError> {
        Ok(Self::with_fetcher(config, Arc::new(HttpFetcher::new()?)))
    }

    #[must_use]
    pub fn with_fetcher(config: ExeConfig, fetcher: Arc<dyn BinaryFetcher>) -> Self {
        Self {
            config,
            fetcher,
            state: Mutex::new(BootstrapState::Uninitialized),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExeConfig {
        &self.config
    }

    pub async fn state(&self) -> BootstrapState {
        self.state.lock().await.clone()
    }

    /// Path of the binary commands will run, bootstrapping it if needed.
    ///
    /// # Errors
    /// Returns an error if no launcher is available, the download fails, or
    /// the binary is still missing afterwards.
    pub async fn ensure_ready(&self) -> Result<PathBuf, ExeError> {
        self.ready().await.map(|(path, _)| path)
    }

    async fn ready(&self) -> Result<(PathBuf, Launcher), ExeError> {
        let mut state = self.state.lock().await;
        if let BootstrapState::Ready { path, launcher } = &*state {
            return Ok((path.clone(), launcher.clone()));
        }

        let launcher = match &self.config.launcher {
            Some(launcher) => launcher.clone(),
            None => Launcher::detect()?,
        };
        let cached = self.config.exe_path();

        if cached.exists() {
            match probe_version(&launcher, &cached).await {
                Some(version) if version >= self.config.min_version => {
                    info!("Using nuget {version} at {}", cached.display());
                    transition(
                        &mut state,
                        BootstrapState::BinaryVerified {
                            path: cached.clone(),
                        },
                    );
                    transition(
                        &mut state,
                        BootstrapState::Ready {
                            path: cached.clone(),
                            launcher: launcher.clone(),
                        },
                    );
                    return Ok((cached, launcher));
                }
                Some(version) => info!(
                    "Cached nuget {version} is older than {}, downloading",
                    self.config.min_version
                ),
                None => info!("Could not read version of {}, downloading", cached.display()),
            }
        } else {
            info!("nuget.exe not found at {}, downloading", cached.display());
        }

        transition(&mut state, BootstrapState::Downloading);
        if let Err(e) = download_to(
            self.fetcher.as_ref(),
            &self.config.download_url,
            self.config.download_sha256.as_deref(),
            &cached,
        )
        .await
        {
            transition(
                &mut state,
                BootstrapState::DownloadFailed {
                    reason: e.to_string(),
                },
            );
            return Err(e.into());
        }

        if !cached.exists() {
            transition(
                &mut state,
                BootstrapState::DownloadFailed {
                    reason: format!("{} missing after download", cached.display()),
                },
            );
            return Err(ExeError::BinaryNotFound { path: cached });
        }

        let active = match probe_version(&launcher, &cached).await {
            Some(version) => copy_versioned(&cached, &version).await.unwrap_or(cached),
            None => cached,
        };
        transition(
            &mut state,
            BootstrapState::BinaryVerified {
                path: active.clone(),
            },
        );
        transition(
            &mut state,
            BootstrapState::Ready {
                path: active.clone(),
                launcher: launcher.clone(),
            },
        );
        Ok((active, launcher))
    }

    /// Replace the cached binary with the latest download. Safe to repeat.
    ///
    /// # Errors
    /// Returns an error if the old binary cannot be removed or bootstrapping
    /// the new one fails.
    pub async fn update_client(&self) -> Result<PathBuf, ExeError> {
        {
            let mut state = self.state.lock().await;
            let cached = self.config.exe_path();
            let mut stale = vec![cached.clone()];
            if let BootstrapState::Ready { path, .. } = &*state
                && *path != cached
            {
                stale.push(path.clone());
            }

            for path in stale {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!("Removed {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(ExeError::io_with_path(
                            "failed to remove nuget.exe",
                            &path,
                            &e,
                        ));
                    }
                }
            }
            transition(&mut state, BootstrapState::Uninitialized);
        }

        self.ensure_ready().await
    }

    /// Run nuget with `args`, appending verbosity and config file options.
    ///
    /// # Errors
    /// Returns bootstrap errors, spawn failures, or
    /// [`ExeError::ExternalToolError`] when nuget writes to stderr.
    pub async fn execute(
        &self,
        args: &str,
        config_file: Option<&Path>,
        verbosity: Verbosity,
    ) -> Result<String, ExeError> {
        let (binary, launcher) = self.ready().await?;
        let command_line = finalize_command_line(args, config_file, verbosity);
        run(&launcher, &binary, &command_line).await
    }

    /// Run a typed command with its own config file and verbosity.
    ///
    /// # Errors
    /// See [`Self::execute`].
    pub async fn execute_command<C>(&self, command: &C) -> Result<String, ExeError>
    where
        C: NugetCommand + ?Sized,
    {
        self.execute(
            &command.command_line(),
            command.config_file(),
            command.verbosity(),
        )
        .await
    }
}

impl std::fmt::Debug for NugetExe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NugetExe")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transition(state: &mut BootstrapState, next: BootstrapState) {
    trace!("nuget bootstrap: {state:?} -> {next:?}");
    *state = next;
}

/// Version reported on the `NuGet Version:` line of `help` output.
fn parse_help_version(output: &str) -> Option<PackageVersion> {
    output.lines().find_map(|line| {
        let value = line.trim().strip_prefix(VERSION_PREFIX)?;
        PackageVersion::parse(value.trim()).ok()
    })
}

async fn probe_version(launcher: &Launcher, binary: &Path) -> Option<PackageVersion> {
    let output = tokio::time::timeout(
        VERSION_PROBE_TIMEOUT,
        launcher.build_command(binary, "help").output(),
    )
    .await;

    match output {
        Ok(Ok(output)) => {
            let version = parse_help_version(&String::from_utf8_lossy(&output.stdout));
            debug!("Probed {}: {version:?}", binary.display());
            version
        }
        Ok(Err(e)) => {
            debug!("Failed to run {} for version probe: {e}", binary.display());
            None
        }
        Err(_) => {
            warn!("Version probe of {} timed out", binary.display());
            None
        }
    }
}

/// Copy the fresh binary to `<bin>/<version>/nuget.exe`. Failures only log.
async fn copy_versioned(binary: &Path, version: &PackageVersion) -> Option<PathBuf> {
    let dir = binary.parent()?.join(version.to_string());
    let target = dir.join(NUGET_EXE_NAME);

    let result = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::copy(binary, &target).await
    }
    .await;

    match result {
        Ok(_) => {
            debug!("Copied nuget.exe to {}", target.display());
            Some(target)
        }
        Err(e) => {
            debug!("Could not copy nuget.exe to {}: {e}", target.display());
            None
        }
    }
}
