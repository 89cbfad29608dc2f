use std::path::{Path, PathBuf};
use std::sync::Arc;

use nugetw_platform::{AppPaths, ensure_parent_dir};

use crate::bootstrap::NugetExe;
use crate::command::{NugetCommand, Verbosity};
use crate::error::ExeError;

/// Runs nuget against one `NuGet.config`.
#[derive(Debug, Clone)]
pub struct NugetClient {
    exe: Arc<NugetExe>,
    config_file: PathBuf,
    default_config: bool,
}

impl NugetClient {
    /// Client bound to the per-user `NuGet/NuGet.config`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined or
    /// created.
    pub fn new(exe: Arc<NugetExe>) -> Result<Self, ExeError> {
        let paths = AppPaths::new().map_err(|e| ExeError::Io {
            kind: std::io::ErrorKind::NotFound,
            message: e.to_string(),
        })?;
        let mut client = Self::with_config_file(exe, paths.nuget_config_file)?;
        client.default_config = true;
        Ok(client)
    }

    /// # Errors
    /// Returns an error if the config file's directory cannot be created.
    pub fn with_config_file(
        exe: Arc<NugetExe>,
        config_file: impl Into<PathBuf>,
    ) -> Result<Self, ExeError> {
        let config_file = config_file.into();
        ensure_parent_dir(&config_file)
            .map_err(|e| ExeError::io_with_path("failed to create config directory", &config_file, &e))?;
        Ok(Self {
            exe,
            config_file,
            default_config: false,
        })
    }

    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    #[must_use]
    pub fn is_default_config(&self) -> bool {
        self.default_config
    }

    #[must_use]
    pub fn exe(&self) -> &Arc<NugetExe> {
        &self.exe
    }

    /// # Errors
    /// See [`NugetExe::execute`].
    pub async fn execute(&self, args: &str) -> Result<String, ExeError> {
        self.execute_with_verbosity(args, Verbosity::Normal).await
    }

    /// # Errors
    /// See [`NugetExe::execute`].
    pub async fn execute_with_verbosity(
        &self,
        args: &str,
        verbosity: Verbosity,
    ) -> Result<String, ExeError> {
        self.exe
            .execute(args, Some(&self.config_file), verbosity)
            .await
    }

    /// Run a typed command. The command's own config file wins over the
    /// client's.
    ///
    /// # Errors
    /// See [`NugetExe::execute`].
    pub async fn run<C>(&self, command: &C) -> Result<String, ExeError>
    where
        C: NugetCommand + ?Sized,
    {
        let config_file = command.config_file().unwrap_or(&self.config_file);
        self.exe
            .execute(&command.command_line(), Some(config_file), command.verbosity())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::ExeConfig;
    use crate::executor::Launcher;

    fn exe(bin_dir: &Path) -> Arc<NugetExe> {
        Arc::new(
            NugetExe::new(ExeConfig::new(bin_dir).with_launcher(Launcher::Direct))
                .expect("create exe"),
        )
    }

    #[test]
    fn explicit_config_file_creates_its_directory() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let config = temp.path().join("roaming").join("NuGet").join("NuGet.config");

        let client = NugetClient::with_config_file(exe(temp.path()), &config).expect("client");

        assert!(config.parent().expect("parent").is_dir());
        assert!(!config.exists());
        assert_eq!(client.config_file(), config);
        assert!(!client.is_default_config());
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        use crate::command::UpdateCommand;

        fn install_echo(bin_dir: &Path) {
            let path = bin_dir.join("nuget.exe");
            std::fs::write(
                &path,
                "#!/bin/sh\nif [ \"$1\" = help ]; then echo 'NuGet Version: 6.0.0'; exit 0; fi\necho \"$*\"\n",
            )
            .expect("write binary");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod binary");
        }

        #[tokio::test]
        async fn raw_commands_use_the_client_config() {
            let temp = tempfile::tempdir().expect("create temp dir");
            install_echo(temp.path());
            let config = temp.path().join("NuGet.config");
            let client = NugetClient::with_config_file(exe(temp.path()), &config).expect("client");

            let output = client
                .execute_with_verbosity("sources list", Verbosity::Detailed)
                .await
                .expect("execute succeeds");

            assert_eq!(
                output.trim(),
                format!("sources list -Verbosity detailed -ConfigFile {}", config.display())
            );
        }

        #[tokio::test]
        async fn command_config_overrides_client_config() {
            let temp = tempfile::tempdir().expect("create temp dir");
            install_echo(temp.path());
            let client = NugetClient::with_config_file(exe(temp.path()), temp.path().join("a.config"))
                .expect("client");
            let command = UpdateCommand::for_target("packages.config").with_config_file("/etc/b.config");

            let output = client.run(&command).await.expect("execute succeeds");

            assert_eq!(
                output.trim(),
                "update packages.config -NonInteractive -ConfigFile /etc/b.config"
            );
        }
    }
}
