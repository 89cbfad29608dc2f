use std::path::{Path, PathBuf};

use log::{debug, error, info, trace};
use nugetw_platform::{HideWindow, quote_arg, split_command_line};
use tokio::process::Command;

use crate::command::Verbosity;
use crate::error::ExeError;

/// How the nuget binary is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Run the binary itself. On Windows the command line is passed through
    /// verbatim.
    Native,
    /// Run the binary through the Mono runtime.
    Mono { program: PathBuf },
    /// Run the binary itself with the command line split into argv tokens.
    Direct,
}

impl Launcher {
    /// `Native` on Windows, `Mono` elsewhere.
    ///
    /// # Errors
    /// Returns [`ExeError::LauncherNotFound`] if `mono` is not on `PATH`.
    pub fn detect() -> Result<Self, ExeError> {
        if cfg!(windows) {
            return Ok(Self::Native);
        }
        which::which("mono")
            .map(|program| Self::Mono { program })
            .map_err(|_| ExeError::LauncherNotFound { program: "mono" })
    }

    pub(crate) fn build_command(&self, binary: &Path, command_line: &str) -> Command {
        let mut cmd = match self {
            Self::Native => {
                let mut cmd = Command::new(binary);
                pass_command_line(&mut cmd, command_line);
                cmd
            }
            Self::Mono { program } => {
                debug!("Launching {} through {}", binary.display(), program.display());
                let mut cmd = Command::new(program);
                cmd.arg(binary);
                cmd.args(split_command_line(command_line));
                cmd
            }
            Self::Direct => {
                let mut cmd = Command::new(binary);
                cmd.args(split_command_line(command_line));
                cmd
            }
        };
        cmd.hide_window();
        cmd
    }
}

#[cfg(windows)]
fn pass_command_line(cmd: &mut Command, command_line: &str) {
    cmd.raw_arg(command_line);
}

#[cfg(not(windows))]
fn pass_command_line(cmd: &mut Command, command_line: &str) {
    cmd.args(split_command_line(command_line));
}

/// Append the executor-owned options to a rendered command line.
#[must_use]
pub fn finalize_command_line(
    args: &str,
    config_file: Option<&Path>,
    verbosity: Verbosity,
) -> String {
    let mut command_line = args.trim().to_string();
    if let Some(level) = verbosity.as_arg() {
        command_line.push_str(" -Verbosity ");
        command_line.push_str(level);
    }
    if let Some(path) = config_file.filter(|path| !path.as_os_str().is_empty()) {
        command_line.push_str(" -ConfigFile ");
        command_line.push_str(&quote_arg(&path.to_string_lossy()));
    }
    command_line
}

/// Run one nuget process and collect its output.
///
/// Any non-blank stderr is a failure, whatever the exit code.
pub(crate) async fn run(
    launcher: &Launcher,
    binary: &Path,
    command_line: &str,
) -> Result<String, ExeError> {
    info!("Executing nuget command: {command_line}");

    let output = launcher
        .build_command(binary, command_line)
        .output()
        .await
        .map_err(|e| ExeError::io_with_path("failed to start nuget", binary, &e))?;

    debug!("nuget exit status: {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    trace!("nuget stdout: {stdout}");

    if !stderr.trim().is_empty() {
        error!("nuget command failed: {command_line}, stderr='{}'", stderr.trim());
        return Err(ExeError::ExternalToolError { stderr });
    }

    debug!("nuget command succeeded, output: {} bytes", stdout.len());
    Ok(stdout)
}
