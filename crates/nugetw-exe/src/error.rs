use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::download::DownloadError;

#[derive(Error, Debug)]
pub enum ExeError {
    #[error("nuget.exe not found at {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("nuget.exe reported an error: {stderr}")]
    ExternalToolError { stderr: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("'{program}' is required to run nuget.exe but was not found on PATH")]
    LauncherNotFound { program: &'static str },
}

impl ExeError {
    pub fn io_with_path(context: &str, path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: format!("{context} ({}): {error}", path.display()),
        }
    }
}

impl From<std::io::Error> for ExeError {
    fn from(err: std::io::Error) -> Self {
        ExeError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::ExeError;

    #[test]
    fn io_error_conversion_keeps_kind() {
        let mapped = ExeError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        assert!(
            matches!(mapped, ExeError::Io { kind, ref message } if kind == std::io::ErrorKind::PermissionDenied && message.contains("access denied"))
        );
    }

    #[test]
    fn io_with_path_names_the_file() {
        let error = ExeError::io_with_path(
            "failed to delete binary",
            Path::new("/cache/nuget.exe"),
            &std::io::Error::other("busy"),
        );
        assert_eq!(
            error.to_string(),
            "IO error (other error): failed to delete binary (/cache/nuget.exe): busy"
        );
    }

    #[test]
    fn external_tool_error_carries_stderr() {
        let error = ExeError::ExternalToolError {
            stderr: "Unable to find package 'Nope'".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "nuget.exe reported an error: Unable to find package 'Nope'"
        );
    }
}
