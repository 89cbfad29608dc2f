use nugetw_core::VersionParseError;
use nugetw_exe::ExeError;
use nugetw_feed::FeedError;
use nugetw_platform::AppPathsError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Exe(#[from] ExeError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("invalid min_version {input:?} in settings: {source}")]
    MinVersion {
        input: String,
        #[source]
        source: VersionParseError,
    },

    #[error("package {id} {version} was not found on {feed}")]
    PackageNotFound {
        id: String,
        version: String,
        feed: String,
    },

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::MinVersion { .. } => 2,
            Self::PackageNotFound { .. } => 3,
            Self::Feed(FeedError::Cancelled) => 130,
            _ => 1,
        }
    }
}
