use nugetw_core::RangeParseError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Invalid package version: '{input}'")]
    InvalidVersionFormat { input: String },

    #[error(transparent)]
    InvalidVersionRange(#[from] RangeParseError),

    #[error("Network error during {operation}: {details}")]
    Network {
        operation: &'static str,
        details: String,
    },

    #[error("Failed to parse response during {operation}: {details}")]
    Parse {
        operation: &'static str,
        details: String,
    },

    #[error("Feed {source_uri} has no registration resource")]
    ResourceNotFound { source_uri: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to start async runtime: {details}")]
    Runtime { details: String },
}

impl FeedError {
    pub fn invalid_version(input: impl Into<String>) -> Self {
        Self::InvalidVersionFormat {
            input: input.into(),
        }
    }

    pub fn network_request(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Network {
            operation,
            details: details.into(),
        }
    }

    pub fn network_request_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_request(operation, error.to_string())
    }

    pub fn parse_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Parse {
            operation,
            details: error.to_string(),
        }
    }
}
