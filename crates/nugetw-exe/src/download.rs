use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

pub const NUGET_EXE_URL: &str = "https://dist.nuget.org/win-x86-commandline/latest/nuget.exe";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_RETRY_DELAYS_SECS: [u64; 3] = [0, 2, 5];

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("failed to build download client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("failed to download nuget.exe from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("nuget.exe download failed with HTTP {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("nuget.exe checksum mismatch: expected {expected_sha256}, got {actual_sha256}")]
    ChecksumMismatch {
        expected_sha256: String,
        actual_sha256: String,
    },
    #[error("failed to write nuget.exe to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches the raw bytes of the nuget binary.
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// [`BinaryFetcher`] over HTTP with the timeout and retry policy for the
/// bootstrap download.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .user_agent(format!("nugetw/{}/bootstrap", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DownloadError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BinaryFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let mut last_error = None;

        for delay_secs in DOWNLOAD_RETRY_DELAYS_SECS {
            if delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }

            match download_once(&self.client, url).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) => {
                    warn!("nuget.exe download attempt failed: {error}");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DownloadError::Status {
            url: url.to_string(),
            status: reqwest::StatusCode::REQUEST_TIMEOUT,
        }))
    }
}

async fn download_once(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, DownloadError> {
    use futures_util::StreamExt;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| DownloadError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let mut bytes = Vec::with_capacity(usize::try_from(total).unwrap_or(0));

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Request {
            url: url.to_string(),
            source,
        })?;
        bytes.extend_from_slice(&chunk);
    }

    debug!("Downloaded {} of {total} bytes from {url}", bytes.len());
    Ok(bytes)
}

fn verify_checksum(binary: &[u8], expected_sha256: &str) -> Result<(), DownloadError> {
    let actual_sha256 = format!("{:x}", Sha256::digest(binary));
    if actual_sha256.eq_ignore_ascii_case(expected_sha256.trim()) {
        return Ok(());
    }

    Err(DownloadError::ChecksumMismatch {
        expected_sha256: expected_sha256.trim().to_ascii_lowercase(),
        actual_sha256,
    })
}

/// Fetch the binary, check the optional pin, and write it to `dest`.
/// Nothing is written when the checksum does not match.
pub(crate) async fn download_to(
    fetcher: &dyn BinaryFetcher,
    url: &str,
    expected_sha256: Option<&str>,
    dest: &Path,
) -> Result<usize, DownloadError> {
    info!("Downloading nuget.exe from {url} to {}", dest.display());

    let binary = fetcher.fetch(url).await?;
    if let Some(expected) = expected_sha256.filter(|pin| !pin.trim().is_empty()) {
        verify_checksum(&binary, expected)?;
    }

    let write_error = |source| DownloadError::Write {
        path: dest.display().to_string(),
        source,
    };
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(dest, &binary).await.map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(write_error)?;
    }

    info!("nuget.exe download complete: {} bytes", binary.len());
    Ok(binary.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(&'static [u8]);

    #[async_trait]
    impl BinaryFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, DownloadError> {
            Ok(self.0.to_vec())
        }
    }

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn verify_checksum_accepts_matching_digest() {
        assert!(verify_checksum(b"abc", ABC_SHA256).is_ok());
        assert!(verify_checksum(b"abc", &ABC_SHA256.to_ascii_uppercase()).is_ok());
    }

    #[test]
    fn verify_checksum_rejects_mismatch() {
        let expected = "0000000000000000000000000000000000000000000000000000000000000000";
        assert!(matches!(
            verify_checksum(b"abc", expected),
            Err(DownloadError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn download_creates_missing_directories() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dest = temp.path().join("NuGet").join("bin").join("nuget.exe");

        let written = download_to(&StaticFetcher(b"abc"), NUGET_EXE_URL, Some(ABC_SHA256), &dest)
            .await
            .expect("download succeeds");

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&dest).expect("read binary"), b"abc");
    }

    #[tokio::test]
    async fn checksum_mismatch_writes_nothing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dest = temp.path().join("nuget.exe");

        let result = download_to(
            &StaticFetcher(b"tampered"),
            NUGET_EXE_URL,
            Some(ABC_SHA256),
            &dest,
        )
        .await;

        assert!(matches!(result, Err(DownloadError::ChecksumMismatch { .. })));
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn downloaded_binary_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let dest = temp.path().join("nuget.exe");

        download_to(&StaticFetcher(b"#!/bin/sh\n"), NUGET_EXE_URL, None, &dest)
            .await
            .expect("download succeeds");

        let mode = std::fs::metadata(&dest).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
