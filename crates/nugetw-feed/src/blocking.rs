//! Synchronous access to a [`crate::Repository`].
//!
//! The wrapper owns a current-thread runtime, so it must not be used from
//! inside another async runtime.

use std::sync::Arc;

use nugetw_core::{Logger, PackageIdentity, PackageMetadata, VersionRange};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;

pub struct Repository {
    inner: crate::Repository,
    runtime: Runtime,
}

impl Repository {
    /// # Errors
    /// Returns an error if the HTTP client or the runtime cannot be created.
    pub fn new(source_uri: impl Into<String>) -> Result<Self, FeedError> {
        Self::from_async(crate::Repository::new(source_uri)?)
    }

    /// # Errors
    /// Returns an error if the runtime cannot be created.
    pub fn from_async(inner: crate::Repository) -> Result<Self, FeedError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FeedError::Runtime {
                details: e.to_string(),
            })?;
        Ok(Self { inner, runtime })
    }

    #[must_use]
    pub fn inner(&self) -> &crate::Repository {
        &self.inner
    }

    pub fn set_logger(&mut self, logger: Option<Arc<dyn Logger>>) {
        self.inner.set_logger(logger);
    }

    /// # Errors
    /// See [`crate::Repository::get_package`].
    pub fn get_package(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<PackageMetadata>, FeedError> {
        self.runtime
            .block_on(self.inner.get_package(id, version, &CancellationToken::new()))
    }

    /// # Errors
    /// See [`crate::Repository::get_package_identity`].
    pub fn get_package_identity(
        &self,
        identity: &PackageIdentity,
    ) -> Result<Option<PackageMetadata>, FeedError> {
        self.runtime
            .block_on(self.inner.get_package_identity(identity, &CancellationToken::new()))
    }

    /// # Errors
    /// See [`crate::Repository::get_packages`].
    pub fn get_packages(
        &self,
        id: &str,
        include_prerelease: bool,
        include_unlisted: bool,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        self.runtime.block_on(self.inner.get_packages(
            id,
            include_prerelease,
            include_unlisted,
            &CancellationToken::new(),
        ))
    }

    /// # Errors
    /// See [`crate::Repository::get_packages_in_range`].
    pub fn get_packages_in_range(
        &self,
        id: &str,
        range: &VersionRange,
        include_prerelease: bool,
        include_unlisted: bool,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        self.runtime.block_on(self.inner.get_packages_in_range(
            id,
            range,
            include_prerelease,
            include_unlisted,
            &CancellationToken::new(),
        ))
    }

    /// # Errors
    /// See [`crate::Repository::get_packages_in_range_str`].
    pub fn get_packages_in_range_str(
        &self,
        id: &str,
        range: &str,
        include_prerelease: bool,
        include_unlisted: bool,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        self.runtime.block_on(self.inner.get_packages_in_range_str(
            id,
            range,
            include_prerelease,
            include_unlisted,
            &CancellationToken::new(),
        ))
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::Repository")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::resource::MetadataResource;

    struct StaticResource;

    #[async_trait]
    impl MetadataResource for StaticResource {
        async fn get_all_metadata(
            &self,
            package_id: &str,
            _include_prerelease: bool,
            _include_unlisted: bool,
            _logger: &dyn Logger,
            _cancel: &CancellationToken,
        ) -> Result<Vec<PackageMetadata>, FeedError> {
            Ok(["1.0.0", "1.5.0", "2.0.0"]
                .iter()
                .map(|version| {
                    PackageMetadata::new(
                        PackageIdentity::parse(package_id, version).expect("valid identity"),
                    )
                })
                .collect())
        }
    }

    fn repository() -> Repository {
        let inner = crate::Repository::with_resource("https://feed.test", Arc::new(StaticResource));
        Repository::from_async(inner).expect("runtime builds")
    }

    #[test]
    fn blocking_queries_match_async_results() {
        let repo = repository();

        let found = repo
            .get_package("Serilog", "1.5")
            .expect("query succeeds")
            .expect("version present");
        assert_eq!(found.identity.to_string(), "Serilog.1.5.0");

        let ranged = repo
            .get_packages_in_range_str("Serilog", "(1.0,2.0]", true, true)
            .expect("query succeeds");
        assert_eq!(ranged.len(), 2);

        assert_eq!(
            repo.get_packages("Serilog", true, true)
                .expect("query succeeds")
                .len(),
            3
        );
    }

    #[test]
    fn input_errors_surface_synchronously() {
        let repo = repository();

        assert!(matches!(
            repo.get_package("Serilog", "bogus"),
            Err(FeedError::InvalidVersionFormat { .. })
        ));
        assert!(matches!(
            repo.get_packages_in_range_str("Serilog", "(1.0", true, true),
            Err(FeedError::InvalidVersionRange(_))
        ));
    }
}
