use async_trait::async_trait;
use nugetw_core::{Logger, PackageIdentity, PackageMetadata};
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;

/// Source of package metadata for a single feed.
#[async_trait]
pub trait MetadataResource: Send + Sync {
    /// Every entry the feed knows for `package_id`, in feed order.
    async fn get_all_metadata(
        &self,
        package_id: &str,
        include_prerelease: bool,
        include_unlisted: bool,
        logger: &dyn Logger,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageMetadata>, FeedError>;

    /// Metadata for one exact version, or `None` when the feed lacks it.
    /// Unlisted and prerelease versions are still found.
    async fn get_metadata(
        &self,
        identity: &PackageIdentity,
        logger: &dyn Logger,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageMetadata>, FeedError> {
        let entries = self
            .get_all_metadata(&identity.id, true, true, logger, cancel)
            .await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.identity.version == identity.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nugetw_core::NullLogger;

    struct FixedResource {
        entries: Vec<PackageMetadata>,
    }

    #[async_trait]
    impl MetadataResource for FixedResource {
        async fn get_all_metadata(
            &self,
            _package_id: &str,
            _include_prerelease: bool,
            _include_unlisted: bool,
            _logger: &dyn Logger,
            _cancel: &CancellationToken,
        ) -> Result<Vec<PackageMetadata>, FeedError> {
            Ok(self.entries.clone())
        }
    }

    fn entry(version: &str) -> PackageMetadata {
        PackageMetadata::new(PackageIdentity::parse("jQuery", version).expect("valid identity"))
    }

    #[tokio::test]
    async fn default_single_lookup_matches_normalized_version() {
        let resource = FixedResource {
            entries: vec![entry("1.11"), entry("3.1.0")],
        };
        let identity = PackageIdentity::parse("jquery", "3.1").expect("valid identity");

        let found = resource
            .get_metadata(&identity, &NullLogger, &CancellationToken::new())
            .await
            .expect("lookup succeeds")
            .expect("version present");

        assert_eq!(found.identity.version.to_string(), "3.1.0");
    }

    #[tokio::test]
    async fn default_single_lookup_returns_none_when_missing() {
        let resource = FixedResource {
            entries: vec![entry("1.11")],
        };
        let identity = PackageIdentity::parse("jQuery", "2.0").expect("valid identity");

        let found = resource
            .get_metadata(&identity, &NullLogger, &CancellationToken::new())
            .await
            .expect("lookup succeeds");

        assert!(found.is_none());
    }
}
