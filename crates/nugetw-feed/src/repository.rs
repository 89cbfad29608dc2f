use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nugetw_core::{
    FilterVersionsExt, Logger, NullLogger, PackageIdentity, PackageMetadata, PackageVersion,
    VersionRange,
};
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;
use crate::registration::RegistrationResource;
use crate::resource::MetadataResource;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Metadata queries against one package source.
///
/// Every query checks its inputs before touching the feed and fails with
/// [`FeedError::Cancelled`] once `cancel` fires.
pub struct Repository {
    source_uri: String,
    resource: Arc<dyn MetadataResource>,
    logger: Arc<dyn Logger>,
}

impl Repository {
    /// Repository over the registration documents of a v3 feed.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(source_uri: impl Into<String>) -> Result<Self, FeedError> {
        Self::with_timeout(source_uri, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(
        source_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .user_agent(concat!("nugetw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::network_request_from("HTTP client setup", e))?;
        Ok(Self::with_http(source_uri, http))
    }

    #[must_use]
    pub fn with_http(source_uri: impl Into<String>, http: reqwest::Client) -> Self {
        let source_uri = source_uri.into();
        let resource = Arc::new(RegistrationResource::new(source_uri.clone(), http));
        Self::with_resource(source_uri, resource)
    }

    #[must_use]
    pub fn with_resource(
        source_uri: impl Into<String>,
        resource: Arc<dyn MetadataResource>,
    ) -> Self {
        Self {
            source_uri: source_uri.into(),
            resource,
            logger: Arc::new(NullLogger),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// `None` restores the silent default.
    pub fn set_logger(&mut self, logger: Option<Arc<dyn Logger>>) {
        self.logger = logger.unwrap_or_else(|| Arc::new(NullLogger));
    }

    #[must_use]
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    #[must_use]
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    /// Metadata for `id` at `version`, or `None` when the feed lacks it.
    ///
    /// # Errors
    /// Fails with [`FeedError::InvalidVersionFormat`] for a blank or
    /// unparsable version, before any feed request.
    pub async fn get_package(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageMetadata>, FeedError> {
        let version = version.trim();
        if version.is_empty() {
            return Err(FeedError::invalid_version(""));
        }
        let version =
            PackageVersion::parse(version).map_err(|_| FeedError::invalid_version(version))?;

        self.get_package_identity(&PackageIdentity::new(id, version), cancel)
            .await
    }

    /// # Errors
    /// Returns feed errors from the underlying resource.
    pub async fn get_package_identity(
        &self,
        identity: &PackageIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageMetadata>, FeedError> {
        log::debug!("Fetching metadata for {identity} from {}", self.source_uri);
        guarded(
            cancel,
            self.resource
                .get_metadata(identity, self.logger.as_ref(), cancel),
        )
        .await
    }

    /// # Errors
    /// Returns feed errors from the underlying resource.
    pub async fn get_packages(
        &self,
        id: &str,
        include_prerelease: bool,
        include_unlisted: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        log::debug!(
            "Fetching all versions of {id} from {} (prerelease: {include_prerelease}, unlisted: {include_unlisted})",
            self.source_uri
        );
        guarded(
            cancel,
            self.resource.get_all_metadata(
                id,
                include_prerelease,
                include_unlisted,
                self.logger.as_ref(),
                cancel,
            ),
        )
        .await
    }

    /// # Errors
    /// Returns feed errors from the underlying resource.
    pub async fn get_packages_in_range(
        &self,
        id: &str,
        range: &VersionRange,
        include_prerelease: bool,
        include_unlisted: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        let all = self
            .get_packages(id, include_prerelease, include_unlisted, cancel)
            .await?;
        Ok(all.into_iter().filter_versions(range).collect())
    }

    /// Like [`Self::get_packages_in_range`] with a range expression such as
    /// `[1.11,3.1)`.
    ///
    /// # Errors
    /// Fails with [`FeedError::InvalidVersionRange`] for a malformed
    /// expression, before any feed request.
    pub async fn get_packages_in_range_str(
        &self,
        id: &str,
        range: &str,
        include_prerelease: bool,
        include_unlisted: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        let range = VersionRange::parse(range)?;
        self.get_packages_in_range(id, &range, include_prerelease, include_unlisted, cancel)
            .await
    }
}

async fn guarded<T, F>(cancel: &CancellationToken, query: F) -> Result<T, FeedError>
where
    F: Future<Output = Result<T, FeedError>>,
{
    if cancel.is_cancelled() {
        return Err(FeedError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FeedError::Cancelled),
        result = query => result,
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("source_uri", &self.source_uri)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use nugetw_core::{EventLogger, LogLevel};

    struct MockResource {
        versions: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl MockResource {
        fn new(versions: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                versions,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataResource for MockResource {
        async fn get_all_metadata(
            &self,
            package_id: &str,
            include_prerelease: bool,
            _include_unlisted: bool,
            logger: &dyn Logger,
            _cancel: &CancellationToken,
        ) -> Result<Vec<PackageMetadata>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            logger.log_information(&format!("  GET mock/{package_id}"));
            Ok(self
                .versions
                .iter()
                .map(|version| {
                    PackageMetadata::new(
                        PackageIdentity::parse(package_id, version).expect("valid identity"),
                    )
                })
                .filter(|entry| include_prerelease || !entry.identity.version.is_prerelease())
                .collect())
        }
    }

    struct StalledResource;

    #[async_trait]
    impl MetadataResource for StalledResource {
        async fn get_all_metadata(
            &self,
            _package_id: &str,
            _include_prerelease: bool,
            _include_unlisted: bool,
            _logger: &dyn Logger,
            _cancel: &CancellationToken,
        ) -> Result<Vec<PackageMetadata>, FeedError> {
            std::future::pending().await
        }
    }

    fn repository(resource: &Arc<MockResource>) -> Repository {
        Repository::with_resource("https://feed.test/v3/index.json", resource.clone())
    }

    fn versions(entries: &[PackageMetadata]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| entry.identity.version.to_string())
            .collect()
    }

    #[tokio::test]
    async fn invalid_version_fails_without_feed_call() {
        let resource = MockResource::new(vec!["1.0.0"]);
        let repo = repository(&resource);
        let cancel = CancellationToken::new();

        let error = repo
            .get_package("jQuery", "not-a-version", &cancel)
            .await
            .expect_err("invalid version");
        assert_eq!(error, FeedError::invalid_version("not-a-version"));

        let error = repo
            .get_package("jQuery", "   ", &cancel)
            .await
            .expect_err("blank version");
        assert_eq!(error, FeedError::invalid_version(""));

        assert_eq!(resource.calls(), 0);
    }

    #[tokio::test]
    async fn single_package_lookup_delegates_to_resource() {
        let resource = MockResource::new(vec!["1.11.0", "3.1.0"]);
        let repo = repository(&resource);

        let found = repo
            .get_package("jQuery", "3.1", &CancellationToken::new())
            .await
            .expect("query succeeds");
        let missing = repo
            .get_package("jQuery", "2.0", &CancellationToken::new())
            .await
            .expect("query succeeds");

        assert_eq!(
            found.map(|entry| entry.identity.version.to_string()),
            Some("3.1.0".to_string())
        );
        assert!(missing.is_none());
        assert_eq!(resource.calls(), 2);
    }

    #[tokio::test]
    async fn range_queries_filter_fetched_entries() {
        let resource = MockResource::new(vec!["1.10.2", "1.11", "2.2.4", "3.0.9", "3.1.0"]);
        let repo = repository(&resource);
        let cancel = CancellationToken::new();

        let by_str = repo
            .get_packages_in_range_str("jQuery", "[1.11,3.1)", false, false, &cancel)
            .await
            .expect("query succeeds");
        let range = VersionRange::between("1.11", "3.1", true, false).expect("valid bounds");
        let by_range = repo
            .get_packages_in_range("jQuery", &range, false, false, &cancel)
            .await
            .expect("query succeeds");

        assert_eq!(versions(&by_str), vec!["1.11.0", "2.2.4", "3.0.9"]);
        assert_eq!(versions(&by_str), versions(&by_range));
    }

    #[tokio::test]
    async fn invalid_range_fails_without_feed_call() {
        let resource = MockResource::new(vec!["1.0.0"]);
        let repo = repository(&resource);

        let error = repo
            .get_packages_in_range_str("jQuery", "[1.11,3.1", true, true, &CancellationToken::new())
            .await
            .expect_err("malformed range");

        assert!(matches!(error, FeedError::InvalidVersionRange(_)));
        assert_eq!(resource.calls(), 0);
    }

    #[tokio::test]
    async fn prerelease_flag_reaches_resource() {
        let resource = MockResource::new(vec!["1.0.0", "2.0.0-beta"]);
        let repo = repository(&resource);
        let cancel = CancellationToken::new();

        let stable = repo
            .get_packages("jQuery", false, false, &cancel)
            .await
            .expect("query succeeds");
        let all = repo
            .get_packages("jQuery", true, false, &cancel)
            .await
            .expect("query succeeds");

        assert_eq!(versions(&stable), vec!["1.0.0"]);
        assert_eq!(versions(&all), vec!["1.0.0", "2.0.0-beta"]);
    }

    #[tokio::test]
    async fn resource_logs_reach_the_repository_logger() {
        let resource = MockResource::new(vec!["1.0.0"]);
        let logger = Arc::new(EventLogger::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        logger.subscribe(move |event| sink.lock().expect("events lock").push(event.clone()));
        let repo = repository(&resource).with_logger(logger);

        repo.get_packages("jQuery", true, true, &CancellationToken::new())
            .await
            .expect("query succeeds");

        let events = events.lock().expect("events lock");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Information);
        assert_eq!(events[0].message, "  GET mock/jQuery");
    }

    #[tokio::test]
    async fn clearing_logger_restores_silent_default() {
        let resource = MockResource::new(vec!["1.0.0"]);
        let logger = Arc::new(EventLogger::new());
        let receiver = logger.subscribe_channel();
        let mut repo = repository(&resource).with_logger(logger);

        repo.set_logger(None);
        repo.get_packages("jQuery", true, true, &CancellationToken::new())
            .await
            .expect("query succeeds");

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_query() {
        let repo = Repository::with_resource("https://feed.test", Arc::new(StalledResource));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let error = repo
            .get_packages("jQuery", true, true, &cancel)
            .await
            .expect_err("cancelled");

        assert_eq!(error, FeedError::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_feed_call() {
        let resource = MockResource::new(vec!["1.0.0"]);
        let repo = repository(&resource);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = repo
            .get_package("jQuery", "1.0.0", &cancel)
            .await
            .expect_err("cancelled");

        assert_eq!(error, FeedError::Cancelled);
        assert_eq!(resource.calls(), 0);
    }
}
