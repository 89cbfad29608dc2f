//! Package metadata read from a feed's registration documents.
//!
//! Only three documents are touched: the service index at the source URI,
//! the registration index for a package id, and any registration pages the
//! index does not inline.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use nugetw_core::{
    DependencyGroup, Logger, PackageDependency, PackageIdentity, PackageMetadata,
    VersionParseError,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;
use crate::resource::MetadataResource;

pub const DEFAULT_FEED_URL: &str = "https://api.nuget.org/v3/index.json";

/// Registration resource types, most preferred first. The first two serve
/// SemVer 2.0.0 packages.
const REGISTRATION_TYPES: [&str; 5] = [
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/Versioned",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl/3.0.0-rc",
    "RegistrationsBaseUrl",
];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: OneOrMany,
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id")]
    id: String,
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogEntry,
    package_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    id: String,
    version: String,
    title: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    authors: Option<OneOrMany>,
    tags: Option<OneOrMany>,
    listed: Option<bool>,
    published: Option<String>,
    project_url: Option<String>,
    license_url: Option<String>,
    icon_url: Option<String>,
    #[serde(default)]
    dependency_groups: Vec<CatalogDependencyGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDependencyGroup {
    target_framework: Option<String>,
    #[serde(default)]
    dependencies: Vec<CatalogDependency>,
}

#[derive(Debug, Deserialize)]
struct CatalogDependency {
    id: String,
    range: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl RegistrationLeaf {
    fn into_metadata(self) -> Result<PackageMetadata, VersionParseError> {
        let entry = self.catalog_entry;
        let identity = PackageIdentity::parse(entry.id, &entry.version)?;

        let published = entry
            .published
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        // Feeds without a `listed` field mark unlisted packages with a 1900 publish date.
        let listed = entry
            .listed
            .unwrap_or_else(|| published.is_none_or(|date| date.year() != 1900));

        let mut metadata = PackageMetadata::new(identity);
        metadata.title = non_empty(entry.title);
        metadata.description = non_empty(entry.description);
        metadata.summary = non_empty(entry.summary);
        metadata.authors = entry
            .authors
            .map(|authors| authors.into_vec().join(", "))
            .filter(|authors| !authors.is_empty());
        metadata.tags = entry
            .tags
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect();
        metadata.listed = listed;
        metadata.published = published;
        metadata.project_url = non_empty(entry.project_url);
        metadata.license_url = non_empty(entry.license_url);
        metadata.icon_url = non_empty(entry.icon_url);
        metadata.package_content = non_empty(self.package_content);
        metadata.dependency_groups = entry
            .dependency_groups
            .into_iter()
            .map(|group| DependencyGroup {
                target_framework: non_empty(group.target_framework),
                dependencies: group
                    .dependencies
                    .into_iter()
                    .map(|dependency| PackageDependency {
                        id: dependency.id,
                        range: non_empty(dependency.range),
                    })
                    .collect(),
            })
            .collect();
        Ok(metadata)
    }
}

fn select_registration_base(index: &ServiceIndex) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    for resource in &index.resources {
        let rank = match &resource.kind {
            OneOrMany::One(kind) => registration_rank(kind),
            OneOrMany::Many(kinds) => kinds.iter().filter_map(|kind| registration_rank(kind)).min(),
        };
        if let Some(rank) = rank
            && best.is_none_or(|(current, _)| rank < current)
        {
            best = Some((rank, resource.id.as_str()));
        }
    }
    best.map(|(_, id)| id.to_string())
}

fn registration_rank(kind: &str) -> Option<usize> {
    REGISTRATION_TYPES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(kind))
}

fn registration_index_url(base: &str, package_id: &str) -> String {
    format!(
        "{}/{}/index.json",
        base.trim_end_matches('/'),
        package_id.to_lowercase()
    )
}

fn is_wanted(metadata: &PackageMetadata, include_prerelease: bool, include_unlisted: bool) -> bool {
    (include_prerelease || !metadata.identity.version.is_prerelease())
        && (include_unlisted || metadata.listed)
}

/// [`MetadataResource`] backed by the registration documents of a v3 feed.
///
/// The service index is read once and the registration base URL cached.
#[derive(Debug)]
pub struct RegistrationResource {
    source_uri: String,
    http: reqwest::Client,
    registration_base: OnceCell<String>,
}

impl RegistrationResource {
    #[must_use]
    pub fn new(source_uri: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            source_uri: source_uri.into(),
            http,
            registration_base: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    async fn registration_base(
        &self,
        logger: &dyn Logger,
        cancel: &CancellationToken,
    ) -> Result<&str, FeedError> {
        self.registration_base
            .get_or_try_init(|| async {
                let index: Option<ServiceIndex> = self
                    .get_json(&self.source_uri, "service index", logger, cancel)
                    .await?;
                index
                    .as_ref()
                    .and_then(select_registration_base)
                    .ok_or_else(|| FeedError::ResourceNotFound {
                        source_uri: self.source_uri.clone(),
                    })
            })
            .await
            .map(String::as_str)
    }

    /// GET a JSON document. A 404 is `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &'static str,
        logger: &dyn Logger,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, FeedError> {
        let request = async {
            logger.log_information(&format!("  GET {url}"));
            let started = Instant::now();

            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| FeedError::network_request_from(operation, e))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                logger.log_information(&format!(
                    "  NotFound {url} {}ms",
                    started.elapsed().as_millis()
                ));
                return Ok(None);
            }
            if !status.is_success() {
                return Err(FeedError::network_request(
                    operation,
                    format!("HTTP {status} from {url}"),
                ));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| FeedError::network_request_from(operation, e))?;
            logger.log_information(&format!("  OK {url} {}ms", started.elapsed().as_millis()));

            serde_json::from_slice(&body)
                .map(Some)
                .map_err(|e| FeedError::parse_from(operation, e))
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FeedError::Cancelled),
            result = request => result,
        }
    }
}

#[async_trait]
impl MetadataResource for RegistrationResource {
    async fn get_all_metadata(
        &self,
        package_id: &str,
        include_prerelease: bool,
        include_unlisted: bool,
        logger: &dyn Logger,
        cancel: &CancellationToken,
    ) -> Result<Vec<PackageMetadata>, FeedError> {
        let base = self.registration_base(logger, cancel).await?;
        let url = registration_index_url(base, package_id);

        let Some(index) = self
            .get_json::<RegistrationIndex>(&url, "registration index", logger, cancel)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None => self
                    .get_json::<RegistrationPage>(&page.id, "registration page", logger, cancel)
                    .await?
                    .and_then(|page| page.items)
                    .unwrap_or_default(),
            };

            for leaf in leaves {
                match leaf.into_metadata() {
                    Ok(metadata) => {
                        if is_wanted(&metadata, include_prerelease, include_unlisted) {
                            results.push(metadata);
                        }
                    }
                    Err(e) => logger.log_warning(&format!("Skipping registration entry: {e}")),
                }
            }
        }

        logger.log_debug(&format!(
            "{} entries for {package_id} from {}",
            results.len(),
            self.source_uri
        ));
        Ok(results)
    }
}
