use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::{PackageIdentity, PackageVersion};

/// Anything that carries a package version, so it can be range-filtered.
pub trait Versioned {
    fn version(&self) -> &PackageVersion;
}

impl Versioned for PackageVersion {
    fn version(&self) -> &PackageVersion {
        self
    }
}

impl Versioned for PackageIdentity {
    fn version(&self) -> &PackageVersion {
        &self.version
    }
}

impl<T: Versioned + ?Sized> Versioned for &T {
    fn version(&self) -> &PackageVersion {
        (**self).version()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    pub id: String,
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGroup {
    pub target_framework: Option<String>,
    pub dependencies: Vec<PackageDependency>,
}

/// Metadata for one package version as reported by a feed. Read-only to
/// everything above the feed client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub identity: PackageIdentity,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub authors: Option<String>,
    pub tags: Vec<String>,
    pub listed: bool,
    pub published: Option<DateTime<Utc>>,
    pub project_url: Option<String>,
    pub license_url: Option<String>,
    pub icon_url: Option<String>,
    pub package_content: Option<String>,
    pub download_count: Option<u64>,
    pub dependency_groups: Vec<DependencyGroup>,
}

impl PackageMetadata {
    /// Metadata with only the identity filled in.
    #[must_use]
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            title: None,
            description: None,
            summary: None,
            authors: None,
            tags: Vec::new(),
            listed: true,
            published: None,
            project_url: None,
            license_url: None,
            icon_url: None,
            package_content: None,
            download_count: None,
            dependency_groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.identity.id
    }
}

impl Versioned for PackageMetadata {
    fn version(&self) -> &PackageVersion {
        &self.identity.version
    }
}
