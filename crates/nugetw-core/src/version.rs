use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
    Revision,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Revision => write!(f, "revision"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Version string is empty")]
    Empty,
    #[error("Expected 1 to 4 numeric parts, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
    #[error("Invalid release label in {input}: {details}")]
    InvalidLabel { input: String, details: String },
}

/// A NuGet package version.
///
/// NuGet accepts one to four numeric parts (`1`, `1.11`, `3.0.9`,
/// `1.2.3.4`), an optional `-label` and optional `+metadata`. Missing parts
/// read as zero. Metadata never takes part in ordering or equality, and
/// release labels compare case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    release: Prerelease,
    release_key: Prerelease,
    metadata: BuildMetadata,
    original: String,
}

impl PackageVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release: Prerelease::EMPTY,
            release_key: Prerelease::EMPTY,
            metadata: BuildMetadata::EMPTY,
            original: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Parse a NuGet version string.
    ///
    /// # Errors
    /// Returns an error when the input is blank, has the wrong number of
    /// numeric parts, a non-numeric part, or an invalid label.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (rest, metadata) = match trimmed.split_once('+') {
            Some((rest, metadata)) => (rest, Some(metadata)),
            None => (trimmed, None),
        };
        let (core, label) = match rest.split_once('-') {
            Some((core, label)) => (core, Some(label)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 4 {
            return Err(VersionParseError::InvalidFormat {
                input: trimmed.to_string(),
            });
        }

        let components = [
            VersionComponent::Major,
            VersionComponent::Minor,
            VersionComponent::Patch,
            VersionComponent::Revision,
        ];
        let mut numbers = [0_u64; 4];
        for (index, part) in parts.iter().enumerate() {
            numbers[index] = parse_component(part, components[index])?;
        }

        let release = match label {
            Some(label) => parse_label(trimmed, label, Prerelease::new)?,
            None => Prerelease::EMPTY,
        };
        let release_key = if release.is_empty() {
            Prerelease::EMPTY
        } else {
            parse_label(trimmed, &release.as_str().to_ascii_lowercase(), Prerelease::new)?
        };
        let metadata = match metadata {
            Some(metadata) => parse_label(trimmed, metadata, BuildMetadata::new)?,
            None => BuildMetadata::EMPTY,
        };

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            release,
            release_key,
            metadata,
            original: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.patch
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn release_label(&self) -> &str {
        self.release.as_str()
    }

    #[must_use]
    pub fn metadata(&self) -> &str {
        self.metadata.as_str()
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.release.is_empty()
    }

    /// The string this version was parsed from, trimmed.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Normalized form including build metadata.
    #[must_use]
    pub fn to_full_string(&self) -> String {
        if self.metadata.is_empty() {
            self.to_string()
        } else {
            format!("{self}+{}", self.metadata)
        }
    }
}

fn parse_component(part: &str, component: VersionComponent) -> Result<u64, VersionParseError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::InvalidComponent {
            component,
            value: part.to_string(),
        });
    }
    part.parse().map_err(|_| VersionParseError::InvalidComponent {
        component,
        value: part.to_string(),
    })
}

fn parse_label<T>(
    input: &str,
    label: &str,
    parse: fn(&str) -> Result<T, semver::Error>,
) -> Result<T, VersionParseError> {
    if label.is_empty() {
        return Err(VersionParseError::InvalidLabel {
            input: input.to_string(),
            details: "label is empty".to_string(),
        });
    }
    parse(label).map_err(|error| VersionParseError::InvalidLabel {
        input: input.to_string(),
        details: error.to_string(),
    })
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then(self.revision.cmp(&other.revision))
            .then_with(|| self.release_key.cmp(&other.release_key))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.release_key.as_str().hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageVersion> for String {
    fn from(version: PackageVersion) -> Self {
        version.to_full_string()
    }
}

/// A package id paired with one version. Ids compare case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub id: String,
    pub version: PackageVersion,
}

impl PackageIdentity {
    #[must_use]
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Build an identity from a caller-supplied version string.
    ///
    /// # Errors
    /// Returns an error if `version` is not a valid NuGet version.
    pub fn parse(id: impl Into<String>, version: &str) -> Result<Self, VersionParseError> {
        Ok(Self::new(id, PackageVersion::parse(version)?))
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn parse_fills_missing_parts_with_zero() {
        let version = v("1.11");
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 11);
        assert_eq!(version.patch(), 0);
        assert_eq!(version.to_string(), "1.11.0");
        assert_eq!(version.original(), "1.11");
    }

    #[test]
    fn parse_accepts_four_parts_and_labels() {
        let version = v("1.2.3.4-Beta.2+sha.abc");
        assert_eq!(version.revision(), 4);
        assert_eq!(version.release_label(), "Beta.2");
        assert_eq!(version.metadata(), "sha.abc");
        assert!(version.is_prerelease());
        assert_eq!(version.to_string(), "1.2.3.4-Beta.2");
        assert_eq!(version.to_full_string(), "1.2.3.4-Beta.2+sha.abc");
    }

    #[test]
    fn parse_rejects_invalid_input() {
        assert_eq!(PackageVersion::parse("   "), Err(VersionParseError::Empty));
        assert!(matches!(
            PackageVersion::parse("not-a-version"),
            Err(VersionParseError::InvalidComponent {
                component: VersionComponent::Major,
                ..
            })
        ));
        assert!(matches!(
            PackageVersion::parse("1.2.3.4.5"),
            Err(VersionParseError::InvalidFormat { .. })
        ));
        assert!(matches!(
            PackageVersion::parse("1..2"),
            Err(VersionParseError::InvalidComponent {
                component: VersionComponent::Minor,
                ..
            })
        ));
        assert!(matches!(
            PackageVersion::parse("1.0.0-"),
            Err(VersionParseError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn ordering_treats_missing_parts_as_zero() {
        assert_eq!(v("1.11"), v("1.11.0"));
        assert_eq!(v("1.11.0.0"), v("1.11"));
        assert!(v("3.0.9") < v("3.1"));
        assert!(v("1.2.3.1") > v("1.2.3"));
    }

    #[test]
    fn prerelease_sorts_below_release() {
        assert!(v("1.0.0-beta") < v("1.0.0"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.10"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
    }

    #[test]
    fn labels_compare_case_insensitively_and_metadata_is_ignored() {
        assert_eq!(v("1.0.0-BETA"), v("1.0.0-beta"));
        assert_eq!(v("1.0.0+abc"), v("1.0.0+def"));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&v("2.1-rc.1+build")).expect("serialize version");
        assert_eq!(json, "\"2.1.0-rc.1+build\"");

        let parsed: PackageVersion = serde_json::from_str("\"4.3\"").expect("deserialize");
        assert_eq!(parsed, v("4.3.0"));
        assert!(serde_json::from_str::<PackageVersion>("\"x.y\"").is_err());
    }

    #[test]
    fn identity_compares_ids_case_insensitively() {
        let a = PackageIdentity::parse("jQuery", "3.1.1").expect("valid identity");
        let b = PackageIdentity::parse("jquery", "3.1.1.0").expect("valid identity");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "jQuery.3.1.1");
    }
}
