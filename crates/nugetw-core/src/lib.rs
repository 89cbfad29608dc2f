//! Shared value types for nugetw.
//!
//! Nothing in here performs I/O:
//! - NuGet versions, package identities and interval version ranges.
//! - The read-only package metadata record returned by feeds.
//! - Lazy version-range filtering over any iterator of versioned items.
//! - The logger surface feed clients report through, and an event-based
//!   implementation of it.

mod filter;
pub mod logging;
mod metadata;
mod range;
mod version;

/// Lazy version-range filtering.
pub use filter::{FilterVersions, FilterVersionsExt};
/// Feed logging surface and adapters.
pub use logging::{
    EventLogger, LogEvent, LogForwarder, LogLevel, LogMessage, Logger, NullLogger, SubscriptionId,
};
/// Package metadata record.
pub use metadata::{DependencyGroup, PackageDependency, PackageMetadata, Versioned};
/// Interval version ranges.
pub use range::{RangeParseError, VersionRange};
/// NuGet versions and identities.
pub use version::{PackageIdentity, PackageVersion, VersionComponent, VersionParseError};
