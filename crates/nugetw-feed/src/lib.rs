//! Package metadata queries against NuGet feeds.
//!
//! [`Repository`] is the async entry point; [`blocking::Repository`] wraps it
//! for synchronous callers. Feed access goes through [`MetadataResource`],
//! with [`RegistrationResource`] reading a v3 feed's registration documents.

pub mod blocking;
mod error;
mod registration;
mod repository;
mod resource;

pub use error::FeedError;
pub use registration::{DEFAULT_FEED_URL, RegistrationResource};
pub use repository::{DEFAULT_HTTP_TIMEOUT_SECS, Repository};
pub use resource::MetadataResource;
pub use tokio_util::sync::CancellationToken;
