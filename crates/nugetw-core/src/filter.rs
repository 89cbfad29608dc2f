use crate::metadata::Versioned;
use crate::range::{RangeParseError, VersionRange};
use crate::version::PackageVersion;

/// Lazy filter keeping items whose version satisfies a range.
///
/// Order is preserved and nothing is copied or mutated. Cloning the filter
/// (when the inner iterator is `Clone`) restarts it from the same point.
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct FilterVersions<I> {
    inner: I,
    range: VersionRange,
}

impl<I> FilterVersions<I> {
    pub fn range(&self) -> &VersionRange {
        &self.range
    }
}

impl<I> Iterator for FilterVersions<I>
where
    I: Iterator,
    I::Item: Versioned,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let range = &self.range;
        self.inner.find(|item| range.satisfies(item.version()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

pub trait FilterVersionsExt: Iterator + Sized {
    fn filter_versions(self, range: &VersionRange) -> FilterVersions<Self>
    where
        Self::Item: Versioned,
    {
        FilterVersions {
            inner: self,
            range: range.clone(),
        }
    }

    /// Filter by a range expression such as `[1.11,3.1)`.
    ///
    /// # Errors
    /// Returns an error if the expression is not a valid range.
    fn filter_versions_str(self, range: &str) -> Result<FilterVersions<Self>, RangeParseError>
    where
        Self::Item: Versioned,
    {
        let range = VersionRange::parse(range)?;
        Ok(self.filter_versions(&range))
    }

    /// Filter by explicit bound strings with independent inclusivity.
    ///
    /// # Errors
    /// Returns an error if either bound is not a valid version.
    fn filter_versions_between(
        self,
        min: &str,
        max: &str,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Result<FilterVersions<Self>, RangeParseError>
    where
        Self::Item: Versioned,
    {
        let range = VersionRange::between(min, max, min_inclusive, max_inclusive)?;
        Ok(self.filter_versions(&range))
    }

    fn filter_versions_bounds(
        self,
        min: PackageVersion,
        max: PackageVersion,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> FilterVersions<Self>
    where
        Self::Item: Versioned,
    {
        let range = VersionRange::new(Some(min), min_inclusive, Some(max), max_inclusive);
        self.filter_versions(&range)
    }
}

impl<I: Iterator> FilterVersionsExt for I {}
