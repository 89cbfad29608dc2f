use std::fmt;
use std::str::FromStr;

use crate::version::{PackageVersion, VersionParseError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeParseError {
    #[error("Version range is empty")]
    Empty,
    #[error("Invalid version range syntax: {input}")]
    InvalidSyntax { input: String },
    #[error("Invalid version in range {input}: {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: VersionParseError,
    },
    #[error("Version range bounds are out of order: {input}")]
    InvalidBounds { input: String },
}

/// An interval over package versions.
///
/// A missing bound is unbounded; its inclusivity flag is always `false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: Option<PackageVersion>,
    min_inclusive: bool,
    max: Option<PackageVersion>,
    max_inclusive: bool,
}

impl VersionRange {
    /// Build a range from explicit bounds. Bounds are not checked for order;
    /// an inverted range simply matches nothing.
    #[must_use]
    pub fn new(
        min: Option<PackageVersion>,
        min_inclusive: bool,
        max: Option<PackageVersion>,
        max_inclusive: bool,
    ) -> Self {
        Self {
            min_inclusive: min_inclusive && min.is_some(),
            max_inclusive: max_inclusive && max.is_some(),
            min,
            max,
        }
    }

    /// Build a range from two version strings.
    ///
    /// # Errors
    /// Returns an error if either bound is not a valid version.
    pub fn between(
        min: &str,
        max: &str,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Result<Self, RangeParseError> {
        let parse = |value: &str| {
            PackageVersion::parse(value).map_err(|source| RangeParseError::InvalidVersion {
                input: value.to_string(),
                source,
            })
        };
        Ok(Self::new(
            Some(parse(min)?),
            min_inclusive,
            Some(parse(max)?),
            max_inclusive,
        ))
    }

    #[must_use]
    pub fn all() -> Self {
        Self::new(None, false, None, false)
    }

    #[must_use]
    pub fn at_least(min: PackageVersion) -> Self {
        Self::new(Some(min), true, None, false)
    }

    #[must_use]
    pub fn exact(version: PackageVersion) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// Parse interval notation: `[a,b]`, `[a,b)`, `(a,b]`, `(a,b)`, one-sided
    /// forms like `[a,)` and `(,b]`, the exact form `[a]`, or a bare version
    /// meaning "at least".
    ///
    /// # Errors
    /// Returns an error for malformed brackets, invalid versions, or bounds
    /// that describe an empty interval.
    pub fn parse(input: &str) -> Result<Self, RangeParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RangeParseError::Empty);
        }

        let syntax_error = || RangeParseError::InvalidSyntax {
            input: trimmed.to_string(),
        };
        let parse_version = |value: &str| {
            PackageVersion::parse(value).map_err(|source| RangeParseError::InvalidVersion {
                input: trimmed.to_string(),
                source,
            })
        };

        let min_inclusive = match trimmed.as_bytes()[0] {
            b'[' => true,
            b'(' => false,
            _ => return Ok(Self::at_least(parse_version(trimmed)?)),
        };
        let max_inclusive = match trimmed.as_bytes()[trimmed.len() - 1] {
            b']' => true,
            b')' => false,
            _ => return Err(syntax_error()),
        };
        if trimmed.len() < 3 {
            return Err(syntax_error());
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();

        match *parts.as_slice() {
            [exact] => {
                if !min_inclusive || !max_inclusive || exact.is_empty() {
                    return Err(syntax_error());
                }
                Ok(Self::exact(parse_version(exact)?))
            }
            [min, max] => {
                let min = (!min.is_empty()).then(|| parse_version(min)).transpose()?;
                let max = (!max.is_empty()).then(|| parse_version(max)).transpose()?;

                match (&min, &max) {
                    (None, None) => return Err(syntax_error()),
                    (Some(low), Some(high)) => {
                        if low > high || (low == high && !(min_inclusive && max_inclusive)) {
                            return Err(RangeParseError::InvalidBounds {
                                input: trimmed.to_string(),
                            });
                        }
                    }
                    _ => {}
                }

                Ok(Self::new(min, min_inclusive, max, max_inclusive))
            }
            _ => Err(syntax_error()),
        }
    }

    #[must_use]
    pub fn min(&self) -> Option<&PackageVersion> {
        self.min.as_ref()
    }

    #[must_use]
    pub fn max(&self) -> Option<&PackageVersion> {
        self.max.as_ref()
    }

    #[must_use]
    pub fn is_min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    #[must_use]
    pub fn is_max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    #[must_use]
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(min), Some(max)) = (&self.min, &self.max)
            && min == max
            && self.min_inclusive
            && self.max_inclusive
        {
            return write!(f, "[{min}]");
        }

        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        write!(f, "{open}")?;
        if let Some(min) = &self.min {
            write!(f, "{min}")?;
        }
        write!(f, ", ")?;
        if let Some(max) = &self.max {
            write!(f, "{max}")?;
        }
        write!(f, "{close}")
    }
}

impl FromStr for VersionRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
