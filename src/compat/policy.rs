//! Type conversion policy.
//!
//! Mirrors the server's `slave_type_conversions` setting: a set of two
//! flags, `ALL_NON_LOSSY` (a replica column may be wider than the primary's)
//! and `ALL_LOSSY` (it may be narrower, values get truncated or rounded).
//! The three common settings have names of their own.

use alloc::string::String;
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

/// Which column type conversions the applier tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ConversionPolicy {
    allow_lossy: bool,
    allow_non_lossy: bool,
}

/// Error returned when a policy string names an unknown flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown type conversion flag '{0}'")]
pub struct PolicyParseError(pub String);

impl ConversionPolicy {
    /// Only identical types are accepted.
    pub const STRICT: Self = Self {
        allow_lossy: false,
        allow_non_lossy: false,
    };

    /// Lossless widenings are accepted (`ALL_NON_LOSSY`).
    pub const WIDEN_ONLY: Self = Self {
        allow_lossy: false,
        allow_non_lossy: true,
    };

    /// Every conversion with a defined coercion is accepted
    /// (`ALL_LOSSY,ALL_NON_LOSSY`).
    pub const PERMISSIVE: Self = Self {
        allow_lossy: true,
        allow_non_lossy: true,
    };

    /// Builds a policy from the two server flags.
    #[must_use]
    pub const fn from_flags(allow_lossy: bool, allow_non_lossy: bool) -> Self {
        Self {
            allow_lossy,
            allow_non_lossy,
        }
    }

    /// Whether narrowing conversions are accepted.
    #[must_use]
    pub const fn allows_lossy(self) -> bool {
        self.allow_lossy
    }

    /// Whether widening conversions are accepted.
    #[must_use]
    pub const fn allows_non_lossy(self) -> bool {
        self.allow_non_lossy
    }

    /// Whether a conversion of the given order is accepted.
    ///
    /// `Less` means the replica column is wider, `Greater` that it is
    /// narrower, `Equal` that no conversion is needed.
    #[must_use]
    pub const fn allows(self, order: Ordering) -> bool {
        match order {
            Ordering::Equal => true,
            Ordering::Less => self.allow_non_lossy,
            Ordering::Greater => self.allow_lossy,
        }
    }
}

impl FromStr for ConversionPolicy {
    type Err = PolicyParseError;

    /// Accepts `strict`, `widen-only`, `permissive`, or a comma separated
    /// list of `ALL_LOSSY` and `ALL_NON_LOSSY` (empty means strict).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for (name, policy) in [
            ("strict", Self::STRICT),
            ("widen-only", Self::WIDEN_ONLY),
            ("permissive", Self::PERMISSIVE),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(policy);
            }
        }

        let mut policy = Self::STRICT;
        for flag in s.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if flag.eq_ignore_ascii_case("ALL_LOSSY") {
                policy.allow_lossy = true;
            } else if flag.eq_ignore_ascii_case("ALL_NON_LOSSY") {
                policy.allow_non_lossy = true;
            } else {
                return Err(PolicyParseError(String::from(flag)));
            }
        }
        Ok(policy)
    }
}

impl TryFrom<String> for ConversionPolicy {
    type Error = PolicyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.allow_lossy, self.allow_non_lossy) {
            (false, false) => f.write_str("strict"),
            (false, true) => f.write_str("widen-only"),
            (true, true) => f.write_str("permissive"),
            (true, false) => f.write_str("ALL_LOSSY"),
        }
    }
}

impl From<ConversionPolicy> for String {
    fn from(policy: ConversionPolicy) -> Self {
        alloc::format!("{policy}")
    }
}
