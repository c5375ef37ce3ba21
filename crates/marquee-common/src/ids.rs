//! Typed ID wrappers.
//!
//! Movie identifiers are positive integers assigned by the library scanner.
//! They appear in URLs and as string keys of the path registry, so the
//! wrapper parses from and displays as a plain decimal number.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::str::FromStr;

use crate::Error;

/// Identifier of a movie in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(NonZeroU64);

impl MovieId {
    /// Create an id from a raw value, returning `None` for zero.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl FromStr for MovieId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("invalid movie id: {s:?}")))?;
        Self::new(raw).ok_or_else(|| Error::validation("movie id must be positive"))
    }
}

impl From<NonZeroU64> for MovieId {
    fn from(raw: NonZeroU64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
