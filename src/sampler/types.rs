// src/sampler/types.rs
// =============================================================================
// The two identifiers the sampler moves around.
//
// - LineId: the token the listing page uses for a line ("3A", "35ČLA", ...)
// - StationId: the positive number the detail page uses for a stop
//
// Both come out of HTML `id` attributes shaped like `prefix_token`, so the
// splitting rule lives here too.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a transit line, as exposed by the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    /// Wraps a token. Returns None for empty or whitespace-only tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positive integer identifying a physical stop.
///
/// Serializes as a bare JSON number so the artifact is a plain `[101, 202]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(u64);

impl StationId {
    /// Returns None for zero; station ids are strictly positive.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Parses a decimal station number, rejecting zero and non-digits.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<u64>().ok().and_then(Self::new)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Extracts the token from an element id shaped like `prefix_token`.
///
/// Only the second `_`-separated segment is used, so `line_3A` gives `3A`
/// and `station_101_x` gives `101`. Ids without a second segment give None.
pub fn id_token(element_id: &str) -> Option<&str> {
    element_id.split('_').nth(1).filter(|token| !token.is_empty())
}
