//! Normative levels (RFC 2119 keywords) attached to specification rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Strength of a specification requirement, ordered by strictness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NormativeLevel {
    May,
    Should,
    ShouldNot,
    Must,
    MustNot,
}

impl NormativeLevel {
    /// Every level, weakest first.
    pub const ALL: [NormativeLevel; 5] = [
        NormativeLevel::May,
        NormativeLevel::Should,
        NormativeLevel::ShouldNot,
        NormativeLevel::Must,
        NormativeLevel::MustNot,
    ];

    /// Canonical keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::May => "MAY",
            Self::Should => "SHOULD",
            Self::ShouldNot => "SHOULD NOT",
            Self::Must => "MUST",
            Self::MustNot => "MUST NOT",
        }
    }

    /// Parse a threshold, falling back to `Must` on unrecognized input.
    ///
    /// The fallback is reported back as a [`MalformedLevel`] so the caller
    /// decides how to surface it.
    pub fn parse_or_strictest(input: &str) -> (Self, Option<MalformedLevel>) {
        match input.parse() {
            Ok(level) => (level, None),
            Err(e) => (Self::Must, Some(e)),
        }
    }
}

impl fmt::Display for NormativeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Unrecognized compliance level string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{input:?} is not a valid compliance level")]
pub struct MalformedLevel {
    pub input: String,
}

impl FromStr for NormativeLevel {
    type Err = MalformedLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match normalized.as_str() {
            "MAY" | "OPTIONAL" => Ok(Self::May),
            "SHOULD" | "RECOMMENDED" => Ok(Self::Should),
            "SHOULD NOT" | "NOT RECOMMENDED" => Ok(Self::ShouldNot),
            "MUST" | "REQUIRED" | "SHALL" => Ok(Self::Must),
            "MUST NOT" | "SHALL NOT" => Ok(Self::MustNot),
            _ => Err(MalformedLevel {
                input: s.to_string(),
            }),
        }
    }
}
