// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scheduling priority hints for spawned work units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque scheduling preference attached to every unit of one fan-out call.
///
/// The runner never interprets the hint; it hands it to the [`Spawner`]
/// unchanged. Substrates without a priority concept ignore it. Absence
/// (`Option::None` at call sites) means "scheduler default".
///
/// Variants are ordered from least to most urgent.
///
/// [`Spawner`]: crate::Spawner
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Work nobody is waiting on.
    Background,
    /// Below-default urgency.
    Low,
    /// The usual middle ground.
    Medium,
    /// A caller is actively waiting on the result.
    High,
}

impl Priority {
    /// All hints, least urgent first.
    pub const ALL: [Priority; 4] = [
        Priority::Background,
        Priority::Low,
        Priority::Medium,
        Priority::High,
    ];

    /// Lowercase name, matching the serde and `FromStr` spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Background => "background",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no [`Priority`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority {0:?} (expected background, low, medium or high)")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParsePriorityError(s.to_string()))
    }
}
