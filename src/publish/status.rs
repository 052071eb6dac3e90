//! Build status as seen by the publish and fetch steps

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of the build a step runs in, ordered from best to worst
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Unstable,
    Failure,
    Aborted,
}

impl BuildStatus {
    /// Combine two statuses; the result is never better than either input
    pub fn worse_of(self, other: BuildStatus) -> BuildStatus {
        self.max(other)
    }

    /// Whether steps guarded by "only if successful" should be skipped
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failure | Self::Aborted)
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Unstable => 2,
            Self::Failure => 1,
            Self::Aborted => 130,
        }
    }
}

impl Default for BuildStatus {
    fn default() -> Self {
        Self::Success
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::Aborted => "ABORTED",
        };
        write!(f, "{name}")
    }
}
