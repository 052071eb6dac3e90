//! Upload mode selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a publish operation uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    Individual,
    Archive,
    Both,
    /// Nothing would be uploaded; rejected before any network call
    Invalid,
}

impl UploadMode {
    pub fn uploads_individual(self) -> bool {
        matches!(self, Self::Individual | Self::Both)
    }

    pub fn uploads_archive(self) -> bool {
        matches!(self, Self::Archive | Self::Both)
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Individual => "individual",
            Self::Archive => "archive",
            Self::Both => "both",
            Self::Invalid => "invalid",
        };
        write!(f, "{name}")
    }
}

pub fn plan_mode(upload_archive: bool, skip_individual_files: bool) -> UploadMode {
    match (upload_archive, skip_individual_files) {
        (true, false) => UploadMode::Both,
        (false, false) => UploadMode::Individual,
        (true, true) => UploadMode::Archive,
        (false, true) => UploadMode::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_mode_table() {
        assert_eq!(plan_mode(true, false), UploadMode::Both);
        assert_eq!(plan_mode(false, false), UploadMode::Individual);
        assert_eq!(plan_mode(true, true), UploadMode::Archive);
        assert_eq!(plan_mode(false, true), UploadMode::Invalid);
    }

    #[test]
    fn test_mode_steps() {
        assert!(UploadMode::Both.uploads_individual());
        assert!(UploadMode::Both.uploads_archive());
        assert!(!UploadMode::Archive.uploads_individual());
        assert!(!UploadMode::Individual.uploads_archive());
        assert!(!UploadMode::Invalid.uploads_individual());
        assert!(!UploadMode::Invalid.uploads_archive());
    }
}
