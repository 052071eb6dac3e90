use thiserror::Error;

/// Main error type for azartifacts operations
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed for storage account '{account}': {details}")]
    AuthenticationError { account: String, details: String },

    #[error("Transfer failed for storage account '{account}': {details}")]
    TransferError { account: String, details: String },

    #[error("Artifact not found: {name}")]
    NotFound { name: String },

    #[error("Skipped: {0}")]
    Precondition(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::ser::Error),

    #[error("Configuration loading error: {0}")]
    ConfigLoadError(#[from] config::ConfigError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Operation timeout")]
    Timeout,
}

impl ArtifactError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn authentication<A: Into<String>, S: Into<String>>(account: A, details: S) -> Self {
        Self::AuthenticationError {
            account: account.into(),
            details: details.into(),
        }
    }

    pub fn transfer<A: Into<String>, S: Into<String>>(account: A, details: S) -> Self {
        Self::TransferError {
            account: account.into(),
            details: details.into(),
        }
    }

    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether a build step hitting this error should mark the build unstable.
    ///
    /// Only skipped preconditions and lookup misses leave the status alone.
    pub fn downgrades_build(&self) -> bool {
        !matches!(self, Self::Precondition(_) | Self::NotFound { .. })
    }

    /// Storage account the failure relates to, when known.
    pub fn account(&self) -> Option<&str> {
        match self {
            Self::AuthenticationError { account, .. } | Self::TransferError { account, .. } => {
                Some(account)
            }
            _ => None,
        }
    }
}

/// Result type alias for azartifacts operations
pub type Result<T> = std::result::Result<T, ArtifactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_classification() {
        assert!(ArtifactError::config("bad container").downgrades_build());
        assert!(ArtifactError::authentication("acct", "403").downgrades_build());
        assert!(ArtifactError::transfer("acct", "reset").downgrades_build());
        assert!(ArtifactError::Timeout.downgrades_build());
        assert!(!ArtifactError::precondition("build failed").downgrades_build());
        assert!(!ArtifactError::not_found("a.txt").downgrades_build());
    }

    #[test]
    fn test_transfer_error_carries_account() {
        let err = ArtifactError::transfer("buildcache", "connection reset");
        assert_eq!(err.account(), Some("buildcache"));
        assert_eq!(
            err.to_string(),
            "Transfer failed for storage account 'buildcache': connection reset"
        );
        assert_eq!(ArtifactError::Timeout.account(), None);
    }
}
