//! Storage account pre-flight check
//!
//! Runs before any transfer. Credentials are static for a run, so a failed
//! check is reported as a configuration problem and never retried.

use crate::blob::backend::BlobBackend;
use crate::config::StorageAccountInfo;
use crate::error::{ArtifactError, Result};
use tracing::{debug, error};

/// Confirm the account's key and endpoint are usable
pub async fn validate_account(backend: &dyn BlobBackend, account: &StorageAccountInfo) -> Result<()> {
    debug!("Validating storage account '{}'", account.account_name);

    match backend.validate_account(account).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(
                "Failed to validate storage account '{}' at {}: {}",
                account.account_name,
                account.blob_endpoint,
                err
            );
            Err(match err {
                ArtifactError::AuthenticationError { .. } => err,
                other => ArtifactError::authentication(&account.account_name, other.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::backend::MockBlobBackend;

    fn account() -> StorageAccountInfo {
        StorageAccountInfo::new("buildcache", "c2VjcmV0", "https://blob.core.windows.net")
    }

    #[tokio::test]
    async fn test_successful_validation() {
        let mut backend = MockBlobBackend::new();
        backend.expect_validate_account().times(1).returning(|_| Ok(()));

        assert!(validate_account(&backend, &account()).await.is_ok());
    }

    #[tokio::test]
    async fn test_transfer_failure_becomes_authentication_error() {
        let mut backend = MockBlobBackend::new();
        backend
            .expect_validate_account()
            .times(1)
            .returning(|a| Err(ArtifactError::transfer(&a.account_name, "dns lookup failed")));

        let err = validate_account(&backend, &account()).await.unwrap_err();
        match err {
            ArtifactError::AuthenticationError { account, details } => {
                assert_eq!(account, "buildcache");
                assert!(details.contains("dns lookup failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
