//! The storage backend seam
//!
//! Publishing, fetching and the download gate only ever talk to blob storage
//! through [`BlobBackend`]. Every call carries the storage account it acts
//! for, so one backend instance serves all configured accounts.

use crate::blob::models::{BlobItem, BlobUploadRequest};
use crate::config::StorageAccountInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Network operations against a blob storage account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Lightweight credential and endpoint check
    async fn validate_account(&self, account: &StorageAccountInfo) -> Result<()>;

    /// Create the container if it does not exist yet
    async fn ensure_container(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        public_access: bool,
    ) -> Result<()>;

    /// Upload one blob, returning its absolute URL (without any SAS token)
    async fn upload_blob(
        &self,
        account: &StorageAccountInfo,
        request: BlobUploadRequest,
    ) -> Result<String>;

    /// Delete every blob in the container, returning how many were removed
    async fn delete_all_blobs(&self, account: &StorageAccountInfo, container: &str)
        -> Result<usize>;

    async fn list_blobs(&self, account: &StorageAccountInfo, container: &str)
        -> Result<Vec<BlobItem>>;

    async fn download_blob(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        blob_name: &str,
    ) -> Result<Vec<u8>>;

    /// Read-only SAS query string for the container, valid for `ttl`
    async fn signed_download_query(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        ttl: Duration,
    ) -> Result<String>;
}
