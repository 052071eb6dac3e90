//! Azure Blob Storage backend
//!
//! Shared-key implementation of [`BlobBackend`] on top of the
//! `azure_storage_blobs` SDK. Clients are built per call from the account
//! record, so the backend itself holds no credentials.

use crate::blob::backend::BlobBackend;
use crate::blob::models::{BlobItem, BlobUploadRequest};
use crate::config::StorageAccountInfo;
use crate::error::{ArtifactError, Result};
use async_trait::async_trait;
use azure_storage::shared_access_signature::service_sas::BlobSasPermissions;
use azure_storage::shared_access_signature::SasToken;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::container::PublicAccess;
use azure_storage_blobs::prelude::*;
use futures::TryStreamExt;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;

/// Blob backend talking to Azure Storage with account keys
#[derive(Debug, Clone, Default)]
pub struct AzureBlobBackend;

impl AzureBlobBackend {
    pub fn new() -> Self {
        Self
    }

    fn service_client(account: &StorageAccountInfo) -> BlobServiceClient {
        let credentials = StorageCredentials::access_key(
            account.account_name.clone(),
            account.account_key.as_str().to_string(),
        );
        let location = CloudLocation::Custom {
            account: account.account_name.clone(),
            uri: account.account_url(),
        };

        ClientBuilder::with_location(location, credentials).blob_service_client()
    }

    fn container_client(account: &StorageAccountInfo, container: &str) -> ContainerClient {
        Self::service_client(account).container_client(container)
    }
}

fn is_auth_failure(error: &azure_core::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("403") || msg.contains("authenticationfailed") || msg.contains("forbidden")
}

fn is_not_found(error: &azure_core::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("404") || msg.contains("not found") || msg.contains("blobnotfound")
}

#[async_trait]
impl BlobBackend for AzureBlobBackend {
    async fn validate_account(&self, account: &StorageAccountInfo) -> Result<()> {
        let service = Self::service_client(account);

        // The first page of the container listing is enough to prove the key works
        let mut stream = service.list_containers().into_stream();
        stream.try_next().await.map_err(|e| {
            ArtifactError::authentication(
                &account.account_name,
                format!("Storage account check against {} failed: {e}", account.account_url()),
            )
        })?;

        Ok(())
    }

    async fn ensure_container(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        public_access: bool,
    ) -> Result<()> {
        let container_client = Self::container_client(account, container);

        let exists = container_client.exists().await.map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to check container '{container}': {e}"),
            )
        })?;
        if exists {
            return Ok(());
        }

        debug!("Creating container '{}' (public access: {})", container, public_access);
        let access = if public_access {
            PublicAccess::Blob
        } else {
            PublicAccess::None
        };
        container_client
            .create()
            .public_access(access)
            .await
            .map_err(|e| {
                ArtifactError::transfer(
                    &account.account_name,
                    format!("Failed to create container '{container}': {e}"),
                )
            })?;

        Ok(())
    }

    async fn upload_blob(
        &self,
        account: &StorageAccountInfo,
        request: BlobUploadRequest,
    ) -> Result<String> {
        let blob_client =
            Self::container_client(account, &request.container).blob_client(&request.blob_name);

        blob_client
            .put_block_blob(request.content)
            .content_type(request.content_type)
            .await
            .map_err(|e| {
                ArtifactError::transfer(
                    &account.account_name,
                    format!("Failed to upload blob '{}': {e}", request.blob_name),
                )
            })?;

        let url = blob_client.url().map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to build URL for blob '{}': {e}", request.blob_name),
            )
        })?;

        Ok(url.to_string())
    }

    async fn delete_all_blobs(
        &self,
        account: &StorageAccountInfo,
        container: &str,
    ) -> Result<usize> {
        let container_client = Self::container_client(account, container);

        let exists = container_client.exists().await.map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to check container '{container}': {e}"),
            )
        })?;
        if !exists {
            return Ok(0);
        }

        let blobs = self.list_blobs(account, container).await?;
        for blob in &blobs {
            container_client
                .blob_client(&blob.name)
                .delete()
                .await
                .map_err(|e| {
                    ArtifactError::transfer(
                        &account.account_name,
                        format!("Failed to delete blob '{}': {e}", blob.name),
                    )
                })?;
            debug!("Deleted blob '{}' from '{}'", blob.name, container);
        }

        Ok(blobs.len())
    }

    async fn list_blobs(
        &self,
        account: &StorageAccountInfo,
        container: &str,
    ) -> Result<Vec<BlobItem>> {
        let container_client = Self::container_client(account, container);

        let mut stream = container_client.list_blobs().into_stream();
        let mut items = Vec::new();

        while let Some(page) = stream.try_next().await.map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to list blobs in '{container}': {e}"),
            )
        })? {
            for blob in page.blobs.blobs() {
                items.push(BlobItem {
                    name: blob.name.clone(),
                    size: blob.properties.content_length,
                    content_type: blob.properties.content_type.clone(),
                });
            }
        }

        Ok(items)
    }

    async fn download_blob(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        blob_name: &str,
    ) -> Result<Vec<u8>> {
        let blob_client = Self::container_client(account, container).blob_client(blob_name);

        let properties = blob_client.get_properties().await.map_err(|e| {
            if is_not_found(&e) {
                ArtifactError::not_found(blob_name)
            } else {
                ArtifactError::transfer(
                    &account.account_name,
                    format!("Failed to read properties of blob '{blob_name}': {e}"),
                )
            }
        })?;

        // get_content() answers 416 for zero-length blobs
        if properties.blob.properties.content_length == 0 {
            return Ok(Vec::new());
        }

        blob_client.get_content().await.map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to download blob '{blob_name}': {e}"),
            )
        })
    }

    async fn signed_download_query(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        ttl: Duration,
    ) -> Result<String> {
        let container_client = Self::container_client(account, container);
        let expiry = time::Duration::try_from(ttl)
            .ok()
            .and_then(|ttl| OffsetDateTime::now_utc().checked_add(ttl))
            .ok_or_else(|| {
                ArtifactError::config(format!("Signed URL lifetime {}s is out of range", ttl.as_secs()))
            })?;
        let permissions = BlobSasPermissions {
            read: true,
            ..Default::default()
        };

        let signature = container_client
            .shared_access_signature(permissions, expiry)
            .await
            .map_err(|e| {
                let details = format!("Failed to sign access to container '{container}': {e}");
                if is_auth_failure(&e) {
                    ArtifactError::authentication(&account.account_name, details)
                } else {
                    ArtifactError::transfer(&account.account_name, details)
                }
            })?;

        signature.token().map_err(|e| {
            ArtifactError::transfer(
                &account.account_name,
                format!("Failed to encode SAS token for '{container}': {e}"),
            )
        })
    }
}
