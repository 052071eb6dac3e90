//! Shared helpers for integration tests
//!
//! `FakeBackend` keeps containers in memory and records every call so tests
//! can check ordering as well as results.

#![allow(dead_code)]

use async_trait::async_trait;
use azartifacts::blob::{BlobBackend, BlobItem, BlobUploadRequest};
use azartifacts::config::{AccountRegistry, StorageAccountInfo};
use azartifacts::error::{ArtifactError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const ACCOUNT: &str = "buildcache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Validate,
    EnsureContainer { container: String, public_access: bool },
    Upload { container: String, blob_name: String, content_type: String },
    DeleteAll { container: String },
    List { container: String },
    Download { container: String, blob_name: String },
    Sign { container: String },
}

#[derive(Default)]
pub struct FakeBackend {
    containers: Mutex<HashMap<String, BTreeMap<String, (Vec<u8>, String)>>>,
    calls: Mutex<Vec<Call>>,
    fail_upload_of: Option<String>,
    reject_credentials: bool,
    sign_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads of this blob name fail with a transfer error
    pub fn failing_upload_of(mut self, blob_name: &str) -> Self {
        self.fail_upload_of = Some(blob_name.to_string());
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.sign_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn blob_names(&self, container: &str) -> Vec<String> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn blob(&self, container: &str, name: &str) -> Option<(Vec<u8>, String)> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .and_then(|blobs| blobs.get(name).cloned())
    }

    pub fn put(&self, container: &str, name: &str, content: &[u8]) {
        self.containers
            .lock()
            .unwrap()
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), (content.to_vec(), "application/octet-stream".to_string()));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlobBackend for FakeBackend {
    async fn validate_account(&self, account: &StorageAccountInfo) -> Result<()> {
        self.record(Call::Validate);
        if self.reject_credentials {
            return Err(ArtifactError::authentication(&account.account_name, "403 AuthenticationFailed"));
        }
        Ok(())
    }

    async fn ensure_container(
        &self,
        _account: &StorageAccountInfo,
        container: &str,
        public_access: bool,
    ) -> Result<()> {
        self.record(Call::EnsureContainer {
            container: container.to_string(),
            public_access,
        });
        self.containers
            .lock()
            .unwrap()
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn upload_blob(
        &self,
        account: &StorageAccountInfo,
        request: BlobUploadRequest,
    ) -> Result<String> {
        self.record(Call::Upload {
            container: request.container.clone(),
            blob_name: request.blob_name.clone(),
            content_type: request.content_type.clone(),
        });
        if self.fail_upload_of.as_deref() == Some(request.blob_name.as_str()) {
            return Err(ArtifactError::transfer(&account.account_name, "connection reset"));
        }

        let url = format!(
            "{}/{}/{}",
            account.account_url(),
            request.container,
            request.blob_name
        );
        self.containers
            .lock()
            .unwrap()
            .entry(request.container)
            .or_default()
            .insert(request.blob_name, (request.content, request.content_type));
        Ok(url)
    }

    async fn delete_all_blobs(&self, _account: &StorageAccountInfo, container: &str) -> Result<usize> {
        self.record(Call::DeleteAll {
            container: container.to_string(),
        });
        let mut containers = self.containers.lock().unwrap();
        Ok(containers
            .get_mut(container)
            .map(|blobs| {
                let count = blobs.len();
                blobs.clear();
                count
            })
            .unwrap_or(0))
    }

    async fn list_blobs(&self, _account: &StorageAccountInfo, container: &str) -> Result<Vec<BlobItem>> {
        self.record(Call::List {
            container: container.to_string(),
        });
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(container)
            .map(|blobs| {
                blobs
                    .iter()
                    .map(|(name, (content, content_type))| BlobItem {
                        name: name.clone(),
                        size: content.len() as u64,
                        content_type: content_type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn download_blob(
        &self,
        _account: &StorageAccountInfo,
        container: &str,
        blob_name: &str,
    ) -> Result<Vec<u8>> {
        self.record(Call::Download {
            container: container.to_string(),
            blob_name: blob_name.to_string(),
        });
        self.blob(container, blob_name)
            .map(|(content, _)| content)
            .ok_or_else(|| ArtifactError::not_found(blob_name))
    }

    async fn signed_download_query(
        &self,
        _account: &StorageAccountInfo,
        container: &str,
        _ttl: Duration,
    ) -> Result<String> {
        self.record(Call::Sign {
            container: container.to_string(),
        });
        if let Some(delay) = self.sign_delay {
            tokio::time::sleep(delay).await;
        }
        Ok("sv=2021-08-06&sr=c&sp=r&sig=fake".to_string())
    }
}

pub fn registry() -> AccountRegistry {
    AccountRegistry::new(vec![StorageAccountInfo::new(
        ACCOUNT,
        "c2VjcmV0LWtleQ==",
        "https://blob.core.windows.net/",
    )])
}

/// Temporary workspace populated with the given files
pub fn workspace(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in files {
        write_file(dir.path(), file);
    }
    dir
}

pub fn write_file(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, format!("content of {relative}")).unwrap();
}
