//! The publish operation
//!
//! A publish is one linear sequence of gates: preconditions and names are
//! checked before the network is touched, the account is validated before
//! any transfer, and the container is cleaned (when asked) before the first
//! upload. The first failure aborts the rest of the plan. Blobs uploaded
//! before a failure stay in place.

use crate::blob::backend::BlobBackend;
use crate::blob::models::BlobUploadRequest;
use crate::blob::validator::validate_account;
use crate::config::{AccountRegistry, StorageAccountInfo};
use crate::error::{ArtifactError, Result};
use crate::publish::files::{create_archive, FileMatcher, GlobMatcher, MatchedFile};
use crate::publish::manifest::{ArtifactManifest, Blob, ManifestBuilder};
use crate::publish::planner::{plan_mode, UploadMode};
use crate::publish::resolver::{resolve, ResolvedPaths, ARCHIVE_NAME};
use crate::publish::status::BuildStatus;
use crate::utils::helpers::join_blob_name;
use crate::utils::names::{validate_blob_name, validate_container_name};
use crate::utils::tokens::TokenResolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a single publish needs, as entered by the user
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub storage_account: String,
    pub container_name: String,
    pub include: String,
    pub exclude: String,
    pub virtual_path: String,
    pub upload_archive: bool,
    pub skip_individual_files: bool,
    pub content_type: Option<String>,
    pub flatten_directories: bool,
    pub container_public_access: bool,
    pub clean_before_upload: bool,
    pub include_archive_zips: bool,
    pub allow_anonymous_access: bool,
    pub only_if_successful: bool,
    pub do_not_fail_if_nothing_uploaded: bool,
    pub workspace: PathBuf,
}

impl UploadRequest {
    pub fn mode(&self) -> UploadMode {
        plan_mode(self.upload_archive, self.skip_individual_files)
    }
}

/// Outcome of a publish that ran to completion
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub manifest: ArtifactManifest,
    /// Individual blobs plus the archive, each counted once
    pub uploaded: usize,
    pub mode: UploadMode,
}

/// Runs publishes against a blob backend
pub struct Publisher {
    backend: Arc<dyn BlobBackend>,
    matcher: Arc<dyn FileMatcher>,
    tokens: Option<Arc<dyn TokenResolver>>,
}

impl Publisher {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            backend,
            matcher: Arc::new(GlobMatcher::new()),
            tokens: None,
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn FileMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Expand `$NAME` tokens in every user-supplied path and name
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenResolver>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn expand(&self, raw: &str) -> String {
        match &self.tokens {
            Some(tokens) => tokens.replace_tokens(raw),
            None => raw.to_string(),
        }
    }

    fn resolve_paths(&self, request: &UploadRequest) -> ResolvedPaths {
        resolve(
            &self.expand(&request.include),
            &self.expand(&request.exclude),
            &self.expand(&request.virtual_path),
            &self.expand(&request.container_name),
            request.include_archive_zips,
        )
    }

    pub async fn publish(
        &self,
        request: &UploadRequest,
        build_status: BuildStatus,
        registry: &AccountRegistry,
    ) -> Result<PublishReport> {
        if request.only_if_successful && build_status.is_failed() {
            return Err(ArtifactError::precondition(format!(
                "Build status is {build_status}, skipping artifact upload"
            )));
        }

        let account = registry
            .storage_account(&request.storage_account)
            .ok_or_else(|| {
                ArtifactError::config(format!(
                    "Storage account '{}' is not configured",
                    request.storage_account
                ))
            })?;

        let paths = self.resolve_paths(request);
        if !validate_container_name(&paths.container) {
            return Err(ArtifactError::config(format!(
                "Invalid container name '{}': use 3-63 lowercase letters, digits and single hyphens",
                paths.container
            )));
        }

        let mode = request.mode();
        if mode == UploadMode::Invalid {
            return Err(ArtifactError::config(
                "Nothing to upload: individual files are skipped and no archive was requested",
            ));
        }

        validate_account(self.backend.as_ref(), &account).await?;

        let files = self.matcher.match_files(
            &request.workspace,
            &paths.include,
            paths.exclude.as_deref(),
        )?;
        info!(
            "Matched {} file(s) in {} with '{}'",
            files.len(),
            request.workspace.display(),
            paths.include
        );

        let mut builder = ManifestBuilder::new(
            &account.account_name,
            &paths.container,
            request.allow_anonymous_access,
        );

        if files.is_empty() {
            return Ok(PublishReport {
                manifest: builder.build(),
                uploaded: 0,
                mode,
            });
        }

        self.backend
            .ensure_container(&account, &paths.container, request.container_public_access)
            .await?;

        if request.clean_before_upload {
            let removed = self
                .backend
                .delete_all_blobs(&account, &paths.container)
                .await?;
            info!("Removed {} blob(s) from container '{}'", removed, paths.container);
        }

        if mode.uploads_individual() {
            for file in &files {
                let name = if request.flatten_directories {
                    file.file_name()
                } else {
                    file.relative_path.as_str()
                };
                let blob_name = join_blob_name(paths.virtual_path.as_deref(), name);
                let content_type = match &request.content_type {
                    Some(content_type) if !content_type.trim().is_empty() => {
                        content_type.trim().to_string()
                    }
                    _ => guess_content_type(file),
                };

                let blob = self
                    .upload(&account, &paths.container, blob_name, file_bytes(file).await?, content_type)
                    .await?;
                builder.add_individual(blob);
            }
        }

        if mode.uploads_archive() {
            let archive_files = files.clone();
            let bytes = tokio::task::spawn_blocking(move || create_archive(&archive_files))
                .await
                .map_err(|e| ArtifactError::config(format!("Archive task failed: {e}")))??;

            let blob_name = join_blob_name(paths.virtual_path.as_deref(), ARCHIVE_NAME);
            let blob = self
                .upload(&account, &paths.container, blob_name, bytes, "application/zip".to_string())
                .await?;
            builder.set_archive(blob);
        }

        let manifest = builder.build();
        let uploaded = manifest.uploaded_count();
        info!(
            "Uploaded {} blob(s) to container '{}' in account '{}'",
            uploaded, paths.container, account.account_name
        );

        Ok(PublishReport {
            manifest,
            uploaded,
            mode,
        })
    }

    async fn upload(
        &self,
        account: &StorageAccountInfo,
        container: &str,
        blob_name: String,
        content: Vec<u8>,
        content_type: String,
    ) -> Result<Blob> {
        if !validate_blob_name(&blob_name) {
            return Err(ArtifactError::config(format!("Invalid blob name '{blob_name}'")));
        }

        debug!("Uploading '{}' ({} bytes, {})", blob_name, content.len(), content_type);
        let url = self
            .backend
            .upload_blob(
                account,
                BlobUploadRequest {
                    container: container.to_string(),
                    blob_name: blob_name.clone(),
                    content,
                    content_type,
                },
            )
            .await?;

        Ok(Blob::new(container, blob_name, url))
    }
}

fn guess_content_type(file: &MatchedFile) -> String {
    mime_guess::from_path(&file.relative_path)
        .first_or_octet_stream()
        .to_string()
}

async fn file_bytes(file: &MatchedFile) -> Result<Vec<u8>> {
    Ok(tokio::fs::read(&file.absolute_path).await?)
}
