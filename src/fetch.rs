//! Downloading published artifacts back into a workspace
//!
//! The counterpart of publishing: blobs in a container are filtered with the
//! same Ant-style patterns and written below a local directory.

use crate::blob::backend::BlobBackend;
use crate::blob::validator::validate_account;
use crate::config::AccountRegistry;
use crate::error::{ArtifactError, Result};
use crate::publish::files::PatternSet;
use crate::publish::resolver::resolve;
use crate::publish::status::BuildStatus;
use crate::utils::names::validate_container_name;
use crate::utils::tokens::TokenResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One download step as entered by the user
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub storage_account: String,
    pub container_name: String,
    pub include: String,
    pub exclude: String,
    pub download_dir: PathBuf,
    pub flatten_directories: bool,
    pub include_archive_zips: bool,
}

pub struct Fetcher {
    backend: Arc<dyn BlobBackend>,
    tokens: Option<Arc<dyn TokenResolver>>,
}

impl Fetcher {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            backend,
            tokens: None,
        }
    }

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

    /// Download every matching blob, returning how many were written
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        build_status: BuildStatus,
        registry: &AccountRegistry,
    ) -> Result<usize> {
        if build_status == BuildStatus::Failure {
            return Err(ArtifactError::precondition(
                "Build failed, skipping artifact download",
            ));
        }

        let account = registry
            .storage_account(&request.storage_account)
            .ok_or_else(|| {
                ArtifactError::config(format!(
                    "Storage account '{}' is not configured",
                    request.storage_account
                ))
            })?;

        let paths = resolve(
            &self.expand(&request.include),
            &self.expand(&request.exclude),
            "",
            &self.expand(&request.container_name),
            request.include_archive_zips,
        );
        if !validate_container_name(&paths.container) {
            return Err(ArtifactError::config(format!(
                "Invalid container name '{}'",
                paths.container
            )));
        }

        validate_account(self.backend.as_ref(), &account).await?;

        let download_dir = PathBuf::from(self.expand(&request.download_dir.to_string_lossy()));
        let patterns = PatternSet::new(&paths.include, paths.exclude.as_deref())?;
        let blobs = self.backend.list_blobs(&account, &paths.container).await?;

        let mut downloaded = 0;
        for blob in blobs.iter().filter(|b| patterns.matches(&b.name)) {
            let target = target_path(&download_dir, &blob.name, request.flatten_directories)?;
            let content = self
                .backend
                .download_blob(&account, &paths.container, &blob.name)
                .await?;

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
            debug!("Downloaded '{}' to {}", blob.name, target.display());
            downloaded += 1;
        }

        Ok(downloaded)
    }
}

/// Local destination for a blob; names that climb out of the directory are refused
fn target_path(download_dir: &Path, blob_name: &str, flatten: bool) -> Result<PathBuf> {
    let segments: Vec<&str> = blob_name.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| *s == ".." || *s == ".") {
        return Err(ArtifactError::config(format!(
            "Refusing to download blob '{blob_name}' outside the download directory"
        )));
    }

    if flatten {
        // segments is non-empty here
        let file_name = segments[segments.len() - 1];
        return Ok(download_dir.join(file_name));
    }

    Ok(segments
        .iter()
        .fold(download_dir.to_path_buf(), |path, segment| path.join(segment)))
}

/// Run a download as a build step, returning the resulting build status
pub async fn run_fetch_step(
    fetcher: &Fetcher,
    request: &FetchRequest,
    status: BuildStatus,
    registry: &AccountRegistry,
) -> BuildStatus {
    match fetcher.fetch(request, status, registry).await {
        Ok(0) => {
            warn!("No files downloaded from Azure Blob Storage");
            status.worse_of(BuildStatus::Unstable)
        }
        Ok(count) => {
            info!("Downloaded {} file(s) from Azure Blob Storage", count);
            status
        }
        Err(err) if !err.downgrades_build() => {
            info!("{}", err);
            status
        }
        Err(err) => {
            error!(
                account = err.account().unwrap_or(&request.storage_account),
                "Failed to download files from Azure Blob Storage: {}", err
            );
            status.worse_of(BuildStatus::Unstable)
        }
    }
}
