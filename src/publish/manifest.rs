//! Artifact manifests
//!
//! A manifest records every blob one publish produced. It is built while the
//! publish runs, persisted per build id, and read by the download gate to
//! decide which blob names a build actually owns.

use crate::error::{ArtifactError, Result};
use crate::utils::names::validate_build_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::Tabled;
use tracing::debug;
use uuid::Uuid;

/// One uploaded blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub container_name: String,
    pub blob_name: String,
    /// Absolute URL without any SAS token
    pub blob_url: String,
}

impl Blob {
    pub fn new<C: Into<String>, N: Into<String>, U: Into<String>>(
        container_name: C,
        blob_name: N,
        blob_url: U,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            blob_name: blob_name.into(),
            blob_url: blob_url.into(),
        }
    }
}

/// Record of what one publish uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub publish_id: Uuid,
    pub storage_account: String,
    pub container_name: String,
    pub allow_anonymous_access: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub individual_blobs: Vec<Blob>,
    #[serde(default)]
    pub archive_blob: Option<Blob>,
}

impl ArtifactManifest {
    /// Exact-name lookup, archive first, then individual blobs in order
    pub fn find(&self, blob_name: &str) -> Option<&Blob> {
        self.archive_blob
            .iter()
            .chain(self.individual_blobs.iter())
            .find(|blob| blob.blob_name == blob_name)
    }

    pub fn uploaded_count(&self) -> usize {
        self.individual_blobs.len() + usize::from(self.archive_blob.is_some())
    }

    /// Flat rows for table output
    pub fn entries(&self) -> Vec<ManifestEntry> {
        self.archive_blob
            .iter()
            .map(|blob| ManifestEntry::new("archive", blob))
            .chain(
                self.individual_blobs
                    .iter()
                    .map(|blob| ManifestEntry::new("file", blob)),
            )
            .collect()
    }
}

/// Display row for `manifest show`
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ManifestEntry {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Blob")]
    pub blob_name: String,
    #[tabled(rename = "URL")]
    pub blob_url: String,
}

impl ManifestEntry {
    fn new(kind: &str, blob: &Blob) -> Self {
        Self {
            kind: kind.to_string(),
            blob_name: blob.blob_name.clone(),
            blob_url: blob.blob_url.clone(),
        }
    }
}

/// Collects blobs for one publish call
#[derive(Debug)]
pub struct ManifestBuilder {
    storage_account: String,
    container_name: String,
    allow_anonymous_access: bool,
    individual_blobs: Vec<Blob>,
    archive_blob: Option<Blob>,
}

impl ManifestBuilder {
    pub fn new<A: Into<String>, C: Into<String>>(
        storage_account: A,
        container_name: C,
        allow_anonymous_access: bool,
    ) -> Self {
        Self {
            storage_account: storage_account.into(),
            container_name: container_name.into(),
            allow_anonymous_access,
            individual_blobs: Vec::new(),
            archive_blob: None,
        }
    }

    /// Record an individual blob; a repeated name keeps its first position
    pub fn add_individual(&mut self, blob: Blob) {
        if let Some(existing) = self
            .individual_blobs
            .iter_mut()
            .find(|b| b.blob_name == blob.blob_name)
        {
            *existing = blob;
        } else {
            self.individual_blobs.push(blob);
        }
    }

    pub fn set_archive(&mut self, blob: Blob) {
        self.archive_blob = Some(blob);
    }

    pub fn len(&self) -> usize {
        self.individual_blobs.len() + usize::from(self.archive_blob.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn build(self) -> ArtifactManifest {
        ArtifactManifest {
            publish_id: Uuid::new_v4(),
            storage_account: self.storage_account,
            container_name: self.container_name,
            allow_anonymous_access: self.allow_anonymous_access,
            created_at: Utc::now(),
            individual_blobs: self.individual_blobs,
            archive_blob: self.archive_blob,
        }
    }
}

/// Directory of manifests, one JSON file per build id
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, build_id: &str) -> Result<PathBuf> {
        if !validate_build_id(build_id) {
            return Err(ArtifactError::invalid_argument(format!(
                "Invalid build id '{build_id}'"
            )));
        }
        Ok(self.dir.join(format!("{build_id}.json")))
    }

    /// Persist a manifest, replacing any earlier one for the build
    pub async fn save(&self, build_id: &str, manifest: &ArtifactManifest) -> Result<PathBuf> {
        let path = self.path_for(build_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string_pretty(manifest)?;
        // Readers only ever see a complete file: write aside, then rename over
        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = tempfile::NamedTempFile::new_in(&dir)?;
            file.write_all(json.as_bytes())?;
            file.as_file().sync_all()?;
            file.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ArtifactError::config(format!("Manifest write task failed: {e}")))??;
        debug!("Wrote manifest for build '{}' to {}", build_id, path.display());

        Ok(path)
    }

    /// Load the manifest for a build; a missing file is `NotFound`
    pub async fn load(&self, build_id: &str) -> Result<ArtifactManifest> {
        let path = self.path_for(build_id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::not_found(format!("manifest for build '{build_id}'")));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&content)?)
    }
}
