//! Build-step wrapper around [`Publisher::publish`]
//!
//! Turns the result of a publish into a build status. Errors never escape:
//! they are logged and the build is marked unstable.

use crate::config::AccountRegistry;
use crate::publish::manifest::{ArtifactManifest, ManifestStore};
use crate::publish::orchestrator::{Publisher, UploadRequest};
use crate::publish::status::BuildStatus;
use tracing::{error, info, warn};

/// What a publish step did to the build
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: BuildStatus,
    pub uploaded: usize,
    /// The stored manifest, when anything was uploaded
    pub manifest: Option<ArtifactManifest>,
}

impl StepOutcome {
    fn unchanged(status: BuildStatus) -> Self {
        Self {
            status,
            uploaded: 0,
            manifest: None,
        }
    }

    fn unstable(status: BuildStatus) -> Self {
        Self::unchanged(status.worse_of(BuildStatus::Unstable))
    }
}

pub async fn run_publish_step(
    publisher: &Publisher,
    request: &UploadRequest,
    status: BuildStatus,
    registry: &AccountRegistry,
    store: &ManifestStore,
    build_id: &str,
) -> StepOutcome {
    let report = match publisher.publish(request, status, registry).await {
        Ok(report) => report,
        Err(err) if !err.downgrades_build() => {
            info!("{}", err);
            return StepOutcome::unchanged(status);
        }
        Err(err) => {
            error!(
                account = err.account().unwrap_or(&request.storage_account),
                "Failed to upload files to Azure Blob Storage: {}", err
            );
            return StepOutcome::unstable(status);
        }
    };

    if report.uploaded == 0 {
        if request.do_not_fail_if_nothing_uploaded {
            info!("No files uploaded to Azure Blob Storage");
            return StepOutcome::unchanged(status);
        }
        warn!("No files uploaded to Azure Blob Storage, marking build unstable");
        return StepOutcome::unstable(status);
    }

    if let Err(err) = store.save(build_id, &report.manifest).await {
        error!("Failed to store artifact manifest for build '{}': {}", build_id, err);
        return StepOutcome::unstable(status);
    }

    info!("Uploaded {} artifact(s) for build '{}'", report.uploaded, build_id);
    StepOutcome {
        status,
        uploaded: report.uploaded,
        manifest: Some(report.manifest),
    }
}
