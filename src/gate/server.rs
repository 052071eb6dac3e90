//! HTTP front of the download gate
//!
//! Routes:
//! - `GET {mount_prefix}/{build_id}/{*blob}`: redirect to the artifact or to login
//! - `GET /healthz`: liveness

use crate::blob::backend::BlobBackend;
use crate::config::{AccountRegistry, Config};
use crate::error::{ArtifactError, Result};
use crate::gate::download::{authorize, Caller, DownloadRequest, GateDecision, GatePolicy};
use crate::publish::manifest::ManifestStore;
use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state handed to every request
#[derive(Clone)]
pub struct GateState {
    pub store: ManifestStore,
    pub registry: Arc<AccountRegistry>,
    pub backend: Arc<dyn BlobBackend>,
    pub policy: GatePolicy,
    /// Lower-case name of the header carrying the caller's identity
    pub identity_header: String,
}

impl GateState {
    pub fn from_config(config: &Config, backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            store: ManifestStore::new(&config.manifest_dir),
            registry: Arc::new(config.account_registry()),
            backend,
            policy: GatePolicy::from_server_config(&config.server),
            identity_header: config.server.identity_header.to_ascii_lowercase(),
        }
    }
}

impl IntoResponse for GateDecision {
    fn into_response(self) -> Response {
        match self {
            GateDecision::Redirect(location) | GateDecision::Login { location } => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            GateDecision::Reject { status, message } => (status, message).into_response(),
        }
    }
}

/// Build the gate router with `mount_prefix` in front of the artifact route
pub fn router(state: GateState, mount_prefix: &str) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            &format!("{mount_prefix}/{{build_id}}/{{*blob}}"),
            get(download_artifact),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn download_artifact(
    State(state): State<GateState>,
    Path((build_id, blob)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let manifest = match state.store.load(&build_id).await {
        Ok(manifest) => manifest,
        Err(ArtifactError::NotFound { .. } | ArtifactError::InvalidArgument(_)) => {
            info!("No artifact manifest for build '{}'", build_id);
            return GateDecision::not_available().into_response();
        }
        Err(err) => {
            error!("Failed to load manifest for build '{}': {}", build_id, err);
            return GateDecision::reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error occurred while downloading artifact: {err}"),
            )
            .into_response();
        }
    };

    let identity = headers
        .get(state.identity_header.as_str())
        .and_then(|value| value.to_str().ok());
    let original_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let request = DownloadRequest::from_path_suffix(
        &blob,
        Caller::from_identity(identity),
        &original_uri,
    );

    authorize(
        &request,
        &manifest,
        &state.policy,
        &state.registry,
        state.backend.as_ref(),
    )
    .await
    .into_response()
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: GateState, addr: &str, mount_prefix: &str) -> Result<()> {
    let app = router(state, mount_prefix);
    let listener = TcpListener::bind(addr).await?;

    info!("Artifact gate listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
