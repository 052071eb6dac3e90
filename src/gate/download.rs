//! Authorization of artifact download requests
//!
//! [`authorize`] decides what one retrieval request gets: a redirect to a
//! signed blob URL, a redirect to the login page, or a rejection. It holds no
//! state between requests and never retries.

use crate::blob::backend::BlobBackend;
use crate::config::{AccountRegistry, ServerConfig};
use crate::error::ArtifactError;
use crate::publish::manifest::ArtifactManifest;
use axum::http::StatusCode;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const MISSING_ACCOUNT_MESSAGE: &str = "Azure Storage account global configuration is missing";
pub const NOT_AVAILABLE_MESSAGE: &str = "Azure artifact is not available";

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Authenticated(String),
    Anonymous,
}

impl Caller {
    /// Interpret the identity header set by the fronting proxy
    pub fn from_identity(identity: Option<&str>) -> Self {
        match identity.map(str::trim) {
            None | Some("") => Self::Anonymous,
            Some(name) if name.eq_ignore_ascii_case("anonymous") => Self::Anonymous,
            Some(name) => Self::Authenticated(name.to_string()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Requested blob name, without a leading slash
    pub blob_name: String,
    pub caller: Caller,
    /// Path and query of the incoming request, used as the login return target
    pub original_uri: String,
}

impl DownloadRequest {
    pub fn from_path_suffix(suffix: &str, caller: Caller, original_uri: &str) -> Self {
        Self {
            blob_name: suffix.strip_prefix('/').unwrap_or(suffix).to_string(),
            caller,
            original_uri: original_uri.to_string(),
        }
    }
}

/// Server-wide settings the gate applies to every request
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub global_security_enabled: bool,
    pub login_path: String,
    pub sas_ttl: Duration,
    pub sign_timeout: Duration,
}

impl GatePolicy {
    pub fn from_server_config(server: &ServerConfig) -> Self {
        Self {
            global_security_enabled: server.global_security_enabled,
            login_path: server.login_path.clone(),
            sas_ttl: server.sas_ttl(),
            sign_timeout: server.sign_timeout(),
        }
    }

    fn login_location(&self, original_uri: &str) -> String {
        let from: String = url::form_urlencoded::byte_serialize(original_uri.as_bytes()).collect();
        format!("{}?from={}", self.login_path, from)
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from_server_config(&ServerConfig::default())
    }
}

/// What the gate answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Temporary redirect to the signed blob URL
    Redirect(String),
    /// Redirect to the login endpoint
    Login { location: String },
    Reject { status: StatusCode, message: String },
}

impl GateDecision {
    pub fn reject<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self::Reject {
            status,
            message: message.into(),
        }
    }

    pub fn not_available() -> Self {
        Self::reject(StatusCode::NOT_FOUND, NOT_AVAILABLE_MESSAGE)
    }
}

pub async fn authorize(
    request: &DownloadRequest,
    manifest: &ArtifactManifest,
    policy: &GatePolicy,
    registry: &AccountRegistry,
    backend: &dyn BlobBackend,
) -> GateDecision {
    let Some(account) = registry.storage_account(&manifest.storage_account) else {
        error!(
            "Storage account '{}' referenced by the manifest is not configured",
            manifest.storage_account
        );
        return GateDecision::reject(StatusCode::INTERNAL_SERVER_ERROR, MISSING_ACCOUNT_MESSAGE);
    };

    if policy.global_security_enabled
        && !manifest.allow_anonymous_access
        && request.caller.is_anonymous()
    {
        debug!("Anonymous request for '{}' sent to login", request.blob_name);
        return GateDecision::Login {
            location: policy.login_location(&request.original_uri),
        };
    }

    let Some(blob) = manifest.find(&request.blob_name) else {
        warn!("Artifact '{}' is not in the manifest", request.blob_name);
        return GateDecision::not_available();
    };

    let signed = tokio::time::timeout(
        policy.sign_timeout,
        backend.signed_download_query(&account, &blob.container_name, policy.sas_ttl),
    )
    .await
    .map_err(|_| ArtifactError::Timeout)
    .and_then(|result| result);

    match signed {
        Ok(query) => GateDecision::Redirect(format!("{}?{}", blob.blob_url, query)),
        Err(err) => {
            error!("Failed to sign download of '{}': {}", blob.blob_name, err);
            GateDecision::reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error occurred while downloading artifact: {err}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::backend::MockBlobBackend;
    use crate::config::StorageAccountInfo;
    use crate::publish::manifest::{Blob, ManifestBuilder};

    const URL: &str = "https://acct.blob.core.windows.net/my-artifacts";

    fn registry() -> AccountRegistry {
        AccountRegistry::new(vec![StorageAccountInfo::new("acct", "a2V5", "")])
    }

    fn manifest(allow_anonymous_access: bool) -> ArtifactManifest {
        let mut builder = ManifestBuilder::new("acct", "my-artifacts", allow_anonymous_access);
        builder.add_individual(Blob::new("my-artifacts", "a.txt", format!("{URL}/a.txt")));
        builder.add_individual(Blob::new("my-artifacts", "sub/b.txt", format!("{URL}/sub/b.txt")));
        builder.set_archive(Blob::new("my-artifacts", "archive.zip", format!("{URL}/archive.zip")));
        builder.build()
    }

    fn request(blob: &str, caller: Caller) -> DownloadRequest {
        DownloadRequest::from_path_suffix(blob, caller, &format!("/artifacts/42/{blob}"))
    }

    fn signing_backend() -> MockBlobBackend {
        let mut backend = MockBlobBackend::new();
        backend
            .expect_signed_download_query()
            .times(1)
            .returning(|_, container, _| {
                assert_eq!(container, "my-artifacts");
                Ok("sv=2021&sig=abc".to_string())
            });
        backend
    }

    fn user() -> Caller {
        Caller::Authenticated("alice".to_string())
    }

    #[test]
    fn test_caller_from_identity() {
        assert_eq!(Caller::from_identity(None), Caller::Anonymous);
        assert_eq!(Caller::from_identity(Some("  ")), Caller::Anonymous);
        assert_eq!(Caller::from_identity(Some("anonymous")), Caller::Anonymous);
        assert_eq!(Caller::from_identity(Some("bob")), Caller::Authenticated("bob".to_string()));
    }

    #[test]
    fn test_path_suffix_strips_one_leading_slash() {
        let req = DownloadRequest::from_path_suffix("/sub/b.txt", Caller::Anonymous, "/x");
        assert_eq!(req.blob_name, "sub/b.txt");

        let req = DownloadRequest::from_path_suffix("//sub/b.txt", Caller::Anonymous, "/x");
        assert_eq!(req.blob_name, "/sub/b.txt");
    }

    #[tokio::test]
    async fn test_archive_hit_redirects_to_signed_url() {
        let decision = authorize(
            &request("archive.zip", user()),
            &manifest(false),
            &GatePolicy::default(),
            &registry(),
            &signing_backend(),
        )
        .await;

        assert_eq!(
            decision,
            GateDecision::Redirect(format!("{URL}/archive.zip?sv=2021&sig=abc"))
        );
    }

    #[tokio::test]
    async fn test_nested_individual_blob_redirects() {
        let decision = authorize(
            &request("/sub/b.txt", user()),
            &manifest(false),
            &GatePolicy::default(),
            &registry(),
            &signing_backend(),
        )
        .await;

        assert_eq!(
            decision,
            GateDecision::Redirect(format!("{URL}/sub/b.txt?sv=2021&sig=abc"))
        );
    }

    #[tokio::test]
    async fn test_miss_is_not_available() {
        let decision = authorize(
            &request("missing.txt", user()),
            &manifest(false),
            &GatePolicy::default(),
            &registry(),
            &MockBlobBackend::new(),
        )
        .await;

        assert_eq!(decision, GateDecision::not_available());
    }

    #[tokio::test]
    async fn test_anonymous_caller_sent_to_login() {
        let decision = authorize(
            &request("a.txt", Caller::Anonymous),
            &manifest(false),
            &GatePolicy::default(),
            &registry(),
            &MockBlobBackend::new(),
        )
        .await;

        assert_eq!(
            decision,
            GateDecision::Login {
                location: "/login?from=%2Fartifacts%2F42%2Fa.txt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_anonymous_allowed_by_manifest_or_security_off() {
        let decision = authorize(
            &request("a.txt", Caller::Anonymous),
            &manifest(true),
            &GatePolicy::default(),
            &registry(),
            &signing_backend(),
        )
        .await;
        assert!(matches!(decision, GateDecision::Redirect(_)));

        let policy = GatePolicy {
            global_security_enabled: false,
            ..GatePolicy::default()
        };
        let decision = authorize(
            &request("a.txt", Caller::Anonymous),
            &manifest(false),
            &policy,
            &registry(),
            &signing_backend(),
        )
        .await;
        assert!(matches!(decision, GateDecision::Redirect(_)));
    }

    #[tokio::test]
    async fn test_missing_account_rejected_before_login_check() {
        let decision = authorize(
            &request("a.txt", Caller::Anonymous),
            &manifest(false),
            &GatePolicy::default(),
            &AccountRegistry::default(),
            &MockBlobBackend::new(),
        )
        .await;

        assert_eq!(
            decision,
            GateDecision::reject(StatusCode::INTERNAL_SERVER_ERROR, MISSING_ACCOUNT_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_signing_failure_is_server_error() {
        let mut backend = MockBlobBackend::new();
        backend
            .expect_signed_download_query()
            .returning(|a, _, _| Err(ArtifactError::authentication(&a.account_name, "key revoked")));

        let decision = authorize(
            &request("a.txt", user()),
            &manifest(false),
            &GatePolicy::default(),
            &registry(),
            &backend,
        )
        .await;

        match decision {
            GateDecision::Reject { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(message.starts_with("Error occurred while downloading artifact: "));
                assert!(message.contains("key revoked"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }
}
