//! General utility helper functions
//!
//! This module contains helpers for blob endpoint handling, blob name
//! construction, and human-readable sizes.

use std::path::Path;
use url::Url;

/// Public Azure blob endpoint used when an account has none configured
pub const DEFAULT_BLOB_ENDPOINT: &str = "https://blob.core.windows.net";

/// Normalize a configured blob endpoint.
///
/// Blank endpoints fall back to the public Azure endpoint, a missing scheme
/// becomes `https://`, and trailing slashes are stripped.
pub fn normalize_blob_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return DEFAULT_BLOB_ENDPOINT.to_string();
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    with_scheme.trim_end_matches('/').to_string()
}

/// Build the blob service URL for an account.
///
/// Generic `blob.*` endpoints get the account name prepended to the host;
/// anything else (emulators, private endpoints) already addresses the account.
pub fn account_url(account_name: &str, endpoint: &str) -> String {
    let endpoint = normalize_blob_endpoint(endpoint);

    if let Ok(mut url) = Url::parse(&endpoint) {
        if let Some(host) = url.host_str().map(str::to_string) {
            if host.starts_with("blob.") && url.set_host(Some(&format!("{account_name}.{host}"))).is_ok() {
                return url.as_str().trim_end_matches('/').to_string();
            }
        }
    }

    endpoint
}

/// Convert a relative path into a blob-style name with forward slashes
pub fn to_blob_path(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Prefix a blob name with an optional virtual directory
pub fn join_blob_name(virtual_path: Option<&str>, name: &str) -> String {
    match virtual_path {
        Some(prefix) => format!("{prefix}{name}"),
        None => name.to_string(),
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
