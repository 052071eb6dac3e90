//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::config::accounts::{AccountRegistry, StorageAccountInfo};
use crate::error::{ArtifactError, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::Tabled;

/// Longest lifetime handed out for signed download URLs (seven days)
pub const MAX_SAS_TTL_MINUTES: u64 = 7 * 24 * 60;
/// Upper bound on how long the gate waits for a signature
pub const MAX_SIGN_TIMEOUT_SECS: u64 = 300;

/// Settings for the artifact download gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix the artifact routes are mounted under
    pub mount_prefix: String,
    /// Where anonymous callers are sent to authenticate
    pub login_path: String,
    pub global_security_enabled: bool,
    /// Request header carrying the authenticated principal, set by the fronting proxy
    pub identity_header: String,
    pub sign_timeout_secs: u64,
    pub sas_ttl_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mount_prefix: "/artifacts".to_string(),
            login_path: "/login".to_string(),
            global_security_enabled: true,
            identity_header: "x-remote-user".to_string(),
            sign_timeout_secs: 30,
            sas_ttl_minutes: 60,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout_secs)
    }

    pub fn sas_ttl(&self) -> Duration {
        Duration::from_secs(self.sas_ttl_minutes.saturating_mul(60))
    }

    /// Mount prefix with a leading slash and no trailing slash
    pub fn normalized_mount_prefix(&self) -> String {
        let trimmed = self.mount_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
#[serde(default)]
pub struct Config {
    #[tabled(rename = "Debug")]
    pub debug: bool,
    #[tabled(rename = "Manifest Directory", display_with = "display_path")]
    pub manifest_dir: PathBuf,
    #[tabled(skip)]
    pub storage_accounts: Vec<StorageAccountInfo>,
    #[tabled(skip)]
    pub server: ServerConfig,
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

impl Default for Config {
    fn default() -> Self {
        let manifest_dir = dirs::data_dir()
            .map(|dir| dir.join("aza").join("manifests"))
            .unwrap_or_else(|| PathBuf::from(".aza").join("manifests"));

        Self {
            debug: false,
            manifest_dir,
            storage_accounts: Vec::new(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for account in &self.storage_accounts {
            let name = account.account_name.trim();
            if name.is_empty() {
                return Err(ArtifactError::config("Storage account name is required"));
            }
            if account.account_key.trim().is_empty() {
                return Err(ArtifactError::config(format!(
                    "Storage account key is required for '{name}'"
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(ArtifactError::config(format!(
                    "Storage account '{name}' is configured more than once"
                )));
            }
        }

        if !(1..=MAX_SAS_TTL_MINUTES).contains(&self.server.sas_ttl_minutes) {
            return Err(ArtifactError::config(format!(
                "sas_ttl_minutes must be between 1 and {MAX_SAS_TTL_MINUTES}"
            )));
        }
        if !(1..=MAX_SIGN_TIMEOUT_SECS).contains(&self.server.sign_timeout_secs) {
            return Err(ArtifactError::config(format!(
                "sign_timeout_secs must be between 1 and {MAX_SIGN_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        // Use XDG Base Directory specification on Linux and macOS
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| ArtifactError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("aza").join("aza.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| ArtifactError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("aza").join("aza.toml"))
        }
    }

    /// Snapshot of the configured storage accounts for a single operation
    pub fn account_registry(&self) -> AccountRegistry {
        AccountRegistry::new(self.storage_accounts.clone())
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Environment variables (`AZA_` prefix, `__` between nested keys)
/// 2. Configuration file
/// 3. Default values
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = load_config_no_validation(path)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration without validation (for `config` commands)
pub fn load_config_no_validation(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::get_config_path()?,
    };

    let settings = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("AZA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize::<Config>()?)
}

pub async fn save_config(config: &Config, path: Option<&Path>) -> Result<PathBuf> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::get_config_path()?,
    };

    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)?;
    tokio::fs::write(&config_path, contents).await?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn account(name: &str, key: &str) -> StorageAccountInfo {
        StorageAccountInfo {
            account_name: name.to_string(),
            account_key: Zeroizing::new(key.to_string()),
            blob_endpoint: String::new(),
        }
    }

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.mount_prefix, "/artifacts");
        assert!(server.global_security_enabled);
        assert_eq!(server.sas_ttl(), Duration::from_secs(3600));
        assert_eq!(server.sign_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_mount_prefix_normalization() {
        let mut server = ServerConfig::default();
        server.mount_prefix = "artifacts/".to_string();
        assert_eq!(server.normalized_mount_prefix(), "/artifacts");
        server.mount_prefix = "/".to_string();
        assert_eq!(server.normalized_mount_prefix(), "");
    }

    #[test]
    fn test_validate_rejects_duplicate_accounts() {
        let mut config = Config::default();
        config.storage_accounts = vec![account("builds", "a2V5"), account("builds", "b3Ro")];
        assert!(matches!(config.validate(), Err(ArtifactError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        let mut config = Config::default();
        config.storage_accounts = vec![account("builds", "  ")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_gate_timings() {
        let mut config = Config::default();
        config.server.sas_ttl_minutes = u64::MAX;
        assert!(matches!(config.validate(), Err(ArtifactError::ConfigError(_))));
        assert_eq!(config.server.sas_ttl(), Duration::from_secs(u64::MAX));

        config.server.sas_ttl_minutes = MAX_SAS_TTL_MINUTES;
        assert!(config.validate().is_ok());

        config.server.sign_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.server.sign_timeout_secs = MAX_SIGN_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aza.toml");
        std::fs::write(
            &path,
            r#"
manifest_dir = "/var/lib/aza"

[[storage_accounts]]
name = "buildcache"
key = "c2VjcmV0"
blob_endpoint = "https://blob.core.windows.net/"

[server]
port = 9090
global_security_enabled = false
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.manifest_dir, PathBuf::from("/var/lib/aza"));
        assert_eq!(config.storage_accounts.len(), 1);
        assert_eq!(config.storage_accounts[0].account_name, "buildcache");
        assert_eq!(config.server.port, 9090);
        assert!(!config.server.global_security_enabled);
        // untouched keys keep their defaults
        assert_eq!(config.server.login_path, "/login");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.storage_accounts.is_empty());
        assert_eq!(config.server.port, 8080);
    }
}
