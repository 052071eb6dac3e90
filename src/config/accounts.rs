//! Storage account records and lookup

use crate::utils::helpers::{account_url, normalize_blob_endpoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;
use zeroize::Zeroizing;

/// Identity of a target storage backend
#[derive(Clone, Serialize, Deserialize, Tabled)]
pub struct StorageAccountInfo {
    #[serde(rename = "name")]
    #[tabled(rename = "Account")]
    pub account_name: String,
    #[serde(rename = "key")]
    #[tabled(skip)]
    pub account_key: Zeroizing<String>,
    #[serde(default)]
    #[tabled(rename = "Blob Endpoint")]
    pub blob_endpoint: String,
}

impl StorageAccountInfo {
    pub fn new<N: Into<String>, K: Into<String>, E: Into<String>>(
        account_name: N,
        account_key: K,
        blob_endpoint: E,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            account_key: Zeroizing::new(account_key.into()),
            blob_endpoint: blob_endpoint.into(),
        }
    }

    /// Base URL of the account's blob service, without a trailing slash
    pub fn account_url(&self) -> String {
        account_url(&self.account_name, &self.blob_endpoint)
    }
}

impl fmt::Debug for StorageAccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccountInfo")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("blob_endpoint", &self.blob_endpoint)
            .finish()
    }
}

/// Read-only snapshot of the configured storage accounts.
///
/// Handed explicitly to every publish, fetch and gate evaluation.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: Vec<StorageAccountInfo>,
}

impl AccountRegistry {
    pub fn new(accounts: Vec<StorageAccountInfo>) -> Self {
        Self { accounts }
    }

    /// Look up an account by exact name, returning a copy with its endpoint normalized
    pub fn storage_account(&self, name: &str) -> Option<StorageAccountInfo> {
        if name.trim().is_empty() {
            return None;
        }

        self.accounts
            .iter()
            .find(|account| account.account_name == name)
            .map(|account| {
                let mut account = account.clone();
                account.blob_endpoint = normalize_blob_endpoint(&account.blob_endpoint);
                account
            })
    }

    pub fn accounts(&self) -> &[StorageAccountInfo] {
        &self.accounts
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AccountRegistry {
        AccountRegistry::new(vec![
            StorageAccountInfo::new("buildcache", "c2VjcmV0", "blob.core.windows.net/"),
            StorageAccountInfo::new("emulator", "ZGV2", "http://127.0.0.1:10000/devstoreaccount1"),
        ])
    }

    #[test]
    fn test_lookup_normalizes_endpoint() {
        let account = registry().storage_account("buildcache").unwrap();
        assert_eq!(account.blob_endpoint, "https://blob.core.windows.net");
        assert_eq!(account.account_url(), "https://buildcache.blob.core.windows.net");
    }

    #[test]
    fn test_lookup_leaves_registry_untouched() {
        let registry = registry();
        let _ = registry.storage_account("buildcache");
        assert_eq!(registry.accounts()[0].blob_endpoint, "blob.core.windows.net/");
    }

    #[test]
    fn test_custom_endpoint_is_account_url() {
        let account = registry().storage_account("emulator").unwrap();
        assert_eq!(account.account_url(), "http://127.0.0.1:10000/devstoreaccount1");
    }

    #[test]
    fn test_unknown_and_blank_names() {
        let registry = registry();
        assert!(registry.storage_account("missing").is_none());
        assert!(registry.storage_account("   ").is_none());
        assert!(registry.storage_account("BuildCache").is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let account = StorageAccountInfo::new("buildcache", "c2VjcmV0", "");
        let rendered = format!("{account:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("c2VjcmV0"));
    }
}
