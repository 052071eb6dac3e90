//! Azure Blob Storage access
//!
//! This module defines the backend seam used by publishing, fetching and the
//! download gate, its Azure implementation, and the account pre-flight check.

pub mod azure;
pub mod backend;
pub mod models;
pub mod validator;

// Re-export commonly used types
pub use azure::AzureBlobBackend;
pub use backend::BlobBackend;
pub use models::*;
pub use validator::validate_account;
