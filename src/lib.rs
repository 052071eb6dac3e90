//! azartifacts - build artifacts on Azure Blob Storage
//!
//! Publishes build outputs to a blob container, records what was uploaded in
//! an artifact manifest, and serves those artifacts back through a download
//! gate that redirects to short-lived signed URLs.

pub mod blob;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod publish;
pub mod utils;

// Re-export commonly used types
pub use error::{ArtifactError, Result};
