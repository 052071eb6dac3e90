//! Data models for blob storage operations

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Request for uploading one blob
#[derive(Debug, Clone)]
pub struct BlobUploadRequest {
    pub container: String,
    pub blob_name: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// A blob as reported by a container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct BlobItem {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Size", display_with = "display_size")]
    pub size: u64,
    #[tabled(rename = "Content-Type")]
    pub content_type: String,
}

fn display_size(size: &u64) -> String {
    crate::utils::helpers::format_size(*size)
}
