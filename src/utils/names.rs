//! Naming rules for Azure containers, blobs, and build identifiers
//!
//! Container names follow the DNS-label rules Azure enforces: 3-63
//! characters of lowercase letters, digits and single hyphens, starting and
//! ending with a letter or digit.

const MIN_CONTAINER_LENGTH: usize = 3;
const MAX_CONTAINER_LENGTH: usize = 63;
const MAX_BLOB_NAME_LENGTH: usize = 1024;
const MAX_BLOB_PATH_SEGMENTS: usize = 254;

/// Special container addressing the account root
pub const ROOT_CONTAINER: &str = "$root";

/// Check if a name is a valid Azure blob container name
pub fn validate_container_name(name: &str) -> bool {
    if name == ROOT_CONTAINER {
        return true;
    }

    if name.len() < MIN_CONTAINER_LENGTH || name.len() > MAX_CONTAINER_LENGTH {
        return false;
    }

    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Check if a name is usable as a blob name
pub fn validate_blob_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_BLOB_NAME_LENGTH {
        return false;
    }

    if name.ends_with('.') || name.ends_with('/') {
        return false;
    }

    name.split('/').count() <= MAX_BLOB_PATH_SEGMENTS
}

/// Build identifiers become manifest file names, so keep them to a safe alphabet
pub fn validate_build_id(build_id: &str) -> bool {
    if build_id.is_empty() || build_id == "." || build_id == ".." {
        return false;
    }

    build_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
