//! Resolution of raw publish/fetch inputs into effective paths

/// Include pattern used when none is given
pub const DEFAULT_INCLUDE: &str = "**/*";

/// Archive blob name, excluded from matching unless explicitly requested
pub const ARCHIVE_NAME: &str = "archive.zip";

/// Effective paths for one publish or fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub include: String,
    pub exclude: Option<String>,
    /// Blob name prefix, always ending in `/` when present
    pub virtual_path: Option<String>,
    pub container: String,
}

/// Turn token-expanded user input into [`ResolvedPaths`].
///
/// The container name is only trimmed and lower-cased here; whether it is a
/// legal name is decided later.
pub fn resolve(
    raw_include: &str,
    raw_exclude: &str,
    raw_virtual_path: &str,
    raw_container: &str,
    include_archive_zips: bool,
) -> ResolvedPaths {
    let include = match raw_include.trim() {
        "" => DEFAULT_INCLUDE.to_string(),
        trimmed => trimmed.to_string(),
    };

    let mut exclude = raw_exclude.trim().to_string();
    if !include_archive_zips {
        if exclude.is_empty() {
            exclude = ARCHIVE_NAME.to_string();
        } else {
            exclude = format!("{exclude},{ARCHIVE_NAME}");
        }
    }

    // Blob names never start with '/', or the gate could not address them
    let virtual_path = match raw_virtual_path.trim().trim_start_matches('/') {
        "" => None,
        trimmed if trimmed.ends_with('/') => Some(trimmed.to_string()),
        trimmed => Some(format!("{trimmed}/")),
    };

    ResolvedPaths {
        include,
        exclude: (!exclude.is_empty()).then_some(exclude),
        virtual_path,
        container: raw_container.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let paths = resolve("", "", "", "My-Artifacts ", false);
        assert_eq!(paths.include, "**/*");
        assert_eq!(paths.exclude.as_deref(), Some("archive.zip"));
        assert_eq!(paths.virtual_path, None);
        assert_eq!(paths.container, "my-artifacts");
    }

    #[test]
    fn test_exclude_joined_with_archive() {
        let paths = resolve("out/**", " *.log ", "", "c", false);
        assert_eq!(paths.exclude.as_deref(), Some("*.log,archive.zip"));
    }

    #[test]
    fn test_archive_inclusion_leaves_exclude_alone() {
        assert_eq!(resolve("", "", "", "c", true).exclude, None);
        assert_eq!(
            resolve("", "tmp/", "", "c", true).exclude.as_deref(),
            Some("tmp/")
        );
    }

    #[test]
    fn test_virtual_path_gets_single_trailing_slash() {
        assert_eq!(
            resolve("", "", " builds/42 ", "c", false).virtual_path.as_deref(),
            Some("builds/42/")
        );
        assert_eq!(
            resolve("", "", "builds/42/", "c", false).virtual_path.as_deref(),
            Some("builds/42/")
        );
        assert_eq!(resolve("", "", "   ", "c", false).virtual_path, None);
    }

    #[test]
    fn test_virtual_path_leading_slashes_dropped() {
        assert_eq!(
            resolve("", "", "/builds", "c", false).virtual_path.as_deref(),
            Some("builds/")
        );
        assert_eq!(
            resolve("", "", "//builds/42/", "c", false).virtual_path.as_deref(),
            Some("builds/42/")
        );
        assert_eq!(resolve("", "", " / ", "c", false).virtual_path, None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let first = resolve("bin/*", "*.pdb", "drop", "Releases", false);
        let second = resolve("bin/*", "*.pdb", "drop", "Releases", false);
        assert_eq!(first, second);
    }
}
