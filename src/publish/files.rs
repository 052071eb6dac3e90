//! Workspace file selection and archiving
//!
//! Patterns are Ant-style globs separated by commas: `*` and `?` stay within
//! one path segment, `**` spans segments, and a trailing `/` means
//! "everything below". Matching is done against `/`-separated relative paths.

use crate::error::{ArtifactError, Result};
use crate::utils::helpers::to_blob_path;
use regex::Regex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Version-control and OS metadata never picked up from a workspace
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.git",
    "**/.svn/**",
    "**/.hg/**",
    "**/.DS_Store",
];

/// A single compiled Ant-style pattern
#[derive(Debug, Clone)]
pub struct AntPattern {
    source: String,
    regex: Regex,
}

impl AntPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let mut normalized = pattern.trim().replace('\\', "/");
        while let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        }
        if normalized.ends_with('/') {
            normalized.push_str("**");
        }

        let regex = Regex::new(&glob_to_regex(&normalized))?;
        Ok(Self {
            source: normalized,
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Include/exclude pattern lists compiled from comma-separated strings
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: Vec<AntPattern>,
    exclude: Vec<AntPattern>,
}

impl PatternSet {
    pub fn new(include: &str, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: compile_list(include)?,
            exclude: match exclude {
                Some(exclude) => compile_list(exclude)?,
                None => Vec::new(),
            },
        })
    }

    /// Same as [`PatternSet::new`] with the version-control excludes added
    pub fn with_default_excludes(include: &str, exclude: Option<&str>) -> Result<Self> {
        let mut set = Self::new(include, exclude)?;
        for pattern in DEFAULT_EXCLUDES {
            set.exclude.push(AntPattern::new(pattern)?);
        }
        Ok(set)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.include.iter().any(|p| p.matches(path)) && !self.exclude.iter().any(|p| p.matches(path))
    }
}

fn compile_list(patterns: &str) -> Result<Vec<AntPattern>> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(AntPattern::new)
        .collect()
}

/// A workspace file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Path relative to the workspace root with `/` separators
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

impl MatchedFile {
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Enumerates workspace files for a publish
pub trait FileMatcher: Send + Sync {
    /// Matching files in stable order
    fn match_files(&self, root: &Path, include: &str, exclude: Option<&str>)
        -> Result<Vec<MatchedFile>>;
}

/// Directory walker filtering with Ant-style patterns
#[derive(Debug, Clone, Default)]
pub struct GlobMatcher;

impl GlobMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl FileMatcher for GlobMatcher {
    fn match_files(
        &self,
        root: &Path,
        include: &str,
        exclude: Option<&str>,
    ) -> Result<Vec<MatchedFile>> {
        if !root.is_dir() {
            return Err(ArtifactError::config(format!(
                "Workspace '{}' is not a directory",
                root.display()
            )));
        }

        let patterns = PatternSet::with_default_excludes(include, exclude)?;
        let mut matched = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => to_blob_path(relative),
                Err(_) => continue,
            };

            if patterns.matches(&relative) {
                debug!("Matched {}", relative);
                matched.push(MatchedFile {
                    relative_path: relative,
                    absolute_path: entry.path().to_path_buf(),
                });
            }
        }

        Ok(matched)
    }
}

/// Zip the files (relative paths preserved) through a temporary file and
/// return the archive bytes
pub fn create_archive(files: &[MatchedFile]) -> Result<Vec<u8>> {
    let mut temp = tempfile::tempfile()?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    {
        let mut zip = ZipWriter::new(&mut temp);
        for file in files {
            zip.start_file(file.relative_path.as_str(), options)?;
            let mut source = File::open(&file.absolute_path)?;
            std::io::copy(&mut source, &mut zip)?;
        }
        zip.finish()?;
    }

    temp.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    temp.read_to_end(&mut bytes)?;
    Ok(bytes)
}
