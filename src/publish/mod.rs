//! Artifact publishing
//!
//! Path resolution, upload planning, file selection, the publish operation
//! itself, and the manifest it produces.

pub mod files;
pub mod manifest;
pub mod orchestrator;
pub mod planner;
pub mod resolver;
pub mod status;
pub mod step;

pub use files::{AntPattern, FileMatcher, GlobMatcher, MatchedFile, PatternSet};
pub use manifest::{ArtifactManifest, Blob, ManifestBuilder, ManifestStore};
pub use orchestrator::{PublishReport, Publisher, UploadRequest};
pub use planner::{plan_mode, UploadMode};
pub use resolver::{resolve, ResolvedPaths};
pub use status::BuildStatus;
pub use step::{run_publish_step, StepOutcome};
