//! Artifact download gate
//!
//! Serves published artifacts through redirects to short-lived signed URLs,
//! after checking the caller against the build's access policy.

pub mod download;
pub mod server;

pub use download::{authorize, Caller, DownloadRequest, GateDecision, GatePolicy};
pub use server::{router, serve, GateState};
