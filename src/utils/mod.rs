//! Utility functions module
//!
//! This module contains naming rules, token substitution, endpoint helpers,
//! table formatting, and progress display.

pub mod format;
pub mod helpers;
pub mod names;
pub mod progress;
pub mod tokens;

pub use format::*;
pub use helpers::*;
pub use names::*;
pub use tokens::*;
