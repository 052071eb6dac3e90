//! Configuration management module
//!
//! This module handles configuration loading, validation, and persistence
//! from configuration files, environment variables, and default values,
//! plus the storage account snapshot handed to each operation.

pub mod accounts;
pub mod settings;

pub use accounts::*;
pub use settings::*;
