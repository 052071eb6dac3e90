//! Build-variable token substitution
//!
//! Raw job settings may reference build variables as `${NAME}` or `$NAME`.
//! Every raw string passes through a [`TokenResolver`] before it reaches
//! path resolution.

use crate::error::Result;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Expands build-variable tokens in raw settings
pub trait TokenResolver: Send + Sync {
    fn replace_tokens(&self, raw: &str) -> String;
}

/// Token resolver backed by a fixed variable map.
///
/// Unknown tokens are left exactly as written.
#[derive(Debug, Clone)]
pub struct EnvTokens {
    vars: HashMap<String, String>,
    pattern: Regex,
}

impl EnvTokens {
    pub fn new(vars: HashMap<String, String>) -> Result<Self> {
        let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")?;
        Ok(Self { vars, pattern })
    }

    /// Variables from the process environment, with an optional build id on top
    pub fn from_process_env(build_id: Option<&str>) -> Result<Self> {
        let mut vars: HashMap<String, String> = std::env::vars().collect();
        if let Some(build_id) = build_id {
            vars.insert("BUILD_ID".to_string(), build_id.to_string());
            vars.entry("BUILD_NUMBER".to_string())
                .or_insert_with(|| build_id.to_string());
        }
        Self::new(vars)
    }
}

impl TokenResolver for EnvTokens {
    fn replace_tokens(&self, raw: &str) -> String {
        self.pattern
            .replace_all(raw, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
