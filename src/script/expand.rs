//! `${NAME}` variable expansion for script arguments.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid marker pattern"));

/// Variable lookup for the expander: script-level ENV pairs layered over the
/// process environment. Script pairs shadow the environment.
#[derive(Debug, Default, Clone)]
pub struct Vars {
    overlay: HashMap<String, String>,
}

impl Vars {
    /// Lookup backed only by the process environment.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Registers a script-level pair for subsequent lookups.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.overlay.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.overlay
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Replaces every `${NAME}` marker in `raw`. Unset names expand to the
    /// empty string; expansion never fails the build. Runs before argument
    /// validation so validation sees fully-resolved values.
    pub fn expand(&self, raw: &str) -> String {
        VAR_PATTERN
            .replace_all(raw, |caps: &regex::Captures<'_>| {
                self.get(&caps[1]).unwrap_or_default()
            })
            .into_owned()
    }
}
