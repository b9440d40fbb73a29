//! Configuration for the banter binaries.
//!
//! Paths and model defaults are resolved once at the binary boundary and
//! passed into the library components by value; no component reads process
//! environment state on its own.

use std::env;
use std::path::PathBuf;

/// Model used when neither the caller, the template, nor the conversation
/// history names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Shorthand names accepted by `--model`, resolved before the remote call.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("4o", "gpt-4o"),
    ("4o-mini", "gpt-4o-mini"),
    ("4", "gpt-4"),
    ("4-turbo", "gpt-4-turbo"),
    ("chatgpt", "gpt-3.5-turbo"),
    ("3.5", "gpt-3.5-turbo"),
];

/// Resolve a model name against an alias table.
///
/// Unknown names pass through unchanged so new provider models work without
/// a banter release.
pub fn resolve_model_alias(aliases: &[(&str, &str)], name: &str) -> String {
    for (alias, model) in aliases {
        if *alias == name {
            return model.to_string();
        }
    }
    name.to_string()
}

/// Resolved filesystem configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite log database.
    pub log_path: PathBuf,

    /// Directory holding prompt templates (`<name>.yaml`).
    pub templates_dir: PathBuf,
}

impl Config {
    /// Build a configuration from explicit paths.
    pub fn new(log_path: PathBuf, templates_dir: PathBuf) -> Self {
        Self {
            log_path,
            templates_dir,
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// `BANTER_LOG_PATH` and `BANTER_TEMPLATES_PATH` override the defaults,
    /// which live under `$XDG_DATA_HOME/banter` or `~/.banter`.
    pub fn from_env() -> Self {
        let base = base_dir();
        let log_path = env::var_os("BANTER_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("logs.db"));
        let templates_dir = env::var_os("BANTER_TEMPLATES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("templates"));
        Self {
            log_path,
            templates_dir,
        }
    }
}

fn base_dir() -> PathBuf {
    if let Some(data) = env::var_os("XDG_DATA_HOME") {
        PathBuf::from(data).join("banter")
    } else if let Some(home) = env::var_os("HOME") {
        PathBuf::from(home).join(".banter")
    } else {
        PathBuf::from(".banter")
    }
}
