//! Service configuration.
//!
//! Settings are loaded once at startup (optionally from a TOML file) and
//! threaded explicitly into the orchestrator, formatter, and handlers; there
//! is no ambient global configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::AnalysisFlags;

/// Runtime settings for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory for per-job workspaces.
    pub output_dir: PathBuf,
    /// Base URL of the inference server.
    pub engine_url: String,
    /// Backend label reported in batch responses.
    pub backend: String,
    /// Enable formula detection in the engine.
    pub formula_enable: bool,
    /// Enable table detection in the engine.
    pub table_enable: bool,
    /// Keep job workspaces on disk after completion (debugging).
    pub keep_workspaces: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            engine_url: "http://127.0.0.1:9000".to_string(),
            backend: "pipeline".to_string(),
            formula_enable: true,
            table_enable: true,
            keep_workspaces: false,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, falling back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Engine feature toggles derived from the settings.
    pub fn analysis_flags(&self) -> AnalysisFlags {
        AnalysisFlags {
            formula_enable: self.formula_enable,
            table_enable: self.table_enable,
        }
    }
}
