// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader editor settings, stored as RON.

use crate::codegen::DEFAULT_INCLUDE_FILE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default pass list of the shader descriptor
pub const DEFAULT_PASS: &str = "MAIN";

/// Default extension of session files
pub const DEFAULT_SESSION_EXTENSION: &str = "sed";

/// Settings of a shader editor session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderEditorSettings {
    /// File pulled in by `#include` at the top of every generated source
    pub include_file: String,
    /// Pass names written to the shader descriptor
    pub passes: Vec<String>,
    /// Maximum undo depth, unbounded when `None`
    pub history_limit: Option<usize>,
    /// Extension of session files
    pub session_extension: String,
}

impl Default for ShaderEditorSettings {
    fn default() -> Self {
        Self {
            include_file: DEFAULT_INCLUDE_FILE.to_string(),
            passes: vec![DEFAULT_PASS.to_string()],
            history_limit: None,
            session_extension: DEFAULT_SESSION_EXTENSION.to_string(),
        }
    }
}

impl ShaderEditorSettings {
    /// Load settings from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!(target: crate::LOG_TARGET, "No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        ron::from_str(content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Render settings as pretty RON text
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        ron::ser::to_string_pretty(self, config).map_err(|e| SettingsError::Serialize(e.to_string()))
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Settings could not be rendered
    #[error("Serialization error: {0}")]
    Serialize(String),
}
