//! Reader and writer options.

use serde::{Deserialize, Serialize};

use crate::error::{NotationError, Result};

/// Options for reading MusicXML documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Fail on malformed notation markers, invalid durations and unsupported
    /// notation elements instead of logging and skipping them
    pub strict: bool,
}

impl ReaderOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| NotationError::InvalidInput(format!("reader options: {}", e)))
    }
}

/// Options for writing MusicXML documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Write everything on one line without indentation
    pub minify: bool,

    /// MusicXML version written to the DOCTYPE and the root element
    pub version: String,

    /// Spaces per nesting level when not minified
    pub indent: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            minify: false,
            version: "4.0".to_string(),
            indent: 2,
        }
    }
}

impl WriterOptions {
    pub fn minified() -> Self {
        Self {
            minify: true,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| NotationError::InvalidInput(format!("writer options: {}", e)))
    }
}
