//! Runtime configuration for virtual files

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Policy knobs applied to persistent-backed files at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Flush the stream after every write so data is durable when the call returns
    pub flush_on_write: bool,
    /// Warn about zero-length reads (debug builds only)
    pub warn_on_zero_read: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            flush_on_write: true,
            warn_on_zero_read: true,
        }
    }
}

impl FileConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load a configuration file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
