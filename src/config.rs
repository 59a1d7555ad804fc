use crate::error::{Result, StreamError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs for a `DirectiveLineStream`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Where `/`-rooted targets resolve. `None` means the working directory.
    pub rooted_base: Option<PathBuf>,
    /// Maximum number of nested included files. `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl StreamConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| StreamError::io(path, e))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| StreamError::Config(e.to_string()))
    }

    pub fn with_rooted_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rooted_base = Some(dir.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
