use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(
        "Required file not found: {} (required from {}:{})",
        path.display(),
        included_from.display(),
        line
    )]
    RequiredFileNotFound {
        path: PathBuf,
        included_from: PathBuf,
        line: usize,
    },

    #[error("Include depth limit of {limit} exceeded at {}", path.display())]
    DepthLimitExceeded { path: PathBuf, limit: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StreamError::Io {
            path: path.into(),
            source,
        }
    }
}
