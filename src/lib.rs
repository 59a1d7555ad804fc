//! Line-oriented preprocessor that flattens `include`, `require` and
//! `divert` directives into a single stream of content lines.

pub mod config;
pub mod error;
pub mod fs;
pub mod parser;
pub mod stream;

pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use fs::{MemoryFs, OsFs, SourceFs};
pub use parser::{DirectiveKind, LineRecord};
pub use stream::{DirectiveLineStream, StreamPhase};

use std::path::Path;

/// Read every content line reachable from `path` on disk.
pub fn flatten_file(path: impl AsRef<Path>, config: StreamConfig) -> Result<Vec<LineRecord>> {
    DirectiveLineStream::open_with_config(path, config)?.collect()
}
