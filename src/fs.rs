//! Filesystem access used by the line stream.
//!
//! Paths are normalized lexically: `.` and `..` are folded and relative
//! paths are anchored at the working directory, but symlinks are never
//! resolved.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Component, Path, PathBuf};

pub trait SourceFs {
    /// Directory that relative paths are anchored at.
    fn working_dir(&self) -> &Path;

    fn is_file(&self, path: &Path) -> bool;

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead>>;

    /// Absolute, lexically cleaned form of `path`.
    fn normalize(&self, path: &Path) -> PathBuf {
        normalize_lexically(&self.working_dir().join(path))
    }
}

/// Fold `.` and `..` components without touching the disk.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // never climb above the root
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The real disk.
#[derive(Debug, Clone)]
pub struct OsFs {
    cwd: PathBuf,
}

impl OsFs {
    /// Anchored at the process working directory, captured once.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir()?,
        })
    }

    pub fn with_working_dir(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl SourceFs for OsFs {
    fn working_dir(&self) -> &Path {
        &self.cwd
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Files held in memory, keyed by normalized absolute path.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    cwd: PathBuf,
    files: HashMap<PathBuf, String>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryFs {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            files: HashMap::new(),
        }
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let key = self.normalize(path.as_ref());
        self.files.insert(key, content.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }
}

impl SourceFs for MemoryFs {
    fn working_dir(&self) -> &Path {
        &self.cwd
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        match self.files.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone().into_bytes()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }
}
