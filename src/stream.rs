//! Directive-resolving line stream.
//!
//! `DirectiveLineStream` reads a file lazily and yields its content lines,
//! splicing in the files named by `include`, `require` and `divert`
//! directives depth-first. Open files are kept on an explicit stack of
//! frames: a successful directive pushes a frame, exhaustion pops it, and a
//! `divert` marks the including frame so it is popped together with its
//! child.
//!
//! A target starting with `/` is rooted: one leading `/` is dropped and the
//! rest is joined onto the rooted base (the working directory unless
//! configured). A second `/` leaves an absolute filesystem path.
//!
//! Only direct self-reference is guarded against. A longer cycle (`a`
//! includes `b` includes `a`) recurses until something gives out unless
//! `StreamConfig::max_depth` is set.

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::fs::{OsFs, SourceFs};
use crate::parser::{classify_line, Directive, DirectiveKind, LineClass, LineRecord};
use log::{debug, trace};
use std::io::{self, BufRead};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

/// Lifecycle of a stream. There is no way back to an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Root file opened, nothing read yet.
    Open,
    Reading,
    /// Exhausted, failed or closed explicitly. All handles are released.
    Closed,
}

/// Read cursor over one open file.
struct FileFrame {
    path: PathBuf,
    base_dir: PathBuf,
    reader: Box<dyn BufRead>,
    line_number: usize,
    /// Set when this file handed off to a `divert` target.
    diverted: bool,
}

impl FileFrame {
    /// `path` must already be normalized.
    fn open<F: SourceFs>(fs: &F, path: PathBuf) -> Result<Self> {
        let reader = fs.open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StreamError::FileNotFound { path: path.clone() },
            _ => StreamError::io(&path, e),
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.clone());

        Ok(Self {
            path,
            base_dir,
            reader,
            line_number: 0,
            diverted: false,
        })
    }

    /// Next physical line, counting it before any filtering happens.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self
            .reader
            .read_line(&mut buf)
            .map_err(|e| StreamError::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(buf))
    }
}

pub struct DirectiveLineStream<F: SourceFs = OsFs> {
    fs: F,
    file_path: PathBuf,
    base_directory: PathBuf,
    rooted_base: PathBuf,
    max_depth: Option<usize>,
    frames: Vec<FileFrame>,
    /// Lines consumed from the root file once its frame is gone.
    root_consumed: usize,
    phase: StreamPhase,
}

impl DirectiveLineStream<OsFs> {
    /// Open `path` on disk with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StreamConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: StreamConfig) -> Result<Self> {
        let fs = OsFs::new().map_err(|e| StreamError::io(".", e))?;
        Self::with_fs(path, fs, config)
    }
}

impl<F: SourceFs> DirectiveLineStream<F> {
    /// Open `path` through `fs`. Fails with `FileNotFound` if it is not an existing file.
    pub fn with_fs(path: impl AsRef<Path>, fs: F, config: StreamConfig) -> Result<Self> {
        let file_path = fs.normalize(path.as_ref());
        if !fs.is_file(&file_path) {
            return Err(StreamError::FileNotFound { path: file_path });
        }

        let root = FileFrame::open(&fs, file_path.clone())?;
        let base_directory = root.base_dir.clone();
        let rooted_base = match config.rooted_base {
            Some(dir) => fs.normalize(&dir),
            None => fs.working_dir().to_path_buf(),
        };
        debug!("opened {}", file_path.display());

        Ok(Self {
            fs,
            file_path,
            base_directory,
            rooted_base,
            max_depth: config.max_depth,
            frames: vec![root],
            root_consumed: 0,
            phase: StreamPhase::Open,
        })
    }

    /// Absolute path of the root file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Directory relative targets in the root file resolve against.
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn rooted_base(&self) -> &Path {
        &self.rooted_base
    }

    /// Physical lines read so far from the root file, comments and directives included.
    pub fn current_line_number(&self) -> usize {
        self.frames
            .first()
            .map_or(self.root_consumed, |root| root.line_number)
    }

    /// Number of files currently open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// File and line of the innermost open file.
    pub fn current_location(&self) -> Option<(&Path, usize)> {
        self.frames
            .last()
            .map(|frame| (frame.path.as_path(), frame.line_number))
    }

    pub fn state(&self) -> StreamPhase {
        self.phase
    }

    /// Release every open handle. Further iteration yields nothing.
    pub fn close(&mut self) {
        if let Some(root) = self.frames.first() {
            self.root_consumed = root.line_number;
        }
        self.frames.clear();
        self.phase = StreamPhase::Closed;
    }

    fn advance(&mut self) -> Result<Option<LineRecord>> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };
            let physical = frame.read_line()?;
            let line_number = frame.line_number;

            let Some(physical) = physical else {
                self.leave_frame();
                continue;
            };

            match classify_line(&physical) {
                LineClass::Blank | LineClass::Comment => {
                    trace!("skip line {}", line_number);
                }
                LineClass::Content(text) => {
                    let source = self.current_path();
                    return Ok(Some(LineRecord::new(text, source, line_number)));
                }
                LineClass::Directive(directive) => {
                    self.enter_directive(directive, line_number)?;
                }
            }
        }
    }

    fn current_path(&self) -> PathBuf {
        self.frames
            .last()
            .map(|frame| frame.path.clone())
            .unwrap_or_default()
    }

    /// Pop the exhausted frame, plus any parents that diverted into it.
    fn leave_frame(&mut self) {
        while let Some(frame) = self.frames.pop() {
            debug!(
                "finished {} after {} lines",
                frame.path.display(),
                frame.line_number
            );
            if self.frames.is_empty() {
                self.root_consumed = frame.line_number;
            }
            match self.frames.last() {
                Some(parent) if parent.diverted => continue,
                _ => break,
            }
        }
    }

    fn resolve_target(&self, directive: &Directive, base_dir: &Path) -> PathBuf {
        let joined = if directive.is_rooted() {
            let rest = directive.target.strip_prefix('/').unwrap_or(&directive.target);
            self.rooted_base.join(rest)
        } else {
            base_dir.join(&directive.target)
        };
        self.fs.normalize(&joined)
    }

    fn enter_directive(&mut self, directive: Directive, line_number: usize) -> Result<()> {
        let Some(current) = self.frames.last() else {
            return Ok(());
        };
        let target = self.resolve_target(&directive, &current.base_dir);
        let keyword = directive.kind.keyword();

        if target == current.path {
            debug!(
                "{}:{}: ignoring self-referencing {}",
                current.path.display(),
                line_number,
                keyword
            );
            return Ok(());
        }

        if !self.fs.is_file(&target) {
            if directive.kind == DirectiveKind::Require {
                return Err(StreamError::RequiredFileNotFound {
                    path: target,
                    included_from: current.path.clone(),
                    line: line_number,
                });
            }
            debug!(
                "{}:{}: skipping {} of missing {}",
                current.path.display(),
                line_number,
                keyword,
                target.display()
            );
            return Ok(());
        }

        if let Some(limit) = self.max_depth {
            if self.frames.len() > limit {
                return Err(StreamError::DepthLimitExceeded {
                    path: target,
                    limit,
                });
            }
        }

        debug!(
            "{}:{}: {} {}",
            current.path.display(),
            line_number,
            keyword,
            target.display()
        );
        let child = FileFrame::open(&self.fs, target)?;
        if directive.kind == DirectiveKind::Divert {
            if let Some(current) = self.frames.last_mut() {
                current.diverted = true;
            }
        }
        self.frames.push(child);
        Ok(())
    }
}

impl<F: SourceFs> Iterator for DirectiveLineStream<F> {
    type Item = Result<LineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.phase {
            StreamPhase::Closed => return None,
            StreamPhase::Open => self.phase = StreamPhase::Reading,
            StreamPhase::Reading => {}
        }

        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                debug!("stream failed: {}", e);
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl<F: SourceFs> FusedIterator for DirectiveLineStream<F> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn texts(stream: DirectiveLineStream<MemoryFs>) -> Vec<String> {
        stream
            .map(|r| r.map(|rec| rec.text))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_stack_unwinds_through_nested_includes() {
        let fs = MemoryFs::new("/p")
            .with_file("a.txt", "a1\ninclude b.txt\na2\n")
            .with_file("b.txt", "b1\ninclude c/c.txt\nb2\n")
            .with_file("c/c.txt", "c1\n");
        let stream = DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(texts(stream), ["a1", "b1", "c1", "b2", "a2"]);
    }

    #[test]
    fn test_nested_divert_pops_every_diverted_parent() {
        let fs = MemoryFs::new("/p")
            .with_file("a.txt", "a1\ninclude b.txt\na2\n")
            .with_file("b.txt", "b1\ndivert c.txt\nb-never\n")
            .with_file("c.txt", "c1\ndivert d.txt\nc-never\n")
            .with_file("d.txt", "d1\n");
        let stream = DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(texts(stream), ["a1", "b1", "c1", "d1", "a2"]);
    }

    #[test]
    fn test_phase_transitions() {
        let fs = MemoryFs::new("/p").with_file("a.txt", "one\n");
        let mut stream =
            DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(stream.state(), StreamPhase::Open);
        assert_eq!(stream.depth(), 1);

        assert!(stream.next().is_some());
        assert_eq!(stream.state(), StreamPhase::Reading);

        assert!(stream.next().is_none());
        assert_eq!(stream.state(), StreamPhase::Closed);
        assert_eq!(stream.depth(), 0);
        assert_eq!(stream.current_line_number(), 1);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_location_tracks_innermost_file() {
        let fs = MemoryFs::new("/p")
            .with_file("a.txt", "# head\ninclude b.txt\n")
            .with_file("b.txt", "\nb1\n");
        let mut stream =
            DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        let rec = stream.next().unwrap().unwrap();
        assert_eq!(rec.line, 2);
        assert_eq!(stream.current_location(), Some((Path::new("/p/b.txt"), 2)));
        assert_eq!(stream.current_line_number(), 2);
    }

    #[test]
    fn test_spaces_inside_quotes_pick_the_spaced_file() {
        let fs = MemoryFs::new("/p")
            .with_file("a.txt", "include \" b.txt\"\nafter\n")
            .with_file(" b.txt", "spaced\n")
            .with_file("b.txt", "unspaced\n");
        let stream = DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(texts(stream), ["spaced", "after"]);
    }

    #[test]
    fn test_rooted_target_defaults_to_working_dir() {
        let fs = MemoryFs::new("/w")
            .with_file("deep/a.txt", "include /shared/c.txt\n")
            .with_file("deep/shared/c.txt", "wrong\n")
            .with_file("shared/c.txt", "c1\n");
        let mut stream =
            DirectiveLineStream::with_fs("deep/a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(stream.rooted_base(), Path::new("/w"));

        let rec = stream.next().unwrap().unwrap();
        assert_eq!(rec.text(), "c1");
        assert_eq!(rec.source_file(), Path::new("/w/shared/c.txt"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_only_one_leading_slash_is_dropped() {
        let fs = MemoryFs::new("/w")
            .with_file("a.txt", "include //etc/c.txt\n")
            .with_file("etc/c.txt", "under base\n")
            .with_file("/etc/c.txt", "absolute\n");
        let stream = DirectiveLineStream::with_fs("a.txt", fs, StreamConfig::default()).unwrap();
        assert_eq!(texts(stream), ["absolute"]);
    }

    #[test]
    fn test_paths_reported_after_normalization() {
        let fs = MemoryFs::new("/w").with_file("conf/main.txt", "x1\n");
        let config = StreamConfig::default().with_rooted_base("../srv/./root");
        let stream = DirectiveLineStream::with_fs("conf/../conf/main.txt", fs, config).unwrap();

        assert_eq!(stream.file_path(), Path::new("/w/conf/main.txt"));
        assert_eq!(stream.base_directory(), Path::new("/w/conf"));
        assert_eq!(stream.rooted_base(), Path::new("/srv/root"));
    }
}
