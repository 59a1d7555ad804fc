use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One content line that survived filtering, tagged with where it physically came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRecord {
    pub text: String,
    pub source_file: PathBuf,
    pub line: usize,
}

impl LineRecord {
    pub fn new(text: impl Into<String>, source_file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
            line,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source_file.display(), self.line, self.text)
    }
}

/// Which directive keyword a line started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Include,
    Require,
    Divert,
}

impl DirectiveKind {
    /// Prefixes in match priority order.
    pub const ALL: [DirectiveKind; 3] = [
        DirectiveKind::Include,
        DirectiveKind::Require,
        DirectiveKind::Divert,
    ];

    /// Literal prefix including the trailing space.
    pub fn prefix(self) -> &'static str {
        match self {
            DirectiveKind::Include => "include ",
            DirectiveKind::Require => "require ",
            DirectiveKind::Divert => "divert ",
        }
    }

    pub fn keyword(self) -> &'static str {
        self.prefix().trim_end()
    }
}

/// A parsed directive line: keyword plus the unquoted target reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub target: String,
}

impl Directive {
    /// Targets starting with `/` resolve against the rooted base, not the including file.
    pub fn is_rooted(&self) -> bool {
        self.target.starts_with('/')
    }
}

/// Result of classifying one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'a> {
    Blank,
    /// Comment marker or shorter than two characters.
    Comment,
    Directive(Directive),
    Content(&'a str),
}
