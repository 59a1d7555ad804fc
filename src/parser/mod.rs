mod directives;
mod types;

pub use directives::{classify_line, is_comment, parse_directive, unquote_target, COMMENT_PREFIXES};
pub use types::{Directive, DirectiveKind, LineClass, LineRecord};
