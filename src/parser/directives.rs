use super::types::{Directive, DirectiveKind, LineClass};

/// Line prefixes that mark a comment.
pub const COMMENT_PREFIXES: [&str; 5] = ["!", ";", "#", "//", "--"];

/// Check if an already trimmed line is a comment (or too short to mean anything)
pub fn is_comment(trimmed: &str) -> bool {
    trimmed.chars().count() < 2 || COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Strip whitespace, then any surrounding double quotes, from a directive argument.
/// Spaces inside the quotes are part of the name.
pub fn unquote_target(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

/// Match a trimmed line against the directive prefixes in priority order.
pub fn parse_directive(trimmed: &str) -> Option<Directive> {
    DirectiveKind::ALL.iter().find_map(|&kind| {
        trimmed.strip_prefix(kind.prefix()).map(|rest| Directive {
            kind,
            target: unquote_target(rest).to_string(),
        })
    })
}

/// Classify one physical line. Content text is returned trimmed.
pub fn classify_line(physical: &str) -> LineClass<'_> {
    let trimmed = physical.trim();
    if trimmed.is_empty() {
        return LineClass::Blank;
    }
    if is_comment(trimmed) {
        return LineClass::Comment;
    }
    match parse_directive(trimmed) {
        Some(directive) => LineClass::Directive(directive),
        None => LineClass::Content(trimmed),
    }
}
