//! Marker search and comment/string skipping.
//!
//! All functions here are pure: they take the buffer as bytes plus an offset
//! and report where scanning should resume. Every marker is ASCII, so the
//! returned offsets always fall on UTF-8 character boundaries.

use crate::error::DiagnosticKind;
use crate::token::{Marker, MarkerKind};

/// Where to resume after skipping a comment or string, and whether it was
/// cut short by end of buffer
pub(crate) type Skip = (usize, Option<DiagnosticKind>);

/// Find the nearest `//`, `/*`, `"` or `` ` `` at or after `from`
pub(crate) fn next_marker(bytes: &[u8], from: usize) -> Option<Marker> {
    let mut i = from;
    while i < bytes.len() {
        let kind = match bytes[i] {
            b'`' => Some((MarkerKind::Directive, 1)),
            b'"' => Some((MarkerKind::StringQuote, 1)),
            b'/' => match bytes.get(i + 1) {
                Some(b'/') => Some((MarkerKind::LineComment, 2)),
                Some(b'*') => Some((MarkerKind::BlockComment, 2)),
                _ => None,
            },
            _ => None,
        };
        if let Some((kind, len)) = kind {
            return Some(Marker {
                start: i,
                end: i + len,
                kind,
            });
        }
        i += 1;
    }
    None
}

/// Skip a `//` comment whose body starts at `from`; resumes after the newline
pub(crate) fn skip_line_comment(bytes: &[u8], from: usize) -> Skip {
    match find(bytes, from, b"\n") {
        Some(pos) => (pos + 1, None),
        None => (bytes.len(), Some(DiagnosticKind::UnterminatedLineComment)),
    }
}

/// Skip a `/*` comment whose body starts at `from`; resumes after `*/`
pub(crate) fn skip_block_comment(bytes: &[u8], from: usize) -> Skip {
    match find(bytes, from, b"*/") {
        Some(pos) => (pos + 2, None),
        None => (bytes.len(), Some(DiagnosticKind::UnterminatedBlockComment)),
    }
}

/// Skip a string literal whose body starts at `from`; resumes after the
/// closing quote. A quote preceded by an odd run of backslashes is escaped.
pub(crate) fn skip_string(bytes: &[u8], from: usize) -> Skip {
    let mut i = from;
    while let Some(pos) = find(bytes, i, b"\"") {
        let backslashes = bytes[from..pos]
            .iter()
            .rev()
            .take_while(|&&c| c == b'\\')
            .count();
        if backslashes % 2 == 0 {
            return (pos + 1, None);
        }
        i = pos + 1;
    }
    (bytes.len(), Some(DiagnosticKind::UnterminatedString))
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
