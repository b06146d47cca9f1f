//! Directive grammars.
//!
//! [`DIRECTIVES`] is tried in order at every backtick; the first matcher that
//! accepts the text wins. A backtick nothing accepts is ordinary text.

use crate::token::{identifier_len, is_identifier_continue};

/// A recognised compiler directive and its argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Directive<'a> {
    Include(&'a str),
    Define(&'a str),
    Undef(&'a str),
    ResetAll,
    Ifdef(&'a str),
    Else,
    Endif,
    Ifndef(&'a str),
}

/// A directive matched at `start`, consumed up to `end`.
///
/// `keyword_end` is the offset just past the backtick keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirectiveMatch<'a> {
    pub directive: Directive<'a>,
    pub start: usize,
    pub keyword_end: usize,
    pub end: usize,
}

type Matcher = for<'a> fn(&'a str, usize) -> Option<DirectiveMatch<'a>>;

/// Directive matchers in priority order
pub(crate) const DIRECTIVES: [(&str, Matcher); 8] = [
    ("include", match_include),
    ("define", match_define),
    ("undef", match_undef),
    ("resetall", match_resetall),
    ("ifdef", match_ifdef),
    ("else", match_else),
    ("endif", match_endif),
    ("ifndef", match_ifndef),
];

/// Try every grammar at the backtick at `start`
pub(crate) fn match_directive(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    DIRECTIVES
        .iter()
        .find_map(|(_, matcher)| matcher(content, start))
}

fn match_include(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    let bytes = content.as_bytes();
    let keyword_end = keyword(bytes, start, "include")?;
    let open = whitespace(bytes, keyword_end, false)?;
    if bytes.get(open) != Some(&b'"') {
        return None;
    }
    let len = bytes[open + 1..]
        .iter()
        .take_while(|&&c| c != b'"' && c != b'\n')
        .count();
    let close = open + 1 + len;
    if len == 0 || bytes.get(close) != Some(&b'"') {
        return None;
    }
    Some(DirectiveMatch {
        directive: Directive::Include(&content[open + 1..close]),
        start,
        keyword_end,
        end: close + 1,
    })
}

fn match_define(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    named(content, start, "define", false, Directive::Define)
}

fn match_undef(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    named(content, start, "undef", true, Directive::Undef)
}

fn match_resetall(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    bare(content, start, "resetall", Directive::ResetAll)
}

fn match_ifdef(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    named(content, start, "ifdef", true, Directive::Ifdef)
}

fn match_else(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    bare(content, start, "else", Directive::Else)
}

fn match_endif(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    bare(content, start, "endif", Directive::Endif)
}

fn match_ifndef(content: &str, start: usize) -> Option<DirectiveMatch<'_>> {
    named(content, start, "ifndef", true, Directive::Ifndef)
}

/// `` `keyword <ws> NAME ``
fn named<'a>(
    content: &'a str,
    start: usize,
    name: &str,
    newlines: bool,
    build: fn(&'a str) -> Directive<'a>,
) -> Option<DirectiveMatch<'a>> {
    let bytes = content.as_bytes();
    let keyword_end = keyword(bytes, start, name)?;
    let ident = whitespace(bytes, keyword_end, newlines)?;
    let len = identifier_len(bytes, ident);
    if len == 0 {
        return None;
    }
    Some(DirectiveMatch {
        directive: build(&content[ident..ident + len]),
        start,
        keyword_end,
        end: ident + len,
    })
}

/// `` `keyword `` followed by a non-identifier byte or end of buffer
fn bare<'a>(
    content: &'a str,
    start: usize,
    name: &str,
    directive: Directive<'a>,
) -> Option<DirectiveMatch<'a>> {
    let bytes = content.as_bytes();
    let keyword_end = keyword(bytes, start, name)?;
    if bytes
        .get(keyword_end)
        .is_some_and(|&c| is_identifier_continue(c))
    {
        return None;
    }
    Some(DirectiveMatch {
        directive,
        start,
        keyword_end,
        end: keyword_end,
    })
}

fn keyword(bytes: &[u8], start: usize, name: &str) -> Option<usize> {
    let rest = bytes.get(start..)?.strip_prefix(b"`")?;
    rest.starts_with(name.as_bytes())
        .then_some(start + 1 + name.len())
}

/// Skip at least one whitespace byte; `newlines` allows line breaks too
fn whitespace(bytes: &[u8], from: usize, newlines: bool) -> Option<usize> {
    let len = bytes
        .get(from..)?
        .iter()
        .take_while(|&&c| {
            if newlines {
                c.is_ascii_whitespace()
            } else {
                c == b' ' || c == b'\t'
            }
        })
        .count();
    (len > 0).then_some(from + len)
}
