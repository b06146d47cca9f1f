/// Check if a byte can start a Verilog identifier (letter or underscore)
pub const fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// Check if a byte can continue a Verilog identifier (letter, digit, underscore or `$`)
pub const fn is_identifier_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Lexically significant markers the scanner stops at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    /// `//`
    LineComment,
    /// `/*`
    BlockComment,
    /// `"`
    StringQuote,
    /// `` ` ``
    Directive,
}

/// A marker found in a buffer, spanning `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Marker {
    pub start: usize,
    pub end: usize,
    pub kind: MarkerKind,
}

/// Length of the identifier starting at `pos`, or 0 if none starts there
pub(crate) fn identifier_len(bytes: &[u8], pos: usize) -> usize {
    match bytes.get(pos) {
        Some(&c) if is_identifier_start(c) => {
            1 + bytes[pos + 1..]
                .iter()
                .take_while(|&&c| is_identifier_continue(c))
                .count()
        }
        _ => 0,
    }
}
