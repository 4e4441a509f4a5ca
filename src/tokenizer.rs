//! SQL text tokenizer.
//!
//! Splits a parameterized statement into alternating static fragments and
//! parameter markers, skipping over quoted literals and comments so that a
//! `?` inside either is never mistaken for a marker.

use crate::error::{Error, Result};

/// Server `sql_mode` bits that change quoting and escape rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlMode {
    /// `NO_BACKSLASH_ESCAPES`: backslash is an ordinary character inside
    /// string literals.
    pub no_backslash_escapes: bool,
    /// `ANSI_QUOTES`: double quotes delimit identifiers, not string literals.
    pub ansi_quotes: bool,
}

/// One segment of a tokenized statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Verbatim statement text (may contain comments and quoted literals)
    Static(String),
    /// A `?` parameter marker
    Param,
}

/// Scan past a quoted region starting at `start` (the opening quote).
///
/// Returns the index just after the closing quote. A doubled quote is always
/// an escape; backslash is an escape only when `backslash_escapes`.
pub(crate) fn scan_quoted(
    bytes: &[u8],
    start: usize,
    quote: u8,
    backslash_escapes: bool,
) -> Result<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        i += 1;
    }
    Err(Error::Parse(format!(
        "unterminated {} quote starting at byte {}",
        quote as char, start
    )))
}

/// Scan past a `/* … */` block comment starting at `start` (the slash).
///
/// Returns the index just after the closing `*/`. Block comments do not nest.
pub(crate) fn scan_block_comment(bytes: &[u8], start: usize) -> Result<usize> {
    match memchr::memmem::find(&bytes[start + 2..], b"*/") {
        Some(pos) => Ok(start + 2 + pos + 2),
        None => Err(Error::Parse(format!(
            "unterminated block comment starting at byte {}",
            start
        ))),
    }
}

/// Scan past a line comment starting at `start` (`#` or the first `-`).
///
/// Returns the index just after the terminating newline, or end of input.
pub(crate) fn scan_line_comment(bytes: &[u8], start: usize) -> usize {
    match memchr::memchr(b'\n', &bytes[start..]) {
        Some(pos) => start + pos + 1,
        None => bytes.len(),
    }
}

/// Returns true if `--` at `i` starts a line comment.
///
/// MySQL requires `--` to be followed by whitespace (or end of input) to count
/// as a comment; `a--b` is double negation.
pub(crate) fn is_dash_comment(bytes: &[u8], i: usize) -> bool {
    bytes.get(i) == Some(&b'-')
        && bytes.get(i + 1) == Some(&b'-')
        && match bytes.get(i + 2) {
            None => true,
            Some(b) => matches!(b, b' ' | b'\t' | b'\r' | b'\n'),
        }
}

/// Whether backslash escapes apply inside a region opened by `quote`.
///
/// Backticks never honor backslash escapes. Double quotes delimit identifiers
/// under `ANSI_QUOTES`, where backslash is ordinary as well.
pub(crate) fn backslash_escapes_in(quote: u8, mode: SqlMode) -> bool {
    if mode.no_backslash_escapes || quote == b'`' {
        return false;
    }
    if quote == b'"' && mode.ansi_quotes {
        return false;
    }
    true
}

/// Tokenize a statement into alternating static fragments and `?` markers.
///
/// Static fragments keep the original text verbatim, comments included. Zero
/// markers is valid and produces a single static segment.
pub fn tokenize(sql: &str, mode: SqlMode) -> Result<Vec<Segment>> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut static_start = 0usize;
    let mut i = 0usize;

    // Static boundaries only ever land on ASCII delimiters, so slicing is
    // always on a char boundary; from_utf8 guards the invariant anyway.
    let mut flush_static = |segments: &mut Vec<Segment>, start: usize, end: usize| -> Result<()> {
        if start < end {
            let text = std::str::from_utf8(&bytes[start..end])
                .map_err(|e| Error::Parse(format!("invalid UTF-8 in statement: {}", e)))?;
            segments.push(Segment::Static(text.to_string()));
        }
        Ok(())
    };

    while i < bytes.len() {
        match bytes[i] {
            b'?' => {
                flush_static(&mut segments, static_start, i)?;
                segments.push(Segment::Param);
                i += 1;
                static_start = i;
            }
            quote @ (b'\'' | b'"' | b'`') => {
                i = scan_quoted(bytes, i, quote, backslash_escapes_in(quote, mode))?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = scan_block_comment(bytes, i)?;
            }
            b'#' => {
                i = scan_line_comment(bytes, i);
            }
            b'-' if is_dash_comment(bytes, i) => {
                i = scan_line_comment(bytes, i);
            }
            _ => {
                i += 1;
            }
        }
    }

    flush_static(&mut segments, static_start, bytes.len())?;

    if segments.is_empty() {
        segments.push(Segment::Static(String::new()));
    }

    Ok(segments)
}

/// Count the parameter markers in a segmentation.
pub fn param_count(segments: &[Segment]) -> usize {
    segments.iter().filter(|s| matches!(s, Segment::Param)).count()
}
