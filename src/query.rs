//! Statement classification for batch rewriting.
//!
//! A statement is classified once at prepare time. The resulting
//! [`ParsedQuery`] is immutable and may be shared read-only across every
//! batch of that statement.

use crate::error::{Error, Result};
use crate::tokenizer::{
    Segment, SqlMode, backslash_escapes_in, is_dash_comment, param_count, scan_block_comment,
    scan_line_comment, scan_quoted, tokenize,
};

/// The rewrite segmentation: statement text split around the single VALUES
/// tuple, so the tuple can be duplicated once per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RewriteSegments {
    /// Text up to and including the tuple's opening context
    /// (e.g. `INSERT INTO t(a,b) VALUES `)
    pub(crate) prefix: String,
    /// The tuple itself, parens included, split at parameter markers
    pub(crate) tuple: Vec<Segment>,
    /// Text after the tuple's closing paren, with the trailing `;`/comment
    /// tail trimmed; guaranteed to contain no parameter markers
    pub(crate) suffix: String,
}

/// An immutable, classified statement.
///
/// Created once per statement text; shared read-only across all batches of
/// that statement. Classification is a pure function of the text and the
/// `sql_mode` flags, so re-running it yields an identical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    sql: String,
    mode: SqlMode,
    /// Full segmentation of the original text, used for per-row execution
    segments: Vec<Segment>,
    /// Multi-statement segmentation: the statement with its trailing
    /// `;`/whitespace/comment tail trimmed, safe to join with `;`
    statement: Vec<Segment>,
    /// Rewrite segmentation, present only when `rewritable`
    rewrite: Option<RewriteSegments>,
    param_count: usize,
    multi_queryable: bool,
    is_call: bool,
}

impl ParsedQuery {
    /// Tokenize and classify a statement.
    pub fn parse(sql: &str, mode: SqlMode) -> Result<Self> {
        let segments = tokenize(sql, mode)?;
        let n_params = param_count(&segments);
        let bytes = sql.as_bytes();

        let scan = StructuralScan::run(bytes, mode)?;

        // A top-level ';' with significant content after it means a second
        // statement is already embedded in the text.
        let multi_statement = scan
            .top_semicolons
            .iter()
            .any(|&pos| next_significant(bytes, pos + 1, mode).is_some());

        // End of the joinable statement text: drop a single trailing ';' and
        // any trailing whitespace/comment tail.
        let mut joined_end = scan.last_significant_end;
        if joined_end > 0 && bytes[joined_end - 1] == b';' {
            joined_end -= 1;
        }
        let statement_text = std::str::from_utf8(&bytes[..joined_end])
            .map_err(|e| Error::Parse(format!("invalid UTF-8 in statement: {}", e)))?;
        let statement = tokenize(statement_text, mode)?;

        let core_start = next_significant(bytes, 0, mode).unwrap_or(bytes.len());
        let keyword_end = scan_word(bytes, core_start);
        let keyword = &bytes[core_start..keyword_end];

        let is_call = keyword.eq_ignore_ascii_case(b"CALL");
        let is_insert =
            keyword.eq_ignore_ascii_case(b"INSERT") || keyword.eq_ignore_ascii_case(b"REPLACE");
        let multi_queryable = !is_call && !multi_statement;

        let rewrite = if is_insert && !multi_statement {
            classify_rewrite(sql, mode, keyword_end, joined_end, &scan.param_positions)?
        } else {
            None
        };

        Ok(Self {
            sql: sql.to_string(),
            mode,
            segments,
            statement,
            rewrite,
            param_count: n_params,
            multi_queryable,
            is_call,
        })
    }

    /// The original statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The `sql_mode` flags the statement was classified under.
    pub fn mode(&self) -> SqlMode {
        self.mode
    }

    /// Number of `?` parameter markers.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// True when the statement is a single INSERT/REPLACE whose parameters
    /// all lie inside one VALUES tuple, safe to duplicate per row.
    pub fn rewritable(&self) -> bool {
        self.rewrite.is_some()
    }

    /// True when the statement is safe to join with `;` into one
    /// multi-statement round-trip.
    pub fn multi_queryable(&self) -> bool {
        self.multi_queryable
    }

    /// True for `CALL` statements, which are never merged.
    pub fn is_call(&self) -> bool {
        self.is_call
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn statement_segments(&self) -> &[Segment] {
        &self.statement
    }

    pub(crate) fn rewrite_segments(&self) -> Option<&RewriteSegments> {
        self.rewrite.as_ref()
    }
}

/// Positions gathered in one pass over the text, outside quotes and comments.
struct StructuralScan {
    param_positions: Vec<usize>,
    /// Positions of `;` at paren depth 0
    top_semicolons: Vec<usize>,
    /// End of the last non-comment, non-whitespace region
    last_significant_end: usize,
}

impl StructuralScan {
    fn run(bytes: &[u8], mode: SqlMode) -> Result<Self> {
        let mut param_positions = Vec::new();
        let mut top_semicolons = Vec::new();
        let mut last_significant_end = 0usize;
        let mut depth = 0usize;
        let mut i = 0usize;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'\'' | b'"' | b'`') => {
                    i = scan_quoted(bytes, i, quote, backslash_escapes_in(quote, mode))?;
                    last_significant_end = i;
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
                b' ' | b'\t' | b'\r' | b'\n' => {
                    i += 1;
                }
                b => {
                    match b {
                        b'?' => param_positions.push(i),
                        b'(' => depth += 1,
                        b')' => depth = depth.saturating_sub(1),
                        b';' if depth == 0 => top_semicolons.push(i),
                        _ => {}
                    }
                    i += 1;
                    last_significant_end = i;
                }
            }
        }

        Ok(Self {
            param_positions,
            top_semicolons,
            last_significant_end,
        })
    }
}

/// Index of the next significant (non-whitespace, non-comment) byte at or
/// after `i`, or `None` if only trailing whitespace/comments remain.
///
/// Malformed comments cannot occur here: tokenization already validated them.
fn next_significant(bytes: &[u8], mut i: usize, _mode: SqlMode) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = scan_block_comment(bytes, i).ok()?;
            }
            b'#' => i = scan_line_comment(bytes, i),
            b'-' if is_dash_comment(bytes, i) => i = scan_line_comment(bytes, i),
            _ => return Some(i),
        }
    }
    None
}

/// End of the keyword run starting at `i`.
fn scan_word(bytes: &[u8], i: usize) -> usize {
    let mut end = i;
    while end < bytes.len() && (bytes[end].is_ascii_alphabetic() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

/// Locate the VALUES tuple and decide rewrite eligibility.
///
/// Returns the rewrite segmentation when every parameter marker falls
/// strictly inside a single top-level tuple following `VALUES`/`VALUE`.
fn classify_rewrite(
    sql: &str,
    mode: SqlMode,
    search_from: usize,
    content_end: usize,
    param_positions: &[usize],
) -> Result<Option<RewriteSegments>> {
    let bytes = sql.as_bytes();

    let Some(values_end) = find_values_keyword(bytes, mode, search_from)? else {
        return Ok(None);
    };

    let Some(tuple_start) = next_significant(bytes, values_end, mode) else {
        return Ok(None);
    };
    if bytes[tuple_start] != b'(' {
        return Ok(None);
    }
    let Some(tuple_end) = scan_group(bytes, mode, tuple_start)? else {
        return Ok(None);
    };

    // `VALUES (…),(…)` in the source text: the planner only ever duplicates
    // a single tuple, so multiple source tuples disqualify rewriting.
    if let Some(after) = next_significant(bytes, tuple_end, mode) {
        if bytes[after] == b',' {
            return Ok(None);
        }
    }

    // Any marker outside the tuple (e.g. `ON DUPLICATE KEY UPDATE c = ?`)
    // would be silently duplicated along with the tuple.
    if !param_positions
        .iter()
        .all(|&p| p > tuple_start && p < tuple_end)
    {
        return Ok(None);
    }

    let slice = |a: usize, b: usize| -> Result<&str> {
        std::str::from_utf8(&bytes[a..b])
            .map_err(|e| Error::Parse(format!("invalid UTF-8 in statement: {}", e)))
    };

    let prefix = slice(0, tuple_start)?.to_string();
    let tuple = tokenize(slice(tuple_start, tuple_end)?, mode)?;
    let suffix = slice(tuple_end, content_end.max(tuple_end))?.to_string();

    Ok(Some(RewriteSegments {
        prefix,
        tuple,
        suffix,
    }))
}

/// Find the end of the first top-level `VALUES`/`VALUE` keyword after `i`.
fn find_values_keyword(bytes: &[u8], mode: SqlMode, mut i: usize) -> Result<Option<usize>> {
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = scan_quoted(bytes, i, quote, backslash_escapes_in(quote, mode))?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = scan_block_comment(bytes, i)?;
            }
            b'#' => i = scan_line_comment(bytes, i),
            b'-' if is_dash_comment(bytes, i) => i = scan_line_comment(bytes, i),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b if b.is_ascii_alphabetic() => {
                let end = scan_word(bytes, i);
                let word = &bytes[i..end];
                if depth == 0
                    && (word.eq_ignore_ascii_case(b"VALUES") || word.eq_ignore_ascii_case(b"VALUE"))
                {
                    return Ok(Some(end));
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    Ok(None)
}

/// Scan past a balanced `( … )` group starting at `open`.
///
/// Returns the index just after the matching close paren, or `None` if the
/// group never closes.
fn scan_group(bytes: &[u8], mode: SqlMode, open: usize) -> Result<Option<usize>> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = scan_quoted(bytes, i, quote, backslash_escapes_in(quote, mode))?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = scan_block_comment(bytes, i)?;
            }
            b'#' => i = scan_line_comment(bytes, i),
            b'-' if is_dash_comment(bytes, i) => i = scan_line_comment(bytes, i),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Ok(Some(i));
                }
            }
            _ => i += 1,
        }
    }
    Ok(None)
}
