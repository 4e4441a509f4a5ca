//! Send unit serialization.
//!
//! Renders statement segments and bound rows into wire payloads. All
//! functions append into caller-owned buffers and never block; transmission
//! belongs to the transport.

use crate::codec::write_lenenc_int;
use crate::error::{Error, Result};
use crate::query::ParsedQuery;
use crate::tokenizer::{Segment, SqlMode, param_count};
use crate::value::Value;

/// Render segments with the row's values substituted for markers.
///
/// The row must bind exactly as many values as the segmentation has markers.
pub(crate) fn render_segments(
    segments: &[Segment],
    row: &[Value],
    mode: SqlMode,
    out: &mut Vec<u8>,
) -> Result<()> {
    if row.len() != param_count(segments) {
        return Err(Error::InvalidUsage(format!(
            "statement has {} parameter markers but row binds {} values",
            param_count(segments),
            row.len()
        )));
    }
    let mut values = row.iter();
    for segment in segments {
        match segment {
            Segment::Static(text) => out.extend_from_slice(text.as_bytes()),
            Segment::Param => {
                // Arity was checked above
                if let Some(value) = values.next() {
                    value.write_sql(out, mode);
                }
            }
        }
    }
    Ok(())
}

/// Render one row's VALUES tuple for the rewritten strategy.
pub(crate) fn render_tuple(
    tuple: &[Segment],
    row: &[Value],
    mode: SqlMode,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    render_segments(tuple, row, mode, &mut out)?;
    Ok(out)
}

/// Render one full statement copy for the joined strategy.
pub(crate) fn render_statement(query: &ParsedQuery, row: &[Value]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    render_segments(query.statement_segments(), row, query.mode(), &mut out)?;
    Ok(out)
}

/// Render a per-row payload for single execution.
///
/// Client-side substitution emits the full statement text with inline
/// literals. Server-side prepared execution emits a compact binary exec
/// record: lenenc value count, then one indicator-prefixed lenenc value per
/// marker (the statement itself was prepared once, out of band).
pub(crate) fn render_single(
    query: &ParsedQuery,
    row: &[Value],
    server_side: bool,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if server_side {
        if row.len() != query.param_count() {
            return Err(Error::InvalidUsage(format!(
                "statement has {} parameter markers but row binds {} values",
                query.param_count(),
                row.len()
            )));
        }
        write_lenenc_int(&mut out, row.len() as u64);
        for value in row {
            value.write_binary(&mut out);
        }
    } else {
        render_segments(query.segments(), row, query.mode(), &mut out)?;
    }
    Ok(out)
}

/// Render the bulk unit header: the per-row value count, stated once.
pub(crate) fn bulk_header(query: &ParsedQuery) -> Vec<u8> {
    let mut out = Vec::new();
    write_lenenc_int(&mut out, query.param_count() as u64);
    out
}

/// Render one bulk record: indicator-prefixed lenenc values, no SQL text.
pub(crate) fn bulk_record(query: &ParsedQuery, row: &[Value]) -> Result<Vec<u8>> {
    if row.len() != query.param_count() {
        return Err(Error::InvalidUsage(format!(
            "statement has {} parameter markers but row binds {} values",
            query.param_count(),
            row.len()
        )));
    }
    let mut out = Vec::new();
    for value in row {
        value.write_binary(&mut out);
    }
    Ok(out)
}
