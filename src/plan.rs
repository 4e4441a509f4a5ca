//! Batch planning.
//!
//! Maps a batch of bound rows onto an ordered list of size-bounded send
//! units, each carrying one physical transmission strategy.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::opts::BatchOptions;
use crate::query::ParsedQuery;
use crate::serialize::{bulk_header, bulk_record, render_single, render_statement, render_tuple};
use crate::transport::ServerCapabilities;
use crate::value::ParameterRow;

/// Physical transmission strategy of a send unit.
///
/// A closed set: the planner, serializer, and reconciler all match it
/// exhaustively, so adding a strategy is a compile-checked three-site change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One send per row
    SingleExecutePerRow,
    /// One `INSERT … VALUES (…),(…),…` text per send
    RewrittenMultiValues,
    /// Full statement copies joined with `;` per send
    JoinedMultiStatement,
    /// Compact columnar records, SQL text not repeated
    BulkColumnar,
}

/// A contiguous slice of the batch mapped to one physical transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendUnit {
    /// Transmission strategy; uniform across the whole batch
    pub strategy: Strategy,
    /// Rows of the original batch covered by this unit
    pub rows: Range<usize>,
    /// Serialized payload, bounded by `max_allowed_packet`
    pub payload: Vec<u8>,
}

impl SendUnit {
    /// Number of response frames the server produces for this unit.
    ///
    /// Rewriting merges the unit into one statement and one status frame;
    /// every other strategy answers row by row.
    pub fn expected_frames(&self) -> usize {
        match self.strategy {
            Strategy::RewrittenMultiValues => 1,
            Strategy::SingleExecutePerRow
            | Strategy::JoinedMultiStatement
            | Strategy::BulkColumnar => self.rows.len(),
        }
    }
}

/// Pick the strategy for a batch. First applicable wins; the choice applies
/// uniformly to every row so the reconciler's result-shape assumptions hold
/// per unit.
///
/// Options that a statement's classification cannot honor (e.g. rewrite
/// requested for a non-rewritable statement) degrade silently to the next
/// strategy, never to an error.
pub fn choose_strategy(
    query: &ParsedQuery,
    options: &BatchOptions,
    caps: &ServerCapabilities,
) -> Strategy {
    if query.is_call() {
        // Procedure calls keep per-call result semantics isolated
        if options.use_bulk_stmts || options.rewrite_batched_statements {
            tracing::debug!("CALL statement: merged execution unavailable, using per-row sends");
        }
        return Strategy::SingleExecutePerRow;
    }
    if options.use_bulk_stmts
        && caps.supports_bulk
        && query.multi_queryable()
        && query.param_count() > 0
    {
        return Strategy::BulkColumnar;
    }
    if options.rewrite_batched_statements {
        if query.rewritable() {
            return Strategy::RewrittenMultiValues;
        }
        tracing::debug!("statement is not rewritable, degrading");
    }
    if options.allow_multi_queries && caps.supports_multi_statements && query.multi_queryable() {
        return Strategy::JoinedMultiStatement;
    }
    Strategy::SingleExecutePerRow
}

/// Partition a batch into size-bounded send units with serialized payloads.
///
/// Greedy accumulation: rows join the current unit until appending the next
/// row's encoding would exceed the `max_allowed_packet` ceiling or the unit
/// reaches `max_rows_per_unit`. A row's encoding is never split across two
/// units; a row whose lone payload exceeds the ceiling is `PacketTooLarge`.
pub fn plan(
    query: &ParsedQuery,
    rows: &[ParameterRow],
    strategy: Strategy,
    options: &BatchOptions,
    caps: &ServerCapabilities,
) -> Result<Vec<SendUnit>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ceiling = caps.max_allowed_packet;

    let units = match strategy {
        Strategy::SingleExecutePerRow => {
            let server_side = options.use_server_prep_stmts;
            let mut units = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                let payload = render_single(query, row, server_side)?;
                if payload.len() > ceiling {
                    return Err(Error::PacketTooLarge {
                        row: i,
                        size: payload.len(),
                        ceiling,
                    });
                }
                units.push(SendUnit {
                    strategy,
                    rows: i..i + 1,
                    payload,
                });
            }
            units
        }
        Strategy::RewrittenMultiValues => {
            let rewrite = query.rewrite_segments().ok_or_else(|| {
                Error::InvalidUsage("rewrite planned for a non-rewritable statement".into())
            })?;
            let prefix = rewrite.prefix.as_bytes();
            let suffix = rewrite.suffix.as_bytes();
            let mode = query.mode();

            let mut units = Vec::new();
            let mut current: Vec<u8> = Vec::new();
            let mut start = 0usize;
            for (i, row) in rows.iter().enumerate() {
                let tuple = render_tuple(&rewrite.tuple, row, mode)?;
                let alone = prefix.len() + tuple.len() + suffix.len();
                if alone > ceiling {
                    return Err(Error::PacketTooLarge {
                        row: i,
                        size: alone,
                        ceiling,
                    });
                }
                let fits = !current.is_empty()
                    && current.len() + 1 + tuple.len() + suffix.len() <= ceiling
                    && i - start < options.max_rows_per_unit;
                if current.is_empty() {
                    current.extend_from_slice(prefix);
                    start = i;
                } else if fits {
                    current.push(b',');
                } else {
                    current.extend_from_slice(suffix);
                    units.push(SendUnit {
                        strategy,
                        rows: start..i,
                        payload: std::mem::take(&mut current),
                    });
                    current.extend_from_slice(prefix);
                    start = i;
                }
                current.extend_from_slice(&tuple);
            }
            current.extend_from_slice(suffix);
            units.push(SendUnit {
                strategy,
                rows: start..rows.len(),
                payload: current,
            });
            units
        }
        Strategy::JoinedMultiStatement => {
            let mut units = Vec::new();
            let mut current: Vec<u8> = Vec::new();
            let mut start = 0usize;
            for (i, row) in rows.iter().enumerate() {
                let statement = render_statement(query, row)?;
                if statement.len() > ceiling {
                    return Err(Error::PacketTooLarge {
                        row: i,
                        size: statement.len(),
                        ceiling,
                    });
                }
                let fits = !current.is_empty()
                    && current.len() + 1 + statement.len() <= ceiling
                    && i - start < options.max_rows_per_unit;
                if current.is_empty() {
                    start = i;
                } else if fits {
                    current.push(b';');
                } else {
                    units.push(SendUnit {
                        strategy,
                        rows: start..i,
                        payload: std::mem::take(&mut current),
                    });
                    start = i;
                }
                current.extend_from_slice(&statement);
            }
            units.push(SendUnit {
                strategy,
                rows: start..rows.len(),
                payload: current,
            });
            units
        }
        Strategy::BulkColumnar => {
            let header = bulk_header(query);
            let mut units = Vec::new();
            let mut current: Vec<u8> = Vec::new();
            let mut start = 0usize;
            for (i, row) in rows.iter().enumerate() {
                let record = bulk_record(query, row)?;
                let alone = header.len() + record.len();
                if alone > ceiling {
                    return Err(Error::PacketTooLarge {
                        row: i,
                        size: alone,
                        ceiling,
                    });
                }
                let fits = !current.is_empty()
                    && current.len() + record.len() <= ceiling
                    && i - start < options.max_rows_per_unit;
                if current.is_empty() {
                    current.extend_from_slice(&header);
                    start = i;
                } else if !fits {
                    units.push(SendUnit {
                        strategy,
                        rows: start..i,
                        payload: std::mem::take(&mut current),
                    });
                    current.extend_from_slice(&header);
                    start = i;
                }
                current.extend_from_slice(&record);
            }
            units.push(SendUnit {
                strategy,
                rows: start..rows.len(),
                payload: current,
            });
            units
        }
    };

    tracing::debug!(
        strategy = ?strategy,
        rows = rows.len(),
        units = units.len(),
        "batch planned"
    );
    Ok(units)
}
