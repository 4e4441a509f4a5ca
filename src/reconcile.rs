//! Result reconciliation.
//!
//! Folds the server's response frames for each send unit back into one
//! per-original-row outcome array. The single most important contract here:
//! the outcome array always has exactly one entry per submitted row, in
//! submission order, on every path including total failure.

use crate::error::{Error, Result};
use crate::plan::{SendUnit, Strategy};
use crate::transport::Frame;

/// Outcome of one submitted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Executed with a known affected-row count
    Success(u64),
    /// Executed, but the physical strategy cannot attribute a per-row count
    SuccessNoInfo,
    /// Attempted and failed server-side
    Failed,
    /// Never reached the server
    NotAttempted,
}

impl RowOutcome {
    /// True for either success value.
    pub fn is_success(self) -> bool {
        matches!(self, RowOutcome::Success(_) | RowOutcome::SuccessNoInfo)
    }
}

/// Generated keys merged across send units, in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCursor {
    keys: Vec<u64>,
}

impl KeyCursor {
    /// Absorb one OK frame's key range.
    ///
    /// MySQL reports only the first generated key of a statement; subsequent
    /// keys of the same statement follow at increment 1. A frame without a
    /// known affected count contributes its first key only.
    fn push_frame(&mut self, last_insert_id: u64, affected_rows: Option<u64>) {
        if last_insert_id == 0 {
            return;
        }
        match affected_rows {
            Some(n) => {
                for i in 0..n {
                    self.keys.push(last_insert_id + i);
                }
            }
            None => self.keys.push(last_insert_id),
        }
    }

    /// All keys, in row order.
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no statement generated a key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the keys in row order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().copied()
    }
}

/// Result of a fully successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// One outcome per submitted row, in submission order
    pub outcomes: Vec<RowOutcome>,
    /// Generated keys merged across all send units
    pub generated_keys: KeyCursor,
}

/// Folds unit response frames into the per-row outcome array.
pub struct Reconciler {
    outcomes: Vec<RowOutcome>,
    keys: KeyCursor,
}

impl Reconciler {
    /// Start reconciling a batch of `total` rows; every row begins
    /// `NotAttempted`.
    pub fn new(total: usize) -> Self {
        Self {
            outcomes: vec![RowOutcome::NotAttempted; total],
            keys: KeyCursor::default(),
        }
    }

    /// Absorb frame `index` (0-based within the unit) of a send unit.
    ///
    /// On a failing frame the affected row (or, for a rewritten unit, every
    /// row of the unit) is marked `Failed` and the server error is returned;
    /// the caller stops consuming frames for this unit. Rows never reached
    /// stay `NotAttempted`.
    pub fn unit_frame(&mut self, unit: &SendUnit, index: usize, frame: Frame) -> Result<()> {
        match unit.strategy {
            Strategy::SingleExecutePerRow
            | Strategy::JoinedMultiStatement
            | Strategy::BulkColumnar => {
                let row = unit.rows.start + index;
                match frame {
                    Frame::Ok {
                        affected_rows,
                        last_insert_id,
                        more_results,
                    } => {
                        self.outcomes[row] = match affected_rows {
                            Some(n) => RowOutcome::Success(n),
                            None => RowOutcome::SuccessNoInfo,
                        };
                        self.keys.push_frame(last_insert_id, affected_rows);
                        // A joined send multiplexes one frame per statement;
                        // every frame but the last must announce a follower.
                        if unit.strategy == Strategy::JoinedMultiStatement
                            && index + 1 < unit.rows.len()
                            && !more_results
                        {
                            return Err(Error::Protocol(format!(
                                "server ended multi-statement response after {} of {} statements",
                                index + 1,
                                unit.rows.len()
                            )));
                        }
                        Ok(())
                    }
                    Frame::Err(fields) => {
                        self.outcomes[row] = RowOutcome::Failed;
                        Err(Error::Server(fields))
                    }
                    Frame::ResultSetHeader { column_count } => {
                        self.outcomes[row] = RowOutcome::Failed;
                        Err(Error::Protocol(format!(
                            "batch statement returned a {}-column result set",
                            column_count
                        )))
                    }
                }
            }
            Strategy::RewrittenMultiValues => {
                // One frame answers the whole merged statement; per-row
                // counts and per-row failure granularity are forfeited.
                match frame {
                    Frame::Ok {
                        affected_rows,
                        last_insert_id,
                        ..
                    } => {
                        if let Some(n) = affected_rows {
                            if n < unit.rows.len() as u64 {
                                tracing::debug!(
                                    affected = n,
                                    rows = unit.rows.len(),
                                    "rewritten unit affected fewer rows than it carried"
                                );
                            }
                        }
                        for row in unit.rows.clone() {
                            self.outcomes[row] = RowOutcome::SuccessNoInfo;
                        }
                        self.keys.push_frame(last_insert_id, affected_rows);
                        Ok(())
                    }
                    Frame::Err(fields) => {
                        for row in unit.rows.clone() {
                            self.outcomes[row] = RowOutcome::Failed;
                        }
                        Err(Error::Server(fields))
                    }
                    Frame::ResultSetHeader { column_count } => {
                        for row in unit.rows.clone() {
                            self.outcomes[row] = RowOutcome::Failed;
                        }
                        Err(Error::Protocol(format!(
                            "batch statement returned a {}-column result set",
                            column_count
                        )))
                    }
                }
            }
        }
    }

    /// The outcomes built so far, for attaching to a partial failure.
    pub fn into_outcomes(self) -> Vec<RowOutcome> {
        self.outcomes
    }

    /// Finish a fully drained batch.
    pub fn finish(self) -> BatchResult {
        BatchResult {
            outcomes: self.outcomes,
            generated_keys: self.keys,
        }
    }
}
