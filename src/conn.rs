//! Batch execution over one connection.

use crate::error::{BatchError, Error, Result};
use crate::opts::BatchOptions;
use crate::plan::{SendUnit, choose_strategy, plan};
use crate::query::ParsedQuery;
use crate::reconcile::{BatchResult, Reconciler, RowOutcome};
use crate::transport::{Frame, Transport};
use crate::value::{ParameterRow, Value};

/// Rows queued for the next batch execution, in strict insertion order.
///
/// Cleared, not destroyed, after every execute (successful or failed).
#[derive(Debug)]
pub struct PendingBatch {
    param_count: usize,
    rows: Vec<ParameterRow>,
}

impl PendingBatch {
    /// Create an empty batch for a classified statement.
    pub fn new(query: &ParsedQuery) -> Self {
        Self {
            param_count: query.param_count(),
            rows: Vec::new(),
        }
    }

    /// Queue one row of bound values.
    ///
    /// The row must bind exactly one value per parameter marker.
    pub fn add(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.param_count {
            return Err(Error::InvalidUsage(format!(
                "statement has {} parameter markers but row binds {} values",
                self.param_count,
                row.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of queued rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows are queued.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop all queued rows, keeping capacity.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub(crate) fn param_count(&self) -> usize {
        self.param_count
    }

    pub(crate) fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }
}

/// Map an interruption while blocked on the connection to the abort error.
fn map_transport(e: Error) -> Error {
    match e {
        Error::Io(io) if io.kind() == std::io::ErrorKind::Interrupted => {
            Error::TransportAborted("interrupted while blocked on the connection".into())
        }
        other => other,
    }
}

/// A connection executing batches through a [`Transport`].
///
/// One connection serves one in-flight batch at a time. After a transport
/// abort the connection is poisoned: the server may be mid-statement, so
/// every execute is rejected until [`Conn::revalidate`] completes a
/// round-trip.
pub struct Conn<T: Transport> {
    transport: T,
    options: BatchOptions,
    is_broken: bool,
}

impl<T: Transport> Conn<T> {
    /// Wrap a transport with the given batch options.
    pub fn new(transport: T, options: BatchOptions) -> Self {
        Self {
            transport,
            options,
            is_broken: false,
        }
    }

    /// The options the planner reads.
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check if the connection is poisoned and needs revalidation.
    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Tokenize and classify a statement under the connection's `sql_mode`.
    pub fn prepare(&self, sql: &str) -> Result<ParsedQuery> {
        ParsedQuery::parse(sql, self.transport.capabilities().sql_mode)
    }

    /// Revalidate a poisoned connection with a `DO 1` round-trip.
    pub fn revalidate(&mut self) -> Result<()> {
        self.transport.send(b"DO 1").map_err(map_transport)?;
        match self.transport.receive_frame().map_err(map_transport)? {
            Frame::Ok { .. } => {
                self.is_broken = false;
                Ok(())
            }
            Frame::Err(fields) => Err(Error::Server(fields)),
            Frame::ResultSetHeader { .. } => Err(Error::Protocol(
                "validation query returned a result set".into(),
            )),
        }
    }

    /// Execute every queued row of `batch` and reconcile per-row outcomes.
    ///
    /// The returned outcomes (on either path) have exactly one entry per
    /// queued row, in insertion order. On failure the [`BatchError`] carries
    /// the outcomes built up to the failure point. The batch is cleared
    /// either way.
    pub fn execute_batch(
        &mut self,
        query: &ParsedQuery,
        batch: &mut PendingBatch,
    ) -> core::result::Result<BatchResult, BatchError> {
        let result = self.execute_batch_inner(query, batch);
        batch.clear();
        if let Err(ref e) = result {
            if e.is_connection_broken() {
                self.is_broken = true;
            }
        }
        result
    }

    fn execute_batch_inner(
        &mut self,
        query: &ParsedQuery,
        batch: &PendingBatch,
    ) -> core::result::Result<BatchResult, BatchError> {
        let total = batch.len();
        let fail = |outcomes: Vec<RowOutcome>, cause: Error| BatchError { outcomes, cause };

        if self.is_broken {
            return Err(fail(
                vec![RowOutcome::NotAttempted; total],
                Error::ConnectionBroken,
            ));
        }
        if batch.param_count() != query.param_count() {
            return Err(fail(
                vec![RowOutcome::NotAttempted; total],
                Error::InvalidUsage("batch was built for a different statement".into()),
            ));
        }
        if total == 0 {
            return Ok(BatchResult {
                outcomes: Vec::new(),
                generated_keys: Default::default(),
            });
        }

        let caps = self.transport.capabilities();
        let strategy = choose_strategy(query, &self.options, &caps);
        let units = match plan(query, batch.rows(), strategy, &self.options, &caps) {
            Ok(units) => units,
            Err(e) => {
                let mut outcomes = vec![RowOutcome::NotAttempted; total];
                if let Error::PacketTooLarge { row, .. } = e {
                    outcomes[row] = RowOutcome::Failed;
                }
                return Err(fail(outcomes, e));
            }
        };
        tracing::debug!(strategy = ?strategy, units = units.len(), rows = total, "executing batch");

        let mut rec = Reconciler::new(total);

        if self.options.use_batch_multi_send {
            for unit in &units {
                if let Err(e) = self.transport.send(&unit.payload).map_err(map_transport) {
                    return Err(fail(rec.into_outcomes(), e));
                }
            }
            for (i, unit) in units.iter().enumerate() {
                if let Err(e) = self.drain_unit(&mut rec, unit) {
                    // Responses for the remaining units are already in
                    // flight; consume them so the stream stays framed.
                    match e {
                        Error::Server(_) => self.discard_responses(&units[i + 1..]),
                        Error::Protocol(_) => self.is_broken = true,
                        _ => {}
                    }
                    return Err(fail(rec.into_outcomes(), e));
                }
            }
        } else {
            for unit in &units {
                let sent = self.transport.send(&unit.payload).map_err(map_transport);
                if let Err(e) = sent.and_then(|()| self.drain_unit(&mut rec, unit)) {
                    if matches!(e, Error::Protocol(_)) {
                        self.is_broken = true;
                    }
                    return Err(fail(rec.into_outcomes(), e));
                }
            }
        }

        Ok(rec.finish())
    }

    /// Consume and reconcile every response frame of one send unit.
    fn drain_unit(&mut self, rec: &mut Reconciler, unit: &SendUnit) -> Result<()> {
        for index in 0..unit.expected_frames() {
            let frame = self.transport.receive_frame().map_err(map_transport)?;
            rec.unit_frame(unit, index, frame)?;
        }
        Ok(())
    }

    /// Drain and discard pipelined responses after a failed unit.
    fn discard_responses(&mut self, units: &[SendUnit]) {
        for unit in units {
            for _ in 0..unit.expected_frames() {
                if self.transport.receive_frame().is_err() {
                    self.is_broken = true;
                    return;
                }
            }
        }
    }
}
