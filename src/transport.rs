//! Transport collaborator contract.
//!
//! The engine is sans-I/O: it hands payload byte buffers to a [`Transport`]
//! and consumes pre-framed responses from it. Sockets, handshake, and
//! authentication live behind this trait.

use crate::error::{Result, ServerErrorFields};
use crate::tokenizer::SqlMode;

/// One framed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Statement succeeded.
    Ok {
        /// Affected row count, or `None` when the server cannot attribute an
        /// exact count (bulk execution with duplicate-key semantics).
        affected_rows: Option<u64>,
        /// First auto-generated key of this statement, 0 if none
        last_insert_id: u64,
        /// SERVER_MORE_RESULTS_EXISTS: further frames follow for the same send
        more_results: bool,
    },
    /// Statement failed server-side.
    Err(ServerErrorFields),
    /// Statement produced a result set (not valid in a batch).
    ResultSetHeader {
        /// Number of columns in the unexpected result set
        column_count: u64,
    },
}

/// Connection facts negotiated at handshake time, read by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCapabilities {
    /// Largest payload the server accepts in one send, in bytes
    pub max_allowed_packet: usize,
    /// Server supports the bulk columnar protocol extension
    pub supports_bulk: bool,
    /// Server accepts multiple `;`-joined statements per send
    pub supports_multi_statements: bool,
    /// Session `sql_mode` bits that affect quoting and escape rules
    pub sql_mode: SqlMode,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            max_allowed_packet: 16 * 1024 * 1024,
            supports_bulk: false,
            supports_multi_statements: false,
            sql_mode: SqlMode::default(),
        }
    }
}

/// A connection the engine can send payloads through.
///
/// One connection serves one in-flight batch at a time; the engine uses it
/// exclusively for the duration of an `execute_batch` call. `send` must
/// transmit the whole payload or fail; `receive_frame` must block until one
/// complete response frame is available.
pub trait Transport {
    /// Facts negotiated for the current connection.
    fn capabilities(&self) -> ServerCapabilities;

    /// Transmit one payload.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Receive the next response frame, in server order.
    fn receive_frame(&mut self) -> Result<Frame>;
}
