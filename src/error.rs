//! Error types for zero-mysql.

use thiserror::Error;

use crate::reconcile::RowOutcome;

/// Result type for zero-mysql operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Fields of a MySQL/MariaDB error packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrorFields {
    /// Server error code (e.g. 1062 for ER_DUP_ENTRY)
    pub code: u16,
    /// SQLSTATE code (5 characters)
    pub sqlstate: String,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ServerErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if !self.sqlstate.is_empty() {
            write!(f, " (SQLSTATE {})", self.sqlstate)?;
        }
        Ok(())
    }
}

/// Error type for zero-mysql.
#[derive(Debug, Error)]
pub enum Error {
    /// Statement text could not be tokenized (malformed quoting or comment nesting)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server error response
    #[error("MySQL error: {0}")]
    Server(ServerErrorFields),

    /// A single row's encoded payload alone exceeds the packet ceiling
    #[error("Row {row} encodes to {size} bytes, exceeding max_allowed_packet {ceiling}")]
    PacketTooLarge {
        /// Index of the offending row in the submitted batch
        row: usize,
        /// Encoded payload size of that row alone
        size: usize,
        /// Negotiated max_allowed_packet ceiling
        ceiling: usize,
    },

    /// Transmission was interrupted or the socket failed mid-batch
    #[error("Transport aborted: {0}")]
    TransportAborted(String),

    /// Protocol error (unexpected frame, malformed response, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection is in an indeterminate state and must be revalidated
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (e.g., wrong bind arity, batch for a different statement)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Returns true if the error leaves the connection in an indeterminate
    /// state: the server may be mid-statement and the stream desynchronized.
    pub fn is_connection_broken(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::TransportAborted(_) | Error::ConnectionBroken
        )
    }

    /// Get the server error code if this is a server error.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Error::Server(fields) => Some(fields.code),
            _ => None,
        }
    }

    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => Some(&fields.sqlstate),
            _ => None,
        }
    }
}

/// Terminal error of a batch execution.
///
/// Carries the per-row outcomes built up to the failure point. The outcomes
/// vector always has exactly one entry per submitted row: rows that executed
/// before the failure keep their real status, the failing row is `Failed`,
/// and rows never attempted are `NotAttempted`.
#[derive(Debug, Error)]
#[error("Batch failed: {cause}")]
pub struct BatchError {
    /// Per-row outcomes, in submission order, one per submitted row
    pub outcomes: Vec<RowOutcome>,
    /// The underlying error that terminated the batch
    #[source]
    pub cause: Error,
}

impl BatchError {
    /// Returns true if the underlying cause broke the connection.
    pub fn is_connection_broken(&self) -> bool {
        self.cause.is_connection_broken()
    }
}
