//! A batch rewrite and execution engine for MySQL/MariaDB clients.
//!
//! # Features
//!
//! - **Sans-I/O core**: planning, serialization, and reconciliation are
//!   separated from the socket; any transport that can ship payloads and
//!   frame responses plugs in
//! - **Batch rewriting**: eligible `INSERT … VALUES` batches fold into
//!   multi-values statements, `;`-joined round-trips, or bulk columnar
//!   payloads, bounded by the negotiated packet ceiling
//! - **Exact per-row outcomes**: every submitted row gets exactly one
//!   outcome, in submission order, on every path including partial failure
//!
//! # Example
//!
//! ```no_run
//! use zero_mysql::{BatchOptions, Conn, PendingBatch, Value};
//! # struct NoopTransport;
//! # impl zero_mysql::Transport for NoopTransport {
//! #     fn capabilities(&self) -> zero_mysql::ServerCapabilities { zero_mysql::ServerCapabilities::default() }
//! #     fn send(&mut self, _payload: &[u8]) -> zero_mysql::Result<()> { unimplemented!() }
//! #     fn receive_frame(&mut self) -> zero_mysql::Result<zero_mysql::Frame> { unimplemented!() }
//! # }
//! # fn transport() -> impl zero_mysql::Transport { NoopTransport }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = BatchOptions::try_from("rewriteBatchedStatements=true")?;
//!     let mut conn = Conn::new(transport(), options);
//!
//!     let query = conn.prepare("INSERT INTO users(name, age) VALUES (?, ?)")?;
//!     let mut batch = PendingBatch::new(&query);
//!     batch.add(vec![Value::from("alice"), Value::from(33)])?;
//!     batch.add(vec![Value::from("bob"), Value::from(44)])?;
//!
//!     let result = conn.execute_batch(&query, &mut batch)?;
//!     assert_eq!(result.outcomes.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod conn;
pub mod error;
pub mod opts;
pub mod plan;
pub mod query;
pub mod reconcile;
pub mod serialize;
pub mod tokenizer;
pub mod transport;
pub mod value;

pub use conn::{Conn, PendingBatch};
pub use error::{BatchError, Error, Result, ServerErrorFields};
pub use opts::BatchOptions;
pub use plan::{SendUnit, Strategy};
pub use query::ParsedQuery;
pub use reconcile::{BatchResult, KeyCursor, RowOutcome};
pub use tokenizer::{Segment, SqlMode};
pub use transport::{Frame, ServerCapabilities, Transport};
pub use value::{ParameterRow, Value};
