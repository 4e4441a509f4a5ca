//! Batch execution options.

use crate::error::Error;

/// Options read by the batch planner.
///
/// Passed by reference into planning; the engine never reads ambient
/// configuration, so any combination can be exercised in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Rewrite eligible INSERT/REPLACE batches into a single
    /// `INSERT … VALUES (…),(…),…` statement per send.
    ///
    /// Rewriting forfeits per-row affected counts and per-row failure
    /// granularity (the whole merged statement succeeds or fails as one).
    ///
    /// Default: `false`
    pub rewrite_batched_statements: bool,

    /// Join full statement copies with `;` into one round-trip when the
    /// server accepts multiple statements per packet.
    ///
    /// Default: `false`
    pub allow_multi_queries: bool,

    /// Use the bulk columnar protocol extension when the server supports it,
    /// encoding one compact record per row without repeating SQL text.
    ///
    /// Default: `false`
    pub use_bulk_stmts: bool,

    /// Transmit all send units before draining any responses, instead of a
    /// strict send/drain cycle per unit.
    ///
    /// Default: `false`
    pub use_batch_multi_send: bool,

    /// For per-row execution, bind through a server-side prepared statement
    /// instead of client-side text substitution.
    ///
    /// Default: `true`
    pub use_server_prep_stmts: bool,

    /// Maximum number of rows folded into one send unit, regardless of byte
    /// size. Servers cap how many rows a bulk or rewritten statement may
    /// carry; the exact ceiling is version-dependent, so it is tunable here.
    ///
    /// Default: `65_535`
    pub max_rows_per_unit: usize,
}

impl Default for BatchOptions {
    #[cfg_attr(not(debug_assertions), no_panic::no_panic)]
    fn default() -> Self {
        Self {
            rewrite_batched_statements: false,
            allow_multi_queries: false,
            use_bulk_stmts: false,
            use_batch_multi_send: false,
            use_server_prep_stmts: true,
            max_rows_per_unit: 65_535,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "True" | "1" | "yes" | "on" => Ok(true),
        "false" | "False" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidUsage(format!("Invalid {}: {}", key, value))),
    }
}

impl TryFrom<&str> for BatchOptions {
    type Error = Error;

    /// Parse a comma-separated `key=value` option string.
    ///
    /// Recognized keys: `rewriteBatchedStatements`, `allowMultiQueries`,
    /// `useBulkStmts`, `useBatchMultiSend`, `useServerPrepStmts`,
    /// `maxRowsPerUnit`. Unknown keys are rejected.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut opts = BatchOptions::default();

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::InvalidUsage(format!("Expected key=value, got '{}'", pair))
            })?;
            match key {
                "rewriteBatchedStatements" => {
                    opts.rewrite_batched_statements = parse_bool(key, value)?;
                }
                "allowMultiQueries" => {
                    opts.allow_multi_queries = parse_bool(key, value)?;
                }
                "useBulkStmts" => {
                    opts.use_bulk_stmts = parse_bool(key, value)?;
                }
                "useBatchMultiSend" => {
                    opts.use_batch_multi_send = parse_bool(key, value)?;
                }
                "useServerPrepStmts" => {
                    opts.use_server_prep_stmts = parse_bool(key, value)?;
                }
                "maxRowsPerUnit" => {
                    opts.max_rows_per_unit = value.parse().map_err(|_| {
                        Error::InvalidUsage(format!("Invalid maxRowsPerUnit: {}", value))
                    })?;
                    if opts.max_rows_per_unit == 0 {
                        return Err(Error::InvalidUsage(
                            "maxRowsPerUnit must be positive".into(),
                        ));
                    }
                }
                _ => {
                    return Err(Error::InvalidUsage(format!("Unknown option: {}", key)));
                }
            }
        }

        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BatchOptions::default();
        assert!(!opts.rewrite_batched_statements);
        assert!(!opts.allow_multi_queries);
        assert!(!opts.use_bulk_stmts);
        assert!(!opts.use_batch_multi_send);
        assert!(opts.use_server_prep_stmts);
        assert_eq!(opts.max_rows_per_unit, 65_535);
    }

    #[test]
    fn test_parse_option_string() {
        let opts = BatchOptions::try_from(
            "rewriteBatchedStatements=true, allowMultiQueries=on, maxRowsPerUnit=1000",
        )
        .unwrap();
        assert!(opts.rewrite_batched_statements);
        assert!(opts.allow_multi_queries);
        assert_eq!(opts.max_rows_per_unit, 1000);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(BatchOptions::try_from("useCompression=true").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_bool() {
        assert!(BatchOptions::try_from("useBulkStmts=maybe").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_rows_per_unit() {
        assert!(BatchOptions::try_from("maxRowsPerUnit=0").is_err());
    }

    #[test]
    fn test_parse_empty_string_is_default() {
        assert_eq!(BatchOptions::try_from("").unwrap(), BatchOptions::default());
    }
}
