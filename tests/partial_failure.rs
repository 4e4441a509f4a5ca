//! Partial failure, connection poisoning, and recovery.

mod common;

use common::{MockTransport, full_caps};
use zero_mysql::{
    BatchOptions, Conn, Error, PendingBatch, RowOutcome, ServerCapabilities, Value,
};

fn batch_of(query: &zero_mysql::ParsedQuery, rows: &[i64]) -> PendingBatch {
    let mut batch = PendingBatch::new(query);
    for &v in rows {
        batch.add(vec![Value::Int(v)]).unwrap();
    }
    batch
}

#[test]
fn test_joined_failure_preserves_row_granularity() {
    let mut transport = MockTransport::new(full_caps(1 << 20));
    transport.push_ok_more(1);
    transport.push_ok_more(1);
    transport.push_err(1062, "23000", "Duplicate entry '3' for key 'PRIMARY'");
    let options = BatchOptions {
        allow_multi_queries: true,
        use_server_prep_stmts: false,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("INSERT INTO t(a) VALUES (?)").unwrap();
    let mut batch = batch_of(&query, &[1, 2, 3, 4]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert_eq!(
        err.outcomes,
        vec![
            RowOutcome::Success(1),
            RowOutcome::Success(1),
            RowOutcome::Failed,
            RowOutcome::NotAttempted
        ]
    );
    assert_eq!(err.cause.server_code(), Some(1062));
    assert_eq!(err.cause.sqlstate(), Some("23000"));
    // A server error ends the response cleanly; the connection stays usable
    assert!(!conn.is_broken());
    assert!(batch.is_empty());
}

#[test]
fn test_rewritten_failure_forfeits_row_granularity() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_err(1213, "40001", "Deadlock found");
    let options = BatchOptions {
        rewrite_batched_statements: true,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("INSERT INTO t(a) VALUES (?)").unwrap();
    let mut batch = batch_of(&query, &[1, 2, 3]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    // The merged statement failed as a whole; no row can be singled out
    assert_eq!(err.outcomes, vec![RowOutcome::Failed; 3]);
    assert_eq!(err.cause.server_code(), Some(1213));
}

#[test]
fn test_rewritten_failure_in_later_unit() {
    // 31-byte ceiling splits 5 one-digit rows into units of 2, 2, and 1
    let mut transport = MockTransport::new(ServerCapabilities {
        max_allowed_packet: 31,
        ..ServerCapabilities::default()
    });
    transport.push_ok(2, 0);
    transport.push_err(1062, "23000", "Duplicate entry");
    let options = BatchOptions {
        rewrite_batched_statements: true,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("INSERT INTO t(a) VALUES (?)").unwrap();
    let mut batch = batch_of(&query, &[1, 2, 3, 4, 5]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert_eq!(
        err.outcomes,
        vec![
            RowOutcome::SuccessNoInfo,
            RowOutcome::SuccessNoInfo,
            RowOutcome::Failed,
            RowOutcome::Failed,
            RowOutcome::NotAttempted
        ]
    );
    // Sequential sends stop at the failed unit
    assert_eq!(conn.transport().sent.len(), 2);
}

#[test]
fn test_pipelined_failure_drains_remaining_responses() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_ok(1, 0);
    transport.push_err(1062, "23000", "Duplicate entry");
    transport.push_ok(1, 0);
    let options = BatchOptions {
        use_batch_multi_send: true,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1, 2, 3]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert_eq!(
        err.outcomes,
        vec![
            RowOutcome::Success(1),
            RowOutcome::Failed,
            RowOutcome::NotAttempted
        ]
    );
    // Every payload was already in flight; the stream must end framed
    assert_eq!(conn.transport().sent.len(), 3);
    assert!(conn.transport().drained());
    assert!(!conn.is_broken());
}

#[test]
fn test_oversized_row_fails_before_any_send() {
    let mut transport = MockTransport::new(ServerCapabilities {
        max_allowed_packet: 64,
        ..ServerCapabilities::default()
    });
    transport.push_ok(1, 0);
    let options = BatchOptions {
        rewrite_batched_statements: true,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("INSERT INTO t(a) VALUES (?)").unwrap();
    let mut batch = PendingBatch::new(&query);
    batch.add(vec![Value::Int(1)]).unwrap();
    batch.add(vec![Value::Text("x".repeat(200))]).unwrap();
    batch.add(vec![Value::Int(3)]).unwrap();

    let err = conn.execute_batch(&query, &mut batch).unwrap_err();
    assert!(matches!(err.cause, Error::PacketTooLarge { row: 1, .. }));
    assert_eq!(
        err.outcomes,
        vec![
            RowOutcome::NotAttempted,
            RowOutcome::Failed,
            RowOutcome::NotAttempted
        ]
    );
    assert!(conn.transport().sent.is_empty());
    assert!(!conn.is_broken());
}

#[test]
fn test_interrupted_receive_poisons_connection() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_ok(1, 0);
    transport.push_interrupt();
    let mut conn = Conn::new(transport, BatchOptions::default());

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1, 2]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert!(matches!(err.cause, Error::TransportAborted(_)));
    assert!(err.is_connection_broken());
    assert_eq!(
        err.outcomes,
        vec![RowOutcome::Success(1), RowOutcome::NotAttempted]
    );
    assert!(conn.is_broken());
}

#[test]
fn test_interrupted_send_poisons_connection() {
    let transport =
        MockTransport::new(ServerCapabilities::default()).with_interrupted_send(0);
    let mut conn = Conn::new(transport, BatchOptions::default());

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1, 2]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert!(matches!(err.cause, Error::TransportAborted(_)));
    assert_eq!(err.outcomes, vec![RowOutcome::NotAttempted; 2]);
    assert!(conn.is_broken());
}

#[test]
fn test_broken_connection_rejects_until_revalidated() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_interrupt();
    // Revalidation round-trip, then the retried batch
    transport.push_ok(0, 0);
    transport.push_ok(1, 0);
    let mut conn = Conn::new(transport, BatchOptions::default());

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1]);
    assert!(conn.execute_batch(&query, &mut batch).is_err());
    assert!(conn.is_broken());

    // Poisoned: rejected without touching the wire
    batch.add(vec![Value::Int(1)]).unwrap();
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();
    assert!(matches!(err.cause, Error::ConnectionBroken));
    assert_eq!(err.outcomes, vec![RowOutcome::NotAttempted]);
    assert_eq!(conn.transport().sent.len(), 1);

    conn.revalidate().unwrap();
    assert!(!conn.is_broken());
    assert_eq!(conn.transport().sent.last().unwrap(), b"DO 1");

    batch.add(vec![Value::Int(1)]).unwrap();
    let result = conn.execute_batch(&query, &mut batch).unwrap();
    assert_eq!(result.outcomes, vec![RowOutcome::Success(1)]);
}

#[test]
fn test_server_error_does_not_poison_connection() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_err(1062, "23000", "Duplicate entry");
    transport.push_ok(1, 0);
    let mut conn = Conn::new(transport, BatchOptions::default());

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();
    assert!(!err.is_connection_broken());
    assert!(!conn.is_broken());

    batch.add(vec![Value::Int(2)]).unwrap();
    let result = conn.execute_batch(&query, &mut batch).unwrap();
    assert_eq!(result.outcomes, vec![RowOutcome::Success(1)]);
}

#[test]
fn test_truncated_multi_statement_response_poisons_connection() {
    let mut transport = MockTransport::new(full_caps(1 << 20));
    // Final frame arrives where two more statements are still owed
    transport.push_ok(1, 0);
    let options = BatchOptions {
        allow_multi_queries: true,
        use_server_prep_stmts: false,
        ..BatchOptions::default()
    };
    let mut conn = Conn::new(transport, options);

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1, 2, 3]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert!(matches!(err.cause, Error::Protocol(_)));
    assert_eq!(
        err.outcomes,
        vec![
            RowOutcome::Success(1),
            RowOutcome::NotAttempted,
            RowOutcome::NotAttempted
        ]
    );
    assert!(conn.is_broken());
}

#[test]
fn test_unexpected_result_set_fails_row() {
    let mut transport = MockTransport::new(ServerCapabilities::default());
    transport.push_result_set(2);
    let mut conn = Conn::new(transport, BatchOptions::default());

    let query = conn.prepare("UPDATE t SET a = ?").unwrap();
    let mut batch = batch_of(&query, &[1]);
    let err = conn.execute_batch(&query, &mut batch).unwrap_err();

    assert!(matches!(err.cause, Error::Protocol(_)));
    assert_eq!(err.outcomes, vec![RowOutcome::Failed]);
    assert!(conn.is_broken());
}
