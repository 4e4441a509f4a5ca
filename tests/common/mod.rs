//! Scripted transport for driving the engine without a server.
#![allow(dead_code)]

use std::collections::VecDeque;

use zero_mysql::{
    Error, Frame, Result, ServerCapabilities, ServerErrorFields, SqlMode, Transport,
};

/// One scripted response.
enum Response {
    Frame(Frame),
    /// The calling thread was interrupted while blocked on the read
    Interrupt,
}

/// A transport that records sent payloads and replays scripted frames.
pub struct MockTransport {
    caps: ServerCapabilities,
    /// Every payload handed to `send`, in order
    pub sent: Vec<Vec<u8>>,
    responses: VecDeque<Response>,
    /// Interrupt the Nth `send` call (0-based) instead of transmitting
    interrupt_send_at: Option<usize>,
}

impl MockTransport {
    pub fn new(caps: ServerCapabilities) -> Self {
        Self {
            caps,
            sent: Vec::new(),
            responses: VecDeque::new(),
            interrupt_send_at: None,
        }
    }

    pub fn with_interrupted_send(mut self, n: usize) -> Self {
        self.interrupt_send_at = Some(n);
        self
    }

    pub fn push_ok(&mut self, affected_rows: u64, last_insert_id: u64) {
        self.responses.push_back(Response::Frame(Frame::Ok {
            affected_rows: Some(affected_rows),
            last_insert_id,
            more_results: false,
        }));
    }

    pub fn push_ok_more(&mut self, affected_rows: u64) {
        self.responses.push_back(Response::Frame(Frame::Ok {
            affected_rows: Some(affected_rows),
            last_insert_id: 0,
            more_results: true,
        }));
    }

    pub fn push_ok_no_info(&mut self) {
        self.responses.push_back(Response::Frame(Frame::Ok {
            affected_rows: None,
            last_insert_id: 0,
            more_results: false,
        }));
    }

    pub fn push_err(&mut self, code: u16, sqlstate: &str, message: &str) {
        self.responses
            .push_back(Response::Frame(Frame::Err(ServerErrorFields {
                code,
                sqlstate: sqlstate.to_string(),
                message: message.to_string(),
            })));
    }

    pub fn push_result_set(&mut self, column_count: u64) {
        self.responses
            .push_back(Response::Frame(Frame::ResultSetHeader { column_count }));
    }

    pub fn push_interrupt(&mut self) {
        self.responses.push_back(Response::Interrupt);
    }

    /// True once every scripted response has been consumed.
    pub fn drained(&self) -> bool {
        self.responses.is_empty()
    }
}

impl Transport for MockTransport {
    fn capabilities(&self) -> ServerCapabilities {
        self.caps
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.interrupt_send_at == Some(self.sent.len()) {
            return Err(Error::Io(std::io::ErrorKind::Interrupted.into()));
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        match self.responses.pop_front() {
            Some(Response::Frame(frame)) => Ok(frame),
            Some(Response::Interrupt) => Err(Error::Io(std::io::ErrorKind::Interrupted.into())),
            None => Err(Error::Protocol("mock: no scripted response left".into())),
        }
    }
}

/// Capabilities with every protocol extension enabled.
pub fn full_caps(max_allowed_packet: usize) -> ServerCapabilities {
    ServerCapabilities {
        max_allowed_packet,
        supports_bulk: true,
        supports_multi_statements: true,
        sql_mode: SqlMode::default(),
    }
}
