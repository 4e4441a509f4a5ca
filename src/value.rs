//! Bind value model and encodings.

use crate::codec::write_lenenc_bytes;
use crate::tokenizer::SqlMode;

/// One bound parameter row, in marker order.
pub type ParameterRow = Vec<Value>;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Double-precision float
    Double(f64),
    /// Text string
    Text(String),
    /// Raw bytes (rendered as a hex literal in text strategies)
    Bytes(Vec<u8>),
}

impl Value {
    /// Append this value as a SQL literal, escaped per `mode`.
    pub fn write_sql(&self, out: &mut Vec<u8>, mode: SqlMode) {
        match self {
            Value::Null => out.extend_from_slice(b"NULL"),
            Value::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
            Value::UInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
            Value::Double(v) => out.extend_from_slice(v.to_string().as_bytes()),
            Value::Text(s) => write_quoted(out, s.as_bytes(), mode),
            Value::Bytes(b) => write_hex_literal(out, b),
        }
    }

    /// Append this value as a binary record field: an indicator byte
    /// (0 = present, 1 = NULL) followed by length-encoded canonical bytes.
    ///
    /// Used by the bulk columnar encoding and by server-side prepared
    /// execution payloads.
    pub fn write_binary(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(1),
            Value::Int(v) => {
                out.push(0);
                write_lenenc_bytes(out, v.to_string().as_bytes());
            }
            Value::UInt(v) => {
                out.push(0);
                write_lenenc_bytes(out, v.to_string().as_bytes());
            }
            Value::Double(v) => {
                out.push(0);
                write_lenenc_bytes(out, v.to_string().as_bytes());
            }
            Value::Text(s) => {
                out.push(0);
                write_lenenc_bytes(out, s.as_bytes());
            }
            Value::Bytes(b) => {
                out.push(0);
                write_lenenc_bytes(out, b);
            }
        }
    }
}

/// Append a quoted, escaped string literal.
///
/// A single quote is always doubled. With backslash escapes active (the
/// default `sql_mode`), backslash, NUL, newline, carriage return, and Ctrl-Z
/// are escaped as well.
fn write_quoted(out: &mut Vec<u8>, s: &[u8], mode: SqlMode) {
    out.push(b'\'');
    for &b in s {
        match b {
            b'\'' => out.extend_from_slice(b"''"),
            b'\\' if !mode.no_backslash_escapes => out.extend_from_slice(b"\\\\"),
            0 if !mode.no_backslash_escapes => out.extend_from_slice(b"\\0"),
            b'\n' if !mode.no_backslash_escapes => out.extend_from_slice(b"\\n"),
            b'\r' if !mode.no_backslash_escapes => out.extend_from_slice(b"\\r"),
            0x1a if !mode.no_backslash_escapes => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
    out.push(b'\'');
}

/// Append an `X'…'` hex literal.
fn write_hex_literal(out: &mut Vec<u8>, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.extend_from_slice(b"X'");
    for &b in bytes {
        out.push(HEX[usize::from(b >> 4)]);
        out.push(HEX[usize::from(b & 0x0f)]);
    }
    out.push(b'\'');
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
