//! MySQL wire encoding and decoding primitives.
//!
//! MySQL uses little-endian integers and length-encoded ("lenenc") values.

use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16, U64};

/// Write a length-encoded integer.
///
/// `< 0xFB`: one byte; `0xFC` + u16; `0xFD` + u24; `0xFE` + u64.
#[inline]
pub fn write_lenenc_int(out: &mut Vec<u8>, value: u64) {
    if value < 0xFB {
        out.push(value as u8);
    } else if value <= 0xFFFF {
        out.push(0xFC);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xFF_FFFF {
        out.push(0xFD);
        out.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        out.push(0xFE);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Write length-encoded bytes (lenenc length prefix + raw bytes).
#[inline]
pub fn write_lenenc_bytes(out: &mut Vec<u8>, data: &[u8]) {
    write_lenenc_int(out, data.len() as u64);
    out.extend_from_slice(data);
}

/// Read a length-encoded integer, returning the value and the remaining data.
#[inline]
pub fn read_lenenc_int(data: &[u8]) -> Result<(u64, &[u8])> {
    let (&first, rest) = data
        .split_first()
        .ok_or_else(|| Error::Protocol("read_lenenc_int: empty buffer".into()))?;
    match first {
        0..=0xFA => Ok((u64::from(first), rest)),
        0xFC => {
            if rest.len() < 2 {
                return Err(Error::Protocol(format!(
                    "read_lenenc_int: buffer too short: {} < 2",
                    rest.len()
                )));
            }
            let value = U16::ref_from_bytes(&rest[..2])
                .map_err(|e| Error::Protocol(format!("read_lenenc_int: {e:?}")))?
                .get();
            Ok((u64::from(value), &rest[2..]))
        }
        0xFD => {
            if rest.len() < 3 {
                return Err(Error::Protocol(format!(
                    "read_lenenc_int: buffer too short: {} < 3",
                    rest.len()
                )));
            }
            let value =
                u64::from(rest[0]) | (u64::from(rest[1]) << 8) | (u64::from(rest[2]) << 16);
            Ok((value, &rest[3..]))
        }
        0xFE => {
            if rest.len() < 8 {
                return Err(Error::Protocol(format!(
                    "read_lenenc_int: buffer too short: {} < 8",
                    rest.len()
                )));
            }
            let value = U64::ref_from_bytes(&rest[..8])
                .map_err(|e| Error::Protocol(format!("read_lenenc_int: {e:?}")))?
                .get();
            Ok((value, &rest[8..]))
        }
        0xFB | 0xFF => Err(Error::Protocol(format!(
            "read_lenenc_int: invalid prefix byte 0x{first:02X}"
        ))),
    }
}

/// Read length-encoded bytes, returning the bytes and the remaining data.
#[inline]
pub fn read_lenenc_bytes(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_lenenc_int(data)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(Error::Protocol(format!(
            "read_lenenc_bytes: buffer too short: {} < {}",
            rest.len(),
            len
        )));
    }
    Ok((&rest[..len], &rest[len..]))
}
