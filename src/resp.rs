//! RESP (Redis Serialization Protocol) framing.
//!
//! The parser is streaming: it consumes frames from the front of a growing
//! [`BytesMut`] read buffer and reports "need more data" without consuming
//! anything when the buffer does not yet hold a complete frame. The encoder
//! mirrors the five frame shapes and the two null encodings.

use std::io::Cursor;

use bytes::{Buf, BytesMut};
use thiserror::Error;

/// Declared bulk string / array lengths above this are rejected.
pub const MAX_FRAME_LENGTH: usize = 512 * 1024 * 1024;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("not enough data for a complete frame")]
    Incomplete,
    #[error("unknown RESP type byte '{0}'")]
    UnknownTypeByte(u8),
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("invalid length field")]
    InvalidLength,
    #[error("length field exceeds the frame size ceiling")]
    FrameTooLarge,
    #[error("bulk string not terminated by CRLF")]
    MissingCrlf,
    #[error("failed to parse integer")]
    InvalidInteger,
}

impl RespError {
    pub fn as_string(&self) -> String {
        RespValue::Error(format!("ERR Protocol error: {}", self)).encode()
    }
}

/// A single RESP frame.
///
/// Inbound client commands are always `Array`s of `BulkString`s; the
/// remaining shapes appear in replies and in the replication stream.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    NullArray,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Tries to parse one frame from the front of `buffer`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet contain a complete
    /// frame; in that case nothing is consumed and the caller should read
    /// more bytes from the socket. On success exactly the frame's bytes are
    /// split off the front of the buffer.
    pub fn try_parse(buffer: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&buffer[..]);

        match parse_frame(&mut cursor) {
            Ok(frame) => {
                let consumed = cursor.position() as usize;
                buffer.advance(consumed);
                Ok(Some(frame))
            }
            Err(RespError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parses every complete frame currently buffered. Pipelined commands
    /// arrive in one read, so a single socket read can yield several frames.
    pub fn parse_all(buffer: &mut BytesMut) -> Result<Vec<RespValue>, RespError> {
        let mut frames = Vec::new();

        while let Some(frame) = Self::try_parse(buffer)? {
            frames.push(frame);
        }

        Ok(frames)
    }

    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(s) => format!("-{}\r\n", s),
            RespValue::Integer(i) => format!(":{}\r\n", i),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::NullArray => "*-1\r\n".to_string(),
            RespValue::Array(items) => {
                let mut encoded = format!("*{}\r\n", items.len());

                for item in items {
                    encoded.push_str(&item.encode());
                }

                encoded
            }
        }
    }

    /// Byte length of the encoded frame. Inbound command arrays re-encode
    /// byte-identically, which is what replication offset accounting uses.
    pub fn encoded_len(&self) -> usize {
        self.encode().len()
    }

    pub fn encode_array_from_strings(values: Vec<String>) -> String {
        RespValue::Array(values.into_iter().map(RespValue::BulkString).collect()).encode()
    }
}

fn parse_frame(cursor: &mut Cursor<&[u8]>) -> Result<RespValue, RespError> {
    let slice = *cursor.get_ref();
    let position = cursor.position() as usize;

    if position >= slice.len() {
        return Err(RespError::Incomplete);
    }

    let type_byte = slice[position];
    cursor.set_position((position + 1) as u64);

    match type_byte {
        b'+' => {
            let line = read_line(cursor)?;
            Ok(RespValue::SimpleString(to_utf8(line)?))
        }
        b'-' => {
            let line = read_line(cursor)?;
            Ok(RespValue::Error(to_utf8(line)?))
        }
        b':' => {
            let line = read_line(cursor)?;
            let value = to_utf8(line)?
                .parse::<i64>()
                .map_err(|_| RespError::InvalidInteger)?;
            Ok(RespValue::Integer(value))
        }
        b'$' => {
            let line = read_line(cursor)?;
            let length = parse_length(line)?;

            if length < 0 {
                return Ok(RespValue::NullBulkString);
            }

            read_bulk_payload(cursor, length as usize)
        }
        b'*' => {
            let line = read_line(cursor)?;
            let count = parse_length(line)?;

            if count < 0 {
                return Ok(RespValue::NullArray);
            }

            let mut elements = Vec::with_capacity(count as usize);

            for _ in 0..count {
                elements.push(parse_frame(cursor)?);
            }

            Ok(RespValue::Array(elements))
        }
        other => Err(RespError::UnknownTypeByte(other)),
    }
}

/// Reads up to the next CRLF, leaving the cursor just past it.
fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], RespError> {
    let slice = *cursor.get_ref();
    let start = cursor.position() as usize;

    let mut index = start;
    while index + 1 < slice.len() {
        if slice[index] == b'\r' && slice[index + 1] == b'\n' {
            cursor.set_position((index + 2) as u64);
            return Ok(&slice[start..index]);
        }
        index += 1;
    }

    Err(RespError::Incomplete)
}

fn read_bulk_payload(cursor: &mut Cursor<&[u8]>, length: usize) -> Result<RespValue, RespError> {
    let slice = *cursor.get_ref();
    let start = cursor.position() as usize;

    if slice.len() - start < length + 2 {
        return Err(RespError::Incomplete);
    }

    if &slice[start + length..start + length + 2] != b"\r\n" {
        return Err(RespError::MissingCrlf);
    }

    let content = to_utf8(&slice[start..start + length])?;
    cursor.set_position((start + length + 2) as u64);

    Ok(RespValue::BulkString(content))
}

/// Parses a `$`/`*` length field: either the literal `-1` or an unsigned
/// decimal of ASCII digits below the size ceiling.
fn parse_length(line: &[u8]) -> Result<i64, RespError> {
    if line == b"-1" {
        return Ok(-1);
    }

    if line.is_empty() || !line.iter().all(|b| b.is_ascii_digit()) {
        return Err(RespError::InvalidLength);
    }

    let length = to_utf8(line)?
        .parse::<u64>()
        .map_err(|_| RespError::InvalidLength)?;

    if length > MAX_FRAME_LENGTH as u64 {
        return Err(RespError::FrameTooLarge);
    }

    Ok(length as i64)
}

fn to_utf8(bytes: &[u8]) -> Result<String, RespError> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| RespError::InvalidUtf8)
}
