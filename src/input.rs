//! Socket reading and the replica-side replication handshake.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::debug;

use crate::resp::{RespError, RespValue};
use crate::server::RedisServer;

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
    #[error("invalid response from master")]
    InvalidResponseFromMaster,
}

impl CommandReadError {
    pub fn as_string(&self) -> String {
        match self {
            CommandReadError::RespParseError(err) => err.as_string(),
            other => RespValue::Error(format!("ERR {}", other)).encode(),
        }
    }
}

/// Reads from the socket into `buffer` and parses every complete frame.
///
/// Returns at least one frame: keeps reading while a frame is still
/// incomplete. A read of zero bytes means the peer closed the connection.
pub async fn read_frames<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<Vec<RespValue>, CommandReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frames = RespValue::parse_all(buffer)?;

        if !frames.is_empty() {
            return Ok(frames);
        }

        let bytes_read = reader
            .read_buf(buffer)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))?;

        if bytes_read == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }
    }
}

/// Performs the replica-initiated handshake over `stream`:
/// PING, REPLCONF listening-port, REPLCONF capa psync2, PSYNC ? -1, then the
/// master's FULLRESYNC reply and RDB snapshot transfer.
///
/// Returns the residual read buffer: the master may start streaming
/// commands immediately after the snapshot, and those bytes belong to the
/// replication stream, not to the handshake.
pub async fn handshake(
    stream: &mut TcpStream,
    server: Arc<RwLock<RedisServer>>,
) -> Result<BytesMut, CommandReadError> {
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);

    let response = send_handshake_command(
        stream,
        &mut buffer,
        RespValue::Array(vec![RespValue::BulkString("PING".to_string())]),
    )
    .await?;

    if response != RespValue::SimpleString("PONG".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let listening_port = {
        let server_guard = server.read().await;
        server_guard.port.to_string()
    };

    let response = send_handshake_command(
        stream,
        &mut buffer,
        RespValue::Array(vec![
            RespValue::BulkString("REPLCONF".to_string()),
            RespValue::BulkString("listening-port".to_string()),
            RespValue::BulkString(listening_port),
        ]),
    )
    .await?;

    if response != RespValue::SimpleString("OK".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let response = send_handshake_command(
        stream,
        &mut buffer,
        RespValue::Array(vec![
            RespValue::BulkString("REPLCONF".to_string()),
            RespValue::BulkString("capa".to_string()),
            RespValue::BulkString("psync2".to_string()),
        ]),
    )
    .await?;

    if response != RespValue::SimpleString("OK".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let response = send_handshake_command(
        stream,
        &mut buffer,
        RespValue::Array(vec![
            RespValue::BulkString("PSYNC".to_string()),
            RespValue::BulkString("?".to_string()),
            RespValue::BulkString("-1".to_string()),
        ]),
    )
    .await?;

    validate_full_resync(&response)?;

    let snapshot_len = read_rdb_snapshot(stream, &mut buffer).await?;
    debug!(bytes = snapshot_len, "discarded master RDB snapshot");

    Ok(buffer)
}

/// Checks a `+FULLRESYNC <replid> <offset>` reply.
fn validate_full_resync(response: &RespValue) -> Result<(), CommandReadError> {
    let RespValue::SimpleString(line) = response else {
        return Err(CommandReadError::InvalidResponseFromMaster);
    };

    let parts = line.split_whitespace().collect::<Vec<&str>>();

    if parts.len() != 3 || parts[0] != "FULLRESYNC" {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    if !is_valid_repl_id(parts[1]) || parts[2].parse::<i64>().is_err() {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    Ok(())
}

fn is_valid_repl_id(repl_id: &str) -> bool {
    match Regex::new(r"^[a-zA-Z0-9]{40}$") {
        Ok(re) => re.is_match(repl_id),
        Err(_) => false,
    }
}

/// Consumes the RDB transfer that follows FULLRESYNC: a `$<len>\r\n` header
/// and `len` raw bytes with no trailing CRLF. Returns the payload length.
async fn read_rdb_snapshot(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
) -> Result<usize, CommandReadError> {
    let header_end = loop {
        if let Some(position) = find_crlf(buffer) {
            break position;
        }

        fill_buffer(stream, buffer).await?;
    };

    if buffer.is_empty() || buffer[0] != b'$' {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    let length = std::str::from_utf8(&buffer[1..header_end])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or(CommandReadError::InvalidResponseFromMaster)?;

    buffer.advance(header_end + 2);

    while buffer.len() < length {
        fill_buffer(stream, buffer).await?;
    }

    buffer.advance(length);

    Ok(length)
}

fn find_crlf(buffer: &BytesMut) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\r\n")
}

async fn fill_buffer(stream: &mut TcpStream, buffer: &mut BytesMut) -> Result<(), CommandReadError> {
    let bytes_read = stream
        .read_buf(buffer)
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))?;

    if bytes_read == 0 {
        return Err(CommandReadError::ConnectionClosed);
    }

    Ok(())
}

/// Sends one handshake command and reads exactly one reply frame.
async fn send_handshake_command(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    command: RespValue,
) -> Result<RespValue, CommandReadError> {
    stream
        .write_all(command.encode().as_bytes())
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))?;

    loop {
        if let Some(frame) = RespValue::try_parse(buffer)? {
            return Ok(frame);
        }

        fill_buffer(stream, buffer).await?;
    }
}
