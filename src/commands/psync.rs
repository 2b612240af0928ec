use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::command_error::CommandError;
use crate::rdb::full_resync_payload;
use crate::resp::RespValue;
use crate::server::RedisServer;

pub struct PsyncArguments {
    repl_id: String,
}

impl PsyncArguments {
    /// `PSYNC <replid|?> <offset|-1>`. A fresh replica sends `? -1`.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments("psync".to_string()));
        }

        arguments[1]
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidReplicationOffset)?;

        Ok(Self {
            repl_id: arguments[0].clone(),
        })
    }
}

/// PSYNC always answers with a full resynchronization: the FULLRESYNC line
/// followed by the RDB image as a bulk with no trailing CRLF. The caller
/// registers the connection as a replica after writing the payload.
pub async fn psync(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<Vec<u8>, CommandError> {
    let args = PsyncArguments::parse(arguments)?;

    let server_guard = server.read().await;

    if args.repl_id != "?" && args.repl_id != server_guard.repl_id {
        return Err(CommandError::InvalidReplicationId);
    }

    let mut reply = RespValue::SimpleString(format!(
        "FULLRESYNC {} {}",
        server_guard.repl_id, server_guard.repl_offset
    ))
    .encode()
    .into_bytes();

    reply.extend_from_slice(&full_resync_payload());

    Ok(reply)
}
