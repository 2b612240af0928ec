use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::command_error::CommandError;
use crate::commands::command_handler::CommandResult;
use crate::resp::RespValue;
use crate::server::RedisServer;

/// REPLCONF on the master side.
///
/// The handshake subcommands (`listening-port`, `capa`) are acknowledged
/// with `+OK`. `ACK <offset>` arrives on a registered replica's connection:
/// it updates the registry row, wakes any WAIT-ing sessions and produces no
/// reply. `GETACK` is only ever serviced on the replica's master stream,
/// never here.
pub async fn replconf(
    server: &Arc<RwLock<RedisServer>>,
    client_address: &str,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let Some(subcommand) = arguments.first() else {
        return Err(CommandError::WrongNumberOfArguments("replconf".to_string()));
    };

    match subcommand.to_lowercase().as_str() {
        "ack" => {
            let offset = arguments
                .get(1)
                .and_then(|raw| raw.parse::<usize>().ok())
                .ok_or(CommandError::InvalidReplicationOffset)?;

            let mut server_guard = server.write().await;
            server_guard.record_replica_ack(client_address, offset);

            Ok(CommandResult::NoResponse)
        }
        "getack" => Err(CommandError::SyntaxError),
        _ => Ok(CommandResult::Response(
            RespValue::SimpleString("OK".to_string()).encode(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn server() -> Arc<RwLock<RedisServer>> {
        Arc::new(RwLock::new(
            RedisServer::new(vec!["rudis".to_string()]).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_handshake_subcommands_reply_ok() {
        let server = server();

        let result = replconf(&server, "c1", &args(&["listening-port", "6380"]))
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Response("+OK\r\n".to_string()));

        let result = replconf(&server, "c1", &args(&["capa", "psync2"]))
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Response("+OK\r\n".to_string()));
    }

    #[tokio::test]
    async fn test_ack_is_silent() {
        let server = server();

        let result = replconf(&server, "c1", &args(&["ACK", "42"])).await.unwrap();

        assert_eq!(result, CommandResult::NoResponse);
    }

    #[tokio::test]
    async fn test_ack_with_bad_offset() {
        let server = server();

        let result = replconf(&server, "c1", &args(&["ACK", "many"])).await;

        assert_eq!(result, Err(CommandError::InvalidReplicationOffset));
    }
}
