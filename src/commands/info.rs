use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::server::RedisServer;

/// INFO: the replication section (role, replication ID and offset) as a
/// bulk string. Other sections are accepted but empty.
pub async fn info(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    if arguments.len() > 1 {
        return Err(CommandError::WrongNumberOfArguments("info".to_string()));
    }

    let section = arguments
        .first()
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "replication".to_string());

    let body = if section == "replication" {
        let server_guard = server.read().await;
        server_guard.info_replication()
    } else {
        String::new()
    };

    Ok(RespValue::BulkString(body).encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_info_replication_section() {
        let server = Arc::new(RwLock::new(
            RedisServer::new(vec!["rudis".to_string()]).unwrap(),
        ));

        let response = info(&server, &["replication".to_string()]).await.unwrap();

        assert!(response.contains("role:master"));
        assert!(response.contains("master_replid:"));
        assert!(response.contains("master_repl_offset:0"));
    }

    #[tokio::test]
    async fn test_info_defaults_to_replication() {
        let server = Arc::new(RwLock::new(
            RedisServer::new(vec!["rudis".to_string()]).unwrap(),
        ));

        let response = info(&server, &[]).await.unwrap();

        assert!(response.contains("role:master"));
    }

    #[tokio::test]
    async fn test_info_unknown_section_is_empty() {
        let server = Arc::new(RwLock::new(
            RedisServer::new(vec!["rudis".to_string()]).unwrap(),
        ));

        let response = info(&server, &["keyspace".to_string()]).await.unwrap();

        assert_eq!(response, "$0\r\n\r\n");
    }
}
