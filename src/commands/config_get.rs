use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `CONFIG GET <parameter>`: answers `[name, value]` for the snapshot
/// location parameters, an empty array for anything unknown.
pub async fn config_get(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("config".to_string()));
    }

    if !arguments[0].eq_ignore_ascii_case("GET") {
        return Err(CommandError::SyntaxError);
    }

    let parameter = arguments[1].to_lowercase();

    let value = {
        let server_guard = server.read().await;

        match parameter.as_str() {
            "dir" => Some(server_guard.dir.clone()),
            "dbfilename" => Some(server_guard.dbfilename.clone()),
            _ => None,
        }
    };

    match value {
        Some(value) => Ok(RespValue::encode_array_from_strings(vec![parameter, value])),
        None => Ok(RespValue::Array(Vec::new()).encode()),
    }
}
