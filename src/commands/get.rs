use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// GET: the string value as a bulk reply, a null bulk on a missing (or
/// expired) key, WRONGTYPE on anything that is not a string.
pub fn get(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let key = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("get".to_string()))?;

    match get_live(store, key) {
        None => Ok(RespValue::NullBulkString.encode()),
        Some(value) => match &value.data {
            DataType::String(content) => Ok(RespValue::BulkString(content.clone()).encode()),
            _ => Err(CommandError::WrongType),
        },
    }
}
