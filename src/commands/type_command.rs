use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, KeyValueStore};
use crate::resp::RespValue;

/// TYPE: the shape name of the value at `key`, or `none` for an absent key.
pub fn type_command(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let key = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("type".to_string()))?;

    let type_name = match get_live(store, key) {
        Some(value) => value.data.type_name(),
        None => "none",
    };

    Ok(RespValue::BulkString(type_name.to_string()).encode())
}
