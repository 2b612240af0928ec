use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// LLEN: list length, zero for an absent key.
pub fn llen(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let key = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("llen".to_string()))?;

    let length = match get_live(store, key) {
        None => 0,
        Some(value) => match &value.data {
            DataType::List(list) => list.len(),
            _ => return Err(CommandError::WrongType),
        },
    };

    Ok(RespValue::Integer(length as i64).encode())
}
