use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// ZCARD: member count, zero for an absent key.
pub fn zcard(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let key = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("zcard".to_string()))?;

    let count = match get_live(store, key) {
        None => 0,
        Some(value) => match &value.data {
            DataType::SortedSet(set) => set.len(),
            _ => return Err(CommandError::WrongType),
        },
    };

    Ok(RespValue::Integer(count as i64).encode())
}
