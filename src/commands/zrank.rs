use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// ZRANK: 0-based position under (score asc, member asc), null when the
/// key or member is absent.
pub fn zrank(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("zrank".to_string()));
    }

    let Some(value) = get_live(store, &arguments[0]) else {
        return Ok(RespValue::NullBulkString.encode());
    };

    let DataType::SortedSet(set) = &value.data else {
        return Err(CommandError::WrongType);
    };

    match set.rank(&arguments[1]) {
        Some(rank) => Ok(RespValue::Integer(rank as i64).encode()),
        None => Ok(RespValue::NullBulkString.encode()),
    }
}
