use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// Renders a score the way replies expect it: shortest round-trip decimal,
/// lowercase `inf`/`-inf` for the infinities.
pub fn format_score(score: f64) -> String {
    format!("{}", score)
}

/// ZSCORE: the member's score as a bulk string, null when absent.
pub fn zscore(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("zscore".to_string()));
    }

    let Some(value) = get_live(store, &arguments[0]) else {
        return Ok(RespValue::NullBulkString.encode());
    };

    let DataType::SortedSet(set) = &value.data else {
        return Err(CommandError::WrongType);
    };

    match set.score(&arguments[1]) {
        Some(score) => Ok(RespValue::BulkString(format_score(score)).encode()),
        None => Ok(RespValue::NullBulkString.encode()),
    }
}
