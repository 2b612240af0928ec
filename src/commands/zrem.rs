use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, remove_if_empty, DataType, KeyValueStore};
use crate::resp::RespValue;

/// ZREM removes each listed member that is present and reports how many
/// went away; removing the last member removes the key.
pub fn zrem(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() < 2 {
        return Err(CommandError::WrongNumberOfArguments("zrem".to_string()));
    }

    let key = &arguments[0];

    let removed = {
        let Some(value) = get_live(store, key) else {
            return Ok(RespValue::Integer(0).encode());
        };

        let DataType::SortedSet(set) = &mut value.data else {
            return Err(CommandError::WrongType);
        };

        arguments[1..]
            .iter()
            .filter(|member| set.remove(member))
            .count()
    };

    remove_if_empty(store, key);

    Ok(RespValue::Integer(removed as i64).encode())
}
