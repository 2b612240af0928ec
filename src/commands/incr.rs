use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore, Value};
use crate::resp::RespValue;

/// INCR parses the stored bytes as a signed 64-bit decimal and stores the
/// incremented value. A missing key counts from zero. Malformed or
/// overflowing values fail without touching the key.
pub fn incr(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let key = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("incr".to_string()))?;

    let next = match get_live(store, key) {
        None => {
            store.insert(
                key.clone(),
                Value::new(DataType::String("1".to_string())),
            );
            1
        }
        Some(value) => match &mut value.data {
            DataType::String(content) => {
                let current = content
                    .parse::<i64>()
                    .map_err(|_| CommandError::NotAnInteger)?;
                let next = current.checked_add(1).ok_or(CommandError::NotAnInteger)?;

                *content = next.to_string();
                next
            }
            _ => return Err(CommandError::WrongType),
        },
    };

    Ok(RespValue::Integer(next).encode())
}
