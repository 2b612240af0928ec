use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, remove_if_empty, DataType, KeyValueStore};
use crate::resp::RespValue;

pub struct LpopArguments {
    key: String,
    count: Option<usize>,
}

impl LpopArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.is_empty() || arguments.len() > 2 {
            return Err(CommandError::WrongNumberOfArguments("lpop".to_string()));
        }

        let count = match arguments.get(1) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| CommandError::NotAnInteger)?),
            None => None,
        };

        Ok(Self {
            key: arguments[0].clone(),
            count,
        })
    }
}

/// LPOP removes and returns the head. With a count the reply is an array of
/// up to `count` elements; the single popped element is a bulk string.
pub fn lpop(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = LpopArguments::parse(arguments)?;

    let popped = {
        let Some(value) = get_live(store, &args.key) else {
            return Ok(RespValue::NullBulkString.encode());
        };

        let DataType::List(list) = &mut value.data else {
            return Err(CommandError::WrongType);
        };

        let requested = args.count.unwrap_or(1).min(list.len());
        list.drain(..requested).collect::<Vec<String>>()
    };

    remove_if_empty(store, &args.key);

    if popped.is_empty() {
        return Ok(RespValue::NullBulkString.encode());
    }

    if popped.len() == 1 {
        return Ok(RespValue::BulkString(popped.into_iter().next().unwrap_or_default()).encode());
    }

    Ok(RespValue::encode_array_from_strings(popped))
}
