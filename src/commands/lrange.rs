use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, normalize_range, DataType, KeyValueStore};
use crate::resp::RespValue;

pub struct LrangeArguments {
    key: String,
    start: i64,
    stop: i64,
}

impl LrangeArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 3 {
            return Err(CommandError::WrongNumberOfArguments("lrange".to_string()));
        }

        let start = arguments[1]
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;
        let stop = arguments[2]
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self {
            key: arguments[0].clone(),
            start,
            stop,
        })
    }
}

/// LRANGE: the inclusive slice after negative-index normalization and
/// clamping; a crossed range or absent key is an empty array.
pub fn lrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = LrangeArguments::parse(arguments)?;

    let Some(value) = get_live(store, &args.key) else {
        return Ok(RespValue::Array(Vec::new()).encode());
    };

    let DataType::List(list) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let elements = match normalize_range(args.start, args.stop, list.len()) {
        Some((low, high)) => list
            .iter()
            .skip(low)
            .take(high - low + 1)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    Ok(RespValue::encode_array_from_strings(elements))
}
