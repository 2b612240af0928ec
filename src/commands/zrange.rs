use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// ZRANGE over inclusive rank indices with LRANGE-style negative-index
/// normalization.
pub fn zrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("zrange".to_string()));
    }

    let start = arguments[1]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let stop = arguments[2]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let Some(value) = get_live(store, &arguments[0]) else {
        return Ok(RespValue::Array(Vec::new()).encode());
    };

    let DataType::SortedSet(set) = &value.data else {
        return Err(CommandError::WrongType);
    };

    Ok(RespValue::encode_array_from_strings(set.range(start, stop)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::zadd::zadd;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_zrange() {
        let mut store = KeyValueStore::new();
        zadd(
            &mut store,
            &args(&["z", "1", "b", "1", "a", "2", "c", "3", "d"]),
        )
        .unwrap();

        let test_cases = vec![
            (("0", "-1"), "*4\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n$1\r\nd\r\n"),
            (("1", "2"), "*2\r\n$1\r\nb\r\n$1\r\nc\r\n"),
            (("-2", "-1"), "*2\r\n$1\r\nc\r\n$1\r\nd\r\n"),
            (("3", "1"), "*0\r\n"),
        ];

        for ((start, stop), expected) in test_cases {
            assert_eq!(
                zrange(&mut store, &args(&["z", start, stop])),
                Ok(expected.to_string()),
                "range ({}, {})",
                start,
                stop
            );
        }
    }

    #[test]
    fn test_zrange_missing_key() {
        let mut store = KeyValueStore::new();

        assert_eq!(
            zrange(&mut store, &args(&["nokey", "0", "-1"])),
            Ok("*0\r\n".to_string())
        );
    }
}
