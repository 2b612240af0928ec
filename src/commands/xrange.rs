use std::ops::Bound;

use crate::commands::command_error::CommandError;
use crate::commands::stream_utils::{encode_stream_entries, parse_range_bound};
use crate::key_value_store::{get_live, DataType, KeyValueStore, StreamId};
use crate::resp::RespValue;

pub struct XrangeArguments {
    key: String,
    low: StreamId,
    high: StreamId,
}

impl XrangeArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 3 {
            return Err(CommandError::WrongNumberOfArguments("xrange".to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
            low: parse_range_bound(&arguments[1], true)?,
            high: parse_range_bound(&arguments[2], false)?,
        })
    }
}

/// XRANGE: every entry with `low <= id <= high` in ID order.
pub fn xrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = XrangeArguments::parse(arguments)?;

    let Some(value) = get_live(store, &args.key) else {
        return Ok(RespValue::Array(Vec::new()).encode());
    };

    let DataType::Stream(stream) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let entries: Vec<(StreamId, Vec<(String, String)>)> = stream
        .range((Bound::Included(args.low), Bound::Included(args.high)))
        .map(|(id, fields)| (*id, fields.clone()))
        .collect();

    Ok(encode_stream_entries(&entries).encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_value_store::Value;
    use std::collections::BTreeMap;

    fn store_with_stream() -> KeyValueStore {
        let mut stream = BTreeMap::new();
        for (ms, seq) in [(1u64, 1u64), (2, 0), (2, 1), (3, 0)] {
            stream.insert(
                StreamId::new(ms, seq),
                vec![("n".to_string(), format!("v{}{}", ms, seq))],
            );
        }

        let mut store = KeyValueStore::new();
        store.insert("s".to_string(), Value::new(DataType::Stream(stream)));
        store
    }

    fn ids_of(response: &str) -> Vec<String> {
        response
            .split("\r\n")
            .filter(|part| part.contains('-') && !part.starts_with('*') && !part.starts_with('$'))
            .map(|part| part.to_string())
            .collect()
    }

    #[test]
    fn test_xrange_inclusive_bounds() {
        let mut store = store_with_stream();

        let response = xrange(
            &mut store,
            &["s".to_string(), "2-0".to_string(), "2-1".to_string()],
        )
        .unwrap();

        assert_eq!(ids_of(&response), vec!["2-0", "2-1"]);
    }

    #[test]
    fn test_xrange_min_and_max_sentinels() {
        let mut store = store_with_stream();

        let response = xrange(
            &mut store,
            &["s".to_string(), "-".to_string(), "+".to_string()],
        )
        .unwrap();

        assert_eq!(ids_of(&response), vec!["1-1", "2-0", "2-1", "3-0"]);
    }

    #[test]
    fn test_xrange_bare_ms_bounds() {
        let mut store = store_with_stream();

        // a bare low bound starts at seq 0, a bare high bound ends at seq MAX
        let response = xrange(
            &mut store,
            &["s".to_string(), "2".to_string(), "2".to_string()],
        )
        .unwrap();

        assert_eq!(ids_of(&response), vec!["2-0", "2-1"]);
    }

    #[test]
    fn test_xrange_missing_key() {
        let mut store = KeyValueStore::new();

        let response = xrange(
            &mut store,
            &["missing".to_string(), "-".to_string(), "+".to_string()],
        )
        .unwrap();

        assert_eq!(response, "*0\r\n");
    }
}
