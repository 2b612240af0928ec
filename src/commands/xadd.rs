use std::collections::BTreeMap;

use crate::commands::command_error::CommandError;
use crate::commands::stream_utils::{parse_xadd_id, resolve_entry_id};
use crate::key_value_store::{get_live, now_ms, DataType, KeyValueStore, Value};
use crate::resp::RespValue;
use crate::state::State;

pub struct XaddArguments {
    key: String,
    raw_id: String,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    /// Parses the arguments of `XADD key id field value [field value ...]`.
    ///
    /// # Arguments
    ///
    /// * `arguments` - the stream key, the entry ID (`*`, `ms-*` or
    ///   `ms-seq`) and at least one field/value pair. Pair order is
    ///   preserved in the stored entry.
    ///
    /// # Returns
    ///
    /// * `Ok(XaddArguments)` - the parsed key, raw ID and field pairs
    /// * `Err(CommandError::WrongNumberOfArguments)` - fewer than four
    ///   arguments, or an unpaired field
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 4 || (arguments.len() - 2) % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xadd".to_string()));
        }

        let fields = arguments[2..]
            .chunks(2)
            .map(|chunk| (chunk[0].clone(), chunk[1].clone()))
            .collect();

        Ok(Self {
            key: arguments[0].clone(),
            raw_id: arguments[1].clone(),
            fields,
        })
    }
}

/// XADD appends an entry with an ID strictly greater than the stream's
/// current tail, creating the stream on first use, then wakes every client
/// parked on the stream by XREAD BLOCK.
pub fn xadd(
    store: &mut KeyValueStore,
    state: &mut State,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = XaddArguments::parse(arguments)?;
    let spec = parse_xadd_id(&args.raw_id)?;

    let _ = get_live(store, &args.key);

    let last_id = match store.get(&args.key) {
        Some(value) => match &value.data {
            DataType::Stream(stream) => stream.keys().next_back().copied(),
            _ => return Err(CommandError::WrongType),
        },
        None => None,
    };

    let id = resolve_entry_id(spec, last_id, now_ms() as u64)?;

    let value = store
        .entry(args.key.clone())
        .or_insert_with(|| Value::new(DataType::Stream(BTreeMap::new())));

    let DataType::Stream(stream) = &mut value.data else {
        return Err(CommandError::WrongType);
    };

    stream.insert(id, args.fields);

    for waiter in state.drain_stream_waiters(&args.key) {
        let _ = waiter.sender.send(());
    }

    Ok(RespValue::BulkString(id.to_string()).encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_value_store::StreamId;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_xadd_explicit_ids_must_increase() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();

        let response = xadd(&mut store, &mut state, &args(&["s", "1-1", "f", "v"])).unwrap();
        assert_eq!(response, "$3\r\n1-1\r\n");

        let response = xadd(&mut store, &mut state, &args(&["s", "2-0", "f", "v"])).unwrap();
        assert_eq!(response, "$3\r\n2-0\r\n");

        let result = xadd(&mut store, &mut state, &args(&["s", "2-0", "f", "v"]));
        assert!(result.is_err());

        let result = xadd(&mut store, &mut state, &args(&["s", "1-5", "f", "v"]));
        assert!(result.is_err());

        // failed XADD left the stream unchanged
        match &store.get("s").unwrap().data {
            DataType::Stream(stream) => assert_eq!(stream.len(), 2),
            other => panic!("expected stream, found {:?}", other),
        }
    }

    #[test]
    fn test_xadd_rejects_zero_zero() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();

        let result = xadd(&mut store, &mut state, &args(&["s", "0-0", "f", "v"]));

        assert!(result.is_err());
        assert!(!store.contains_key("s"));
    }

    #[test]
    fn test_xadd_auto_sequence() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();

        xadd(&mut store, &mut state, &args(&["s", "5-5", "f", "v"])).unwrap();
        let response = xadd(&mut store, &mut state, &args(&["s", "5-*", "f", "v"])).unwrap();

        assert_eq!(response, "$3\r\n5-6\r\n");
    }

    #[test]
    fn test_xadd_fully_auto_ids_are_strictly_increasing() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();
        let mut previous = None;

        for _ in 0..3 {
            xadd(&mut store, &mut state, &args(&["s", "*", "f", "v"])).unwrap();

            let last = match &store.get("s").unwrap().data {
                DataType::Stream(stream) => *stream.keys().next_back().unwrap(),
                other => panic!("expected stream, found {:?}", other),
            };

            if let Some(previous) = previous {
                assert!(last > previous, "{} not greater than {}", last, previous);
            }
            previous = Some(last);
        }
    }

    #[test]
    fn test_xadd_preserves_field_order() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();

        xadd(
            &mut store,
            &mut state,
            &args(&["s", "1-1", "zeta", "1", "alpha", "2"]),
        )
        .unwrap();

        match &store.get("s").unwrap().data {
            DataType::Stream(stream) => {
                let fields = stream.get(&StreamId::new(1, 1)).unwrap();
                assert_eq!(
                    fields,
                    &vec![
                        ("zeta".to_string(), "1".to_string()),
                        ("alpha".to_string(), "2".to_string()),
                    ]
                );
            }
            other => panic!("expected stream, found {:?}", other),
        }
    }

    #[test]
    fn test_xadd_wrong_type() {
        let mut store = KeyValueStore::new();
        let mut state = State::new();
        store.insert(
            "s".to_string(),
            Value::new(DataType::String("v".to_string())),
        );

        let result = xadd(&mut store, &mut state, &args(&["s", "*", "f", "v"]));

        assert_eq!(result, Err(CommandError::WrongType));
    }
}
