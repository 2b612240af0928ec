use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

use crate::commands::command_error::CommandError;
use crate::commands::stream_utils::{encode_stream_entries, parse_xread_id};
use crate::key_value_store::{get_live, DataType, KeyValueStore, StreamId};
use crate::resp::RespValue;
use crate::state::{State, StreamWaiter};

#[derive(Debug, PartialEq)]
pub struct XreadArguments {
    block_ms: Option<u64>,
    keys: Vec<String>,
    raw_ids: Vec<String>,
}

impl XreadArguments {
    /// `XREAD [BLOCK ms] STREAMS key [key ...] id [id ...]` with as many
    /// IDs as keys.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let mut index = 0;
        let mut block_ms = None;

        if arguments
            .first()
            .is_some_and(|arg| arg.eq_ignore_ascii_case("BLOCK"))
        {
            let raw = arguments
                .get(1)
                .ok_or_else(|| CommandError::WrongNumberOfArguments("xread".to_string()))?;

            block_ms = Some(raw.parse::<u64>().map_err(|_| CommandError::NotAnInteger)?);
            index = 2;
        }

        match arguments.get(index) {
            Some(keyword) if keyword.eq_ignore_ascii_case("STREAMS") => {}
            _ => return Err(CommandError::SyntaxError),
        }

        let rest = &arguments[index + 1..];

        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xread".to_string()));
        }

        let (keys, raw_ids) = rest.split_at(rest.len() / 2);

        Ok(Self {
            block_ms,
            keys: keys.to_vec(),
            raw_ids: raw_ids.to_vec(),
        })
    }
}

/// XREAD: entries strictly after the given IDs, one `[key, entries]` pair
/// per stream that has matches, in the order the keys were requested.
///
/// With BLOCK the `$` sentinel resolves to each stream's current last ID
/// inside the critical section, the session parks on all named streams, and
/// a wake re-reads past those baselines. Hitting the deadline answers a
/// null array.
pub async fn xread(
    client_address: &str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = XreadArguments::parse(arguments)?;

    let (baselines, waiter_id, receiver) = {
        let mut store_guard = store.lock().await;
        let mut state_guard = state.lock().await;

        let baselines = resolve_baselines(&mut store_guard, &args.keys, &args.raw_ids)?;
        let matches = collect_entries(&mut store_guard, &args.keys, &baselines)?;

        if !matches.is_empty() {
            return Ok(encode_reply(matches));
        }

        if args.block_ms.is_none() {
            return Ok(RespValue::Array(Vec::new()).encode());
        }

        let (sender, receiver) = oneshot::channel();
        let waiter_id = state_guard.next_waiter_id();

        state_guard.park_stream_waiter(StreamWaiter {
            id: waiter_id,
            client_address: client_address.to_string(),
            keys: args.keys.clone(),
            sender,
        });

        drop(state_guard);
        drop(store_guard);

        (baselines, waiter_id, receiver)
    };

    let block_ms = args.block_ms.unwrap_or(0);

    if !wait_for_wake(receiver, block_ms).await {
        let mut state_guard = state.lock().await;
        state_guard.remove_stream_waiter(waiter_id);

        return Ok(RespValue::NullArray.encode());
    }

    let mut store_guard = store.lock().await;
    let matches = collect_entries(&mut store_guard, &args.keys, &baselines)?;

    if matches.is_empty() {
        return Ok(RespValue::NullArray.encode());
    }

    Ok(encode_reply(matches))
}

/// The non-blocking XREAD used inside EXEC and on the replica's command
/// stream: BLOCK is ignored.
pub fn xread_immediate(
    store: &mut KeyValueStore,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = XreadArguments::parse(arguments)?;

    let baselines = resolve_baselines(store, &args.keys, &args.raw_ids)?;
    let matches = collect_entries(store, &args.keys, &baselines)?;

    if matches.is_empty() {
        return Ok(RespValue::Array(Vec::new()).encode());
    }

    Ok(encode_reply(matches))
}

/// Turns each requested ID into an exclusive baseline; `$` becomes the
/// stream's current last ID (or the minimum for an absent stream).
fn resolve_baselines(
    store: &mut KeyValueStore,
    keys: &[String],
    raw_ids: &[String],
) -> Result<Vec<StreamId>, CommandError> {
    keys.iter()
        .zip(raw_ids)
        .map(|(key, raw)| {
            if raw == "$" {
                let last = match get_live(store, key) {
                    Some(value) => match &value.data {
                        DataType::Stream(stream) => stream.keys().next_back().copied(),
                        _ => return Err(CommandError::WrongType),
                    },
                    None => None,
                };

                Ok(last.unwrap_or(StreamId::MIN))
            } else {
                parse_xread_id(raw)
            }
        })
        .collect()
}

type StreamMatches = Vec<(String, Vec<(StreamId, Vec<(String, String)>)>)>;

/// Entries strictly greater than each stream's baseline, keyed in request
/// order; streams with nothing new are omitted.
fn collect_entries(
    store: &mut KeyValueStore,
    keys: &[String],
    baselines: &[StreamId],
) -> Result<StreamMatches, CommandError> {
    let mut matches = Vec::new();

    for (key, baseline) in keys.iter().zip(baselines) {
        let Some(value) = get_live(store, key) else {
            continue;
        };

        let DataType::Stream(stream) = &value.data else {
            return Err(CommandError::WrongType);
        };

        let entries: Vec<(StreamId, Vec<(String, String)>)> = stream
            .range((Bound::Excluded(*baseline), Bound::Unbounded))
            .map(|(id, fields)| (*id, fields.clone()))
            .collect();

        if !entries.is_empty() {
            matches.push((key.clone(), entries));
        }
    }

    Ok(matches)
}

fn encode_reply(matches: StreamMatches) -> String {
    RespValue::Array(
        matches
            .into_iter()
            .map(|(key, entries)| {
                RespValue::Array(vec![
                    RespValue::BulkString(key),
                    encode_stream_entries(&entries),
                ])
            })
            .collect::<Vec<RespValue>>(),
    )
    .encode()
}

async fn wait_for_wake(mut receiver: oneshot::Receiver<()>, block_ms: u64) -> bool {
    if block_ms == 0 {
        return receiver.await.is_ok();
    }

    match tokio::time::timeout(Duration::from_millis(block_ms), &mut receiver).await {
        Ok(result) => result.is_ok(),
        Err(_) => {
            receiver.close();
            receiver.try_recv().is_ok()
        }
    }
}
