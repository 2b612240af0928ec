use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, remove_if_empty, DataType, KeyValueStore};
use crate::resp::RespValue;
use crate::state::{ListWaiter, State};

#[derive(Debug, PartialEq)]
pub struct BlpopArguments {
    keys: Vec<String>,
    timeout_secs: f64,
}

impl BlpopArguments {
    /// Parses the arguments of `BLPOP key [key ...] timeout`.
    ///
    /// # Arguments
    ///
    /// * `arguments` - at least one key followed by the timeout in seconds.
    ///   The timeout may be fractional; `0` blocks indefinitely.
    ///
    /// # Returns
    ///
    /// * `Ok(BlpopArguments)` - the watched keys and the parsed timeout
    /// * `Err(CommandError::WrongNumberOfArguments)` - fewer than two arguments
    /// * `Err(CommandError::NotAFloat)` - the timeout is not a number
    /// * `Err(CommandError::NegativeTimeout)` - the timeout is negative or not finite
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::WrongNumberOfArguments("blpop".to_string()));
        }

        let (keys, timeout) = arguments.split_at(arguments.len() - 1);

        let timeout_secs = timeout[0]
            .parse::<f64>()
            .map_err(|_| CommandError::NotAFloat)?;

        if timeout_secs < 0.0 || !timeout_secs.is_finite() {
            return Err(CommandError::NegativeTimeout);
        }

        Ok(Self {
            keys: keys.to_vec(),
            timeout_secs,
        })
    }
}

/// BLPOP: pops from the first listed key holding a non-empty list; parks
/// the session on all listed keys otherwise. A push wakes the
/// earliest-parked watcher with `[key, value]`; hitting the deadline
/// answers a null array.
pub async fn blpop(
    client_address: &str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = BlpopArguments::parse(arguments)?;

    let (waiter_id, receiver) = {
        let mut store_guard = store.lock().await;
        let mut state_guard = state.lock().await;

        if let Some(reply) = pop_first_available(&mut store_guard, &args.keys)? {
            return Ok(reply);
        }

        let (sender, receiver) = oneshot::channel();
        let waiter_id = state_guard.next_waiter_id();

        state_guard.park_list_waiter(ListWaiter {
            id: waiter_id,
            client_address: client_address.to_string(),
            keys: args.keys.clone(),
            sender,
        });

        (waiter_id, receiver)
    };

    match wait_for_wake(receiver, args.timeout_secs).await {
        Some((key, value)) => Ok(RespValue::encode_array_from_strings(vec![key, value])),
        None => {
            let mut state_guard = state.lock().await;
            state_guard.remove_list_waiter(waiter_id);

            Ok(RespValue::NullArray.encode())
        }
    }
}

/// The non-blocking BLPOP used inside EXEC: pop what is there or answer the
/// null array immediately.
pub fn blpop_immediate(
    store: &mut KeyValueStore,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = BlpopArguments::parse(arguments)?;

    match pop_first_available(store, &args.keys)? {
        Some(reply) => Ok(reply),
        None => Ok(RespValue::NullArray.encode()),
    }
}

fn pop_first_available(
    store: &mut KeyValueStore,
    keys: &[String],
) -> Result<Option<String>, CommandError> {
    for key in keys {
        let Some(value) = get_live(store, key) else {
            continue;
        };

        let DataType::List(list) = &mut value.data else {
            return Err(CommandError::WrongType);
        };

        if let Some(front) = list.pop_front() {
            remove_if_empty(store, key);

            return Ok(Some(RespValue::encode_array_from_strings(vec![
                key.clone(),
                front,
            ])));
        }
    }

    Ok(None)
}

/// Waits for a wake with an optional deadline.
///
/// On timeout the channel is closed before the final drain, so a push that
/// raced the deadline either lands here (and is delivered) or fails its
/// send and re-queues the element.
async fn wait_for_wake(
    mut receiver: oneshot::Receiver<(String, String)>,
    timeout_secs: f64,
) -> Option<(String, String)> {
    if timeout_secs == 0.0 {
        return receiver.await.ok();
    }

    match tokio::time::timeout(Duration::from_secs_f64(timeout_secs), &mut receiver).await {
        Ok(result) => result.ok(),
        Err(_) => {
            receiver.close();
            receiver.try_recv().ok()
        }
    }
}
