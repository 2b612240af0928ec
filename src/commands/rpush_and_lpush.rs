use std::collections::VecDeque;

use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, remove_if_empty, DataType, KeyValueStore, Value};
use crate::resp::RespValue;
use crate::state::State;

pub struct PushArguments {
    key: String,
    elements: Vec<String>,
}

impl PushArguments {
    pub fn parse(arguments: &[String], verb: &str) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::WrongNumberOfArguments(verb.to_string()));
        }

        Ok(Self {
            key: arguments[0].clone(),
            elements: arguments[1..].to_vec(),
        })
    }
}

/// RPUSH appends in argument order.
pub fn rpush(
    store: &mut KeyValueStore,
    state: &mut State,
    arguments: &[String],
) -> Result<String, CommandError> {
    push(store, state, arguments, "rpush", false)
}

/// LPUSH pushes each element as the new head, which reverses the observable
/// order of the arguments.
pub fn lpush(
    store: &mut KeyValueStore,
    state: &mut State,
    arguments: &[String],
) -> Result<String, CommandError> {
    push(store, state, arguments, "lpush", true)
}

/// Inserts the elements, then hands head elements to parked BLPOP clients
/// in FIFO arrival order while the locks are still held. The reported size
/// is the length right after insertion, before any waiter was served.
fn push(
    store: &mut KeyValueStore,
    state: &mut State,
    arguments: &[String],
    verb: &str,
    prepend: bool,
) -> Result<String, CommandError> {
    let args = PushArguments::parse(arguments, verb)?;

    let _ = get_live(store, &args.key);

    let size = {
        let value = store
            .entry(args.key.clone())
            .or_insert_with(|| Value::new(DataType::List(VecDeque::new())));

        let DataType::List(list) = &mut value.data else {
            return Err(CommandError::WrongType);
        };

        for element in args.elements {
            if prepend {
                list.push_front(element);
            } else {
                list.push_back(element);
            }
        }

        let size = list.len();

        while !list.is_empty() {
            let Some(waiter) = state.pop_list_waiter(&args.key) else {
                break;
            };

            let Some(front) = list.pop_front() else {
                break;
            };

            if let Err((_, returned)) = waiter.sender.send((args.key.clone(), front)) {
                // the waiter vanished between parking and now; put the
                // element back and offer it to the next one
                list.push_front(returned);
            }
        }

        size
    };

    remove_if_empty(store, &args.key);

    Ok(RespValue::Integer(size as i64).encode())
}
