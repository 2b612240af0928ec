use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::state::{ChannelSubscriber, State};

/// PUBLISH delivers `["message", channel, payload]` to every subscriber in
/// subscription order and replies the number actually reached.
///
/// The subscriber handles are collected under the state lock; the socket
/// writes happen after it is released.
pub async fn publish(
    state: &Arc<Mutex<State>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    let (channel, payload) = parse(arguments)?;

    let subscribers = {
        let state_guard = state.lock().await;
        state_guard.subscribers(channel)
    };

    Ok(deliver(subscribers, channel, payload).await)
}

/// PUBLISH against an already-held state guard (the EXEC path).
pub async fn publish_with_state(
    state: &mut State,
    arguments: &[String],
) -> Result<String, CommandError> {
    let (channel, payload) = parse(arguments)?;
    let subscribers = state.subscribers(channel);

    Ok(deliver(subscribers, channel, payload).await)
}

fn parse(arguments: &[String]) -> Result<(&str, &str), CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("publish".to_string()));
    }

    Ok((&arguments[0], &arguments[1]))
}

async fn deliver(subscribers: Vec<ChannelSubscriber>, channel: &str, payload: &str) -> String {
    let frame = RespValue::Array(vec![
        RespValue::BulkString("message".to_string()),
        RespValue::BulkString(channel.to_string()),
        RespValue::BulkString(payload.to_string()),
    ])
    .encode();

    let mut delivered = 0;

    for subscriber in subscribers {
        let mut writer = subscriber.writer.write().await;

        if writer.write_all(frame.as_bytes()).await.is_ok() {
            let _ = writer.flush().await;
            delivered += 1;
        }
    }

    RespValue::Integer(delivered).encode()
}
