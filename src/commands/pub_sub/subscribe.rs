use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::RwLock;

use crate::resp::RespValue;
use crate::state::{ChannelSubscriber, State};

/// SUBSCRIBE registers the session on each named channel in argument order
/// and replies one `["subscribe", channel, count]` frame per channel, where
/// `count` is the session's subscription total after that registration.
/// The first registration puts the session into subscribed mode.
pub fn subscribe(
    client_address: &str,
    writer: &Arc<RwLock<OwnedWriteHalf>>,
    state: &mut State,
    channels: &[String],
) -> String {
    let mut response = String::new();

    for channel in channels {
        state.subscribe(
            channel.clone(),
            ChannelSubscriber {
                client_address: client_address.to_string(),
                writer: Arc::clone(writer),
            },
        );

        response.push_str(
            &RespValue::Array(vec![
                RespValue::BulkString("subscribe".to_string()),
                RespValue::BulkString(channel.clone()),
                RespValue::Integer(state.subscription_count(client_address)),
            ])
            .encode(),
        );
    }

    response
}
