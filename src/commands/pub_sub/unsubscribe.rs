use crate::resp::RespValue;
use crate::state::State;

/// UNSUBSCRIBE removes the session from each named channel and replies one
/// `["unsubscribe", channel, count]` frame per channel. Dropping the last
/// subscription takes the session out of subscribed mode.
pub fn unsubscribe(client_address: &str, state: &mut State, channels: &[String]) -> String {
    let mut response = String::new();

    for channel in channels {
        state.unsubscribe(channel, client_address);

        response.push_str(
            &RespValue::Array(vec![
                RespValue::BulkString("unsubscribe".to_string()),
                RespValue::BulkString(channel.clone()),
                RespValue::Integer(state.subscription_count(client_address)),
            ])
            .encode(),
        );
    }

    response
}
