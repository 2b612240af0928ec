use crate::resp::RespValue;

/// PING replies `+PONG` (or echoes its argument as a bulk string). Inside
/// subscribed mode the reply takes the message-frame shape `["pong", arg]`
/// so it can be told apart from channel traffic.
pub fn ping(arguments: &[String], subscribed: bool) -> String {
    if subscribed {
        let payload = arguments.first().cloned().unwrap_or_default();

        return RespValue::Array(vec![
            RespValue::BulkString("pong".to_string()),
            RespValue::BulkString(payload),
        ])
        .encode();
    }

    match arguments.first() {
        Some(message) => RespValue::BulkString(message.clone()).encode(),
        None => RespValue::SimpleString("PONG".to_string()).encode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        assert_eq!(ping(&[], false), "+PONG\r\n");
        assert_eq!(ping(&["hello".to_string()], false), "$5\r\nhello\r\n");
    }

    #[test]
    fn test_ping_in_subscribed_mode() {
        assert_eq!(ping(&[], true), "*2\r\n$4\r\npong\r\n$0\r\n\r\n");
        assert_eq!(
            ping(&["hi".to_string()], true),
            "*2\r\n$4\r\npong\r\n$2\r\nhi\r\n"
        );
    }
}
