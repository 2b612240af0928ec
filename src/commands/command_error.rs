use thiserror::Error;

use crate::resp::RespValue;

/// Command-level failures. Every variant renders as a RESP error frame via
/// [`CommandError::as_string`]; none of them corrupt keyspace state.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is not a valid float")]
    NotAFloat,
    #[error("timeout is negative")]
    NegativeTimeout,
    #[error("syntax error")]
    SyntaxError,
    #[error("{0}")]
    InvalidStreamId(String),
    #[error("invalid longitude,latitude pair {0:.6},{1:.6}")]
    InvalidCoordinates(f64, f64),
    #[error("unsupported unit provided. please use m, km, ft, mi")]
    InvalidGeoUnit,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("MULTI calls can not be nested")]
    MultiNested,
    #[error("transaction discarded because of previous errors")]
    ExecAborted,
    #[error("can't execute '{0}' when client is subscribed")]
    SubscribedModeViolation(String),
    #[error("{0} is not allowed in transactions")]
    NotAllowedInTransaction(String),
    #[error("write commands not allowed on replica")]
    ReplicaWriteForbidden,
    #[error("invalid master replication id")]
    InvalidReplicationId,
    #[error("invalid replication offset")]
    InvalidReplicationOffset,
}

impl CommandError {
    /// The RESP error frame for this failure. WRONGTYPE and EXECABORT carry
    /// their own error-class prefixes; everything else is `ERR`.
    pub fn as_string(&self) -> String {
        let message = match self {
            CommandError::WrongType => {
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
            }
            CommandError::ExecAborted => {
                "EXECABORT Transaction discarded because of previous errors.".to_string()
            }
            CommandError::SubscribedModeViolation(verb) => {
                format!("ERR Can't execute '{}' when client is subscribed", verb)
            }
            other => format!("ERR {}", other),
        };

        RespValue::Error(message).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_frames() {
        let test_cases = vec![
            (
                CommandError::UnknownCommand("foo".to_string()),
                "-ERR unknown command 'foo'\r\n",
            ),
            (
                CommandError::WrongNumberOfArguments("get".to_string()),
                "-ERR wrong number of arguments for 'get' command\r\n",
            ),
            (
                CommandError::WrongType,
                "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
            ),
            (
                CommandError::NotAnInteger,
                "-ERR value is not an integer or out of range\r\n",
            ),
            (
                CommandError::ExecAborted,
                "-EXECABORT Transaction discarded because of previous errors.\r\n",
            ),
            (
                CommandError::SubscribedModeViolation("get".to_string()),
                "-ERR Can't execute 'get' when client is subscribed\r\n",
            ),
            (
                CommandError::ExecWithoutMulti,
                "-ERR EXEC without MULTI\r\n",
            ),
            (
                CommandError::InvalidCoordinates(181.0, 10.0),
                "-ERR invalid longitude,latitude pair 181.000000,10.000000\r\n",
            ),
        ];

        for (error, expected) in test_cases {
            assert_eq!(error.as_string(), expected);
        }
    }
}
