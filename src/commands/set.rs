use crate::commands::command_error::CommandError;
use crate::key_value_store::{now_ms, DataType, KeyValueStore, Value};
use crate::resp::RespValue;

pub struct SetArguments {
    key: String,
    value: String,
    expires_at: Option<u128>,
}

impl SetArguments {
    /// `SET key value [EX seconds | PX milliseconds]`. The deadline is
    /// recorded as an absolute wall-clock timestamp.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::WrongNumberOfArguments("set".to_string()));
        }

        let mut expires_at = None;

        if arguments.len() == 4 {
            let delta_ms = match arguments[2].to_uppercase().as_str() {
                "EX" => parse_duration(&arguments[3])?.checked_mul(1000),
                "PX" => Some(parse_duration(&arguments[3])?),
                _ => return Err(CommandError::SyntaxError),
            }
            .ok_or(CommandError::NotAnInteger)?;

            expires_at = Some(now_ms() + delta_ms as u128);
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expires_at,
        })
    }
}

fn parse_duration(raw: &str) -> Result<u64, CommandError> {
    raw.parse::<u64>().map_err(|_| CommandError::NotAnInteger)
}

/// SET stores a string value, replacing whatever the key held before
/// (including its expiry).
pub fn set(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = SetArguments::parse(arguments)?;

    store.insert(
        args.key,
        Value {
            data: DataType::String(args.value),
            expires_at: args.expires_at,
        },
    );

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}
