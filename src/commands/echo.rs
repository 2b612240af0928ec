use crate::commands::command_error::CommandError;
use crate::resp::RespValue;

pub fn echo(arguments: &[String]) -> Result<String, CommandError> {
    let message = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("echo".to_string()))?;

    Ok(RespValue::BulkString(message.clone()).encode())
}
