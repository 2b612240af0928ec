use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::{CommandError, CommandHandler};
use crate::resp::RespValue;
use crate::state::State;

/// The only verbs a session in subscribed mode may issue.
const SUBSCRIBED_MODE_COMMANDS: [&str; 4] = ["SUBSCRIBE", "UNSUBSCRIBE", "PING", "QUIT"];

/// Verbs that may not be queued inside MULTI.
const TRANSACTION_FORBIDDEN_COMMANDS: [&str; 3] = ["SUBSCRIBE", "UNSUBSCRIBE", "PSYNC"];

/// What the connection loop should do with a dispatched command.
#[derive(Debug, PartialEq)]
pub enum DispatchResult {
    /// The dispatcher already produced the reply (MULTI bookkeeping,
    /// queueing, DISCARD, empty EXEC).
    ImmediateResponse(String),
    /// Run the command now.
    ExecuteSingleCommand(CommandHandler),
    /// EXEC: run the queued commands in order under one keyspace lock and
    /// reply the array of their replies.
    ExecuteTransactionCommands(Vec<CommandHandler>),
}

/// Session-mode gatekeeper. Enforces the subscribed-mode restriction and
/// drives the Normal / Queuing state machine before a command reaches its
/// handler.
pub struct CommandDispatcher {
    pub client_address: String,
    pub state: Arc<Mutex<State>>,
}

impl CommandDispatcher {
    pub fn new(client_address: &str, state: Arc<Mutex<State>>) -> Self {
        CommandDispatcher {
            client_address: client_address.to_string(),
            state,
        }
    }

    /// Routes one parsed command through the session state machine.
    ///
    /// In Queuing mode commands are validated for name and arity only and
    /// appended to the queue. A queueing-time rejection replies the error
    /// and marks the transaction, which makes the later EXEC abort; the
    /// session stays in Queuing.
    pub async fn dispatch_command(
        &self,
        command: CommandHandler,
    ) -> Result<DispatchResult, CommandError> {
        let mut state_guard = self.state.lock().await;

        if state_guard.is_subscribed(&self.client_address)
            && !SUBSCRIBED_MODE_COMMANDS.contains(&command.name.as_str())
        {
            return Err(CommandError::SubscribedModeViolation(
                command.name.to_lowercase(),
            ));
        }

        if matches!(command.name.as_str(), "MULTI" | "EXEC" | "DISCARD") {
            if let Some(error) = command.validate_command_arity() {
                return Err(error);
            }
        }

        match command.name.as_str() {
            "MULTI" => {
                if !state_guard.start_transaction(self.client_address.clone()) {
                    return Err(CommandError::MultiNested);
                }

                Ok(DispatchResult::ImmediateResponse(
                    RespValue::SimpleString("OK".to_string()).encode(),
                ))
            }
            "EXEC" => {
                let Some(transaction) = state_guard.take_transaction(&self.client_address) else {
                    return Err(CommandError::ExecWithoutMulti);
                };

                if transaction.errored {
                    return Err(CommandError::ExecAborted);
                }

                if transaction.queue.is_empty() {
                    Ok(DispatchResult::ImmediateResponse(
                        RespValue::Array(Vec::new()).encode(),
                    ))
                } else {
                    Ok(DispatchResult::ExecuteTransactionCommands(transaction.queue))
                }
            }
            "DISCARD" => {
                if state_guard.take_transaction(&self.client_address).is_none() {
                    return Err(CommandError::DiscardWithoutMulti);
                }

                Ok(DispatchResult::ImmediateResponse(
                    RespValue::SimpleString("OK".to_string()).encode(),
                ))
            }
            name if state_guard.in_transaction(&self.client_address) => {
                let validation = if TRANSACTION_FORBIDDEN_COMMANDS.contains(&name) {
                    Some(CommandError::NotAllowedInTransaction(name.to_string()))
                } else {
                    command.validate_command_arity()
                };

                let Some(transaction) = state_guard.transaction_mut(&self.client_address) else {
                    return Err(CommandError::ExecWithoutMulti);
                };

                match validation {
                    Some(error) => {
                        transaction.errored = true;
                        Err(error)
                    }
                    None => {
                        transaction.queue.push(command);
                        Ok(DispatchResult::ImmediateResponse(
                            RespValue::SimpleString("QUEUED".to_string()).encode(),
                        ))
                    }
                }
            }
            _ => Ok(DispatchResult::ExecuteSingleCommand(command)),
        }
    }
}
