use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use crate::commands::{
    blpop, command_error::CommandError, config_get, echo, geoadd, geodist, geopos, geosearch, get,
    incr, info, keys, llen, lpop, lrange, ping, psync, pub_sub, replconf, rpush_and_lpush, set,
    type_command, wait, xadd, xrange, xread, zadd, zcard, zrank, zrange, zrem, zscore,
};
use crate::key_value_store::KeyValueStore;
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::state::State;

/// What a handled command hands back to the connection loop.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// A RESP reply to write to the client.
    Response(String),
    /// Nothing to write (e.g. REPLCONF ACK bookkeeping).
    NoResponse,
    /// The PSYNC reply: FULLRESYNC line plus the RDB transfer. After writing
    /// it the connection is registered as a replica stream.
    FullResync(Vec<u8>),
}

/// A parsed command: uppercased verb, bulk-string arguments and the original
/// frame (re-encoded for replication propagation and offset accounting).
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Builds a handler from an inbound frame, which must be a non-empty
    /// array of bulk strings.
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::UnknownCommand(String::new()));
        };

        let name = match elements.first() {
            Some(RespValue::BulkString(s)) => s.to_uppercase(),
            _ => return Err(CommandError::UnknownCommand(String::new())),
        };

        let mut arguments = Vec::with_capacity(elements.len().saturating_sub(1));

        for element in elements[1..].iter() {
            match element {
                RespValue::BulkString(s) => arguments.push(s.clone()),
                _ => return Err(CommandError::UnknownCommand(name.to_lowercase())),
            }
        }

        Ok(Self {
            name,
            arguments,
            input,
        })
    }

    /// Name-and-arity validation, the only check performed while a command
    /// is queued inside MULTI. Unknown verbs and argument-count mismatches
    /// are caught here; everything deeper waits until execution.
    pub fn validate_command_arity(&self) -> Option<CommandError> {
        let n = self.arguments.len();

        let valid = match self.name.as_str() {
            "PING" | "INFO" => n <= 1,
            "ECHO" | "GET" | "INCR" | "TYPE" | "KEYS" | "LLEN" | "ZCARD" => n == 1,
            "SET" => n == 2 || n == 4,
            "CONFIG" | "ZRANK" | "ZSCORE" | "PSYNC" | "WAIT" | "PUBLISH" => n == 2,
            "RPUSH" | "LPUSH" | "BLPOP" | "ZREM" | "GEOPOS" => n >= 2,
            "LPOP" => n == 1 || n == 2,
            "LRANGE" | "ZRANGE" | "XRANGE" => n == 3,
            "XADD" => n >= 4 && (n - 2) % 2 == 0,
            "XREAD" => n >= 3,
            "ZADD" => n >= 3 && (n - 1) % 2 == 0,
            "GEOADD" => n >= 4 && (n - 1) % 3 == 0,
            "GEODIST" => n == 3 || n == 4,
            "GEOSEARCH" => n == 7,
            "REPLCONF" => n >= 1,
            "SUBSCRIBE" | "UNSUBSCRIBE" => n >= 1,
            "MULTI" | "EXEC" | "DISCARD" | "QUIT" => n == 0,
            _ => return Some(CommandError::UnknownCommand(self.name.to_lowercase())),
        };

        if valid {
            None
        } else {
            Some(CommandError::WrongNumberOfArguments(self.name.to_lowercase()))
        }
    }

    /// Executes the command on behalf of a connected client.
    ///
    /// Non-blocking data commands acquire the keyspace and state locks once,
    /// run to completion and release them. BLPOP, XREAD BLOCK and WAIT may
    /// suspend the session; they manage their own locking so nothing is held
    /// while parked.
    pub async fn execute(
        &self,
        server: &Arc<RwLock<RedisServer>>,
        client_address: &str,
        store: &Arc<Mutex<KeyValueStore>>,
        state: &Arc<Mutex<State>>,
        writer: &Arc<RwLock<OwnedWriteHalf>>,
    ) -> Result<CommandResult, CommandError> {
        if let Some(error) = self.validate_command_arity() {
            return Err(error);
        }

        match self.name.as_str() {
            "PING" => {
                let state_guard = state.lock().await;
                Ok(CommandResult::Response(ping::ping(
                    &self.arguments,
                    state_guard.is_subscribed(client_address),
                )))
            }
            "BLPOP" => blpop::blpop(client_address, store, state, &self.arguments)
                .await
                .map(CommandResult::Response),
            "XREAD" => xread::xread(client_address, store, state, &self.arguments)
                .await
                .map(CommandResult::Response),
            "WAIT" => wait::wait(server, &self.arguments)
                .await
                .map(CommandResult::Response),
            "SUBSCRIBE" => {
                let mut state_guard = state.lock().await;
                Ok(CommandResult::Response(pub_sub::subscribe(
                    client_address,
                    writer,
                    &mut state_guard,
                    &self.arguments,
                )))
            }
            "UNSUBSCRIBE" => {
                let mut state_guard = state.lock().await;
                Ok(CommandResult::Response(pub_sub::unsubscribe(
                    client_address,
                    &mut state_guard,
                    &self.arguments,
                )))
            }
            "PUBLISH" => pub_sub::publish(state, &self.arguments)
                .await
                .map(CommandResult::Response),
            "PSYNC" => psync::psync(server, &self.arguments)
                .await
                .map(CommandResult::FullResync),
            "REPLCONF" => replconf::replconf(server, client_address, &self.arguments).await,
            _ => {
                let mut store_guard = store.lock().await;
                let mut state_guard = state.lock().await;

                self.execute_sync(server, client_address, &mut store_guard, &mut state_guard)
                    .await
                    .map(CommandResult::Response)
            }
        }
    }

    /// Executes the non-suspending form of the command against already-held
    /// keyspace and state guards.
    ///
    /// This is the execution path for EXEC (the whole queue runs under one
    /// continuous keyspace lock) and for commands applied from the master's
    /// replication stream. Blocking commands degrade: BLPOP pops what is
    /// there or answers a null array, XREAD ignores BLOCK, WAIT answers the
    /// currently satisfied replica count.
    pub async fn execute_sync(
        &self,
        server: &Arc<RwLock<RedisServer>>,
        client_address: &str,
        store: &mut KeyValueStore,
        state: &mut State,
    ) -> Result<String, CommandError> {
        if let Some(error) = self.validate_command_arity() {
            return Err(error);
        }

        match self.name.as_str() {
            "PING" => Ok(ping::ping(
                &self.arguments,
                state.is_subscribed(client_address),
            )),
            "ECHO" => echo::echo(&self.arguments),
            "GET" => get::get(store, &self.arguments),
            "SET" => set::set(store, &self.arguments),
            "INCR" => incr::incr(store, &self.arguments),
            "TYPE" => type_command::type_command(store, &self.arguments),
            "KEYS" => keys::keys(store, &self.arguments),
            "CONFIG" => config_get::config_get(server, &self.arguments).await,
            "RPUSH" => rpush_and_lpush::rpush(store, state, &self.arguments),
            "LPUSH" => rpush_and_lpush::lpush(store, state, &self.arguments),
            "LPOP" => lpop::lpop(store, &self.arguments),
            "LLEN" => llen::llen(store, &self.arguments),
            "LRANGE" => lrange::lrange(store, &self.arguments),
            "BLPOP" => blpop::blpop_immediate(store, &self.arguments),
            "XADD" => xadd::xadd(store, state, &self.arguments),
            "XRANGE" => xrange::xrange(store, &self.arguments),
            "XREAD" => xread::xread_immediate(store, &self.arguments),
            "ZADD" => zadd::zadd(store, &self.arguments),
            "ZRANK" => zrank::zrank(store, &self.arguments),
            "ZRANGE" => zrange::zrange(store, &self.arguments),
            "ZCARD" => zcard::zcard(store, &self.arguments),
            "ZSCORE" => zscore::zscore(store, &self.arguments),
            "ZREM" => zrem::zrem(store, &self.arguments),
            "GEOADD" => geoadd::geoadd(store, &self.arguments),
            "GEOPOS" => geopos::geopos(store, &self.arguments),
            "GEODIST" => geodist::geodist(store, &self.arguments),
            "GEOSEARCH" => geosearch::geosearch(store, &self.arguments),
            "INFO" => info::info(server, &self.arguments).await,
            "WAIT" => wait::wait_immediate(server, &self.arguments).await,
            "PUBLISH" => pub_sub::publish_with_state(state, &self.arguments).await,
            "QUIT" => Ok(RespValue::SimpleString("OK".to_string()).encode()),
            "MULTI" => Err(CommandError::MultiNested),
            "EXEC" => Err(CommandError::ExecWithoutMulti),
            "DISCARD" => Err(CommandError::DiscardWithoutMulti),
            name => Err(CommandError::NotAllowedInTransaction(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> CommandHandler {
        let input = RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.to_string()))
                .collect(),
        );

        CommandHandler::new(input).unwrap()
    }

    #[test]
    fn test_new_uppercases_verb_and_splits_arguments() {
        let handler = command(&["set", "fruit", "mango"]);

        assert_eq!(handler.name, "SET");
        assert_eq!(handler.arguments, vec!["fruit", "mango"]);
    }

    #[test]
    fn test_new_rejects_non_array_input() {
        let result = CommandHandler::new(RespValue::SimpleString("PING".to_string()));
        assert!(result.is_err());

        let result = CommandHandler::new(RespValue::Array(vec![RespValue::Integer(1)]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_command_arity() {
        let test_cases = vec![
            (vec!["PING"], true),
            (vec!["PING", "hello"], true),
            (vec!["PING", "a", "b"], false),
            (vec!["GET"], false),
            (vec!["GET", "key"], true),
            (vec!["SET", "key", "value"], true),
            (vec!["SET", "key", "value", "PX", "100"], true),
            (vec!["SET", "key"], false),
            (vec!["XADD", "s", "*", "field", "value"], true),
            (vec!["XADD", "s", "*", "field"], false),
            (vec!["ZADD", "z", "1", "a"], true),
            (vec!["ZADD", "z", "1", "a", "2"], false),
            (vec!["GEOADD", "g", "1", "2", "m"], true),
            (vec!["GEOADD", "g", "1", "2"], false),
            (vec!["GEOSEARCH", "g", "FROMLONLAT", "1", "2", "BYRADIUS", "5", "km"], true),
            (vec!["BLPOP", "list"], false),
            (vec!["BLPOP", "list", "0"], true),
            (vec!["MULTI"], true),
            (vec!["MULTI", "x"], false),
        ];

        for (parts, expected_valid) in test_cases {
            let handler = command(&parts);
            assert_eq!(
                handler.validate_command_arity().is_none(),
                expected_valid,
                "arity of {:?}",
                parts
            );
        }
    }

    #[test]
    fn test_validate_command_arity_rejects_unknown_verbs() {
        let handler = command(&["FLUSHEVERYTHING"]);

        assert_eq!(
            handler.validate_command_arity(),
            Some(CommandError::UnknownCommand("flusheverything".to_string()))
        );
    }
}
