//! Per-connection loops: ordinary clients on one side, the replica's
//! master stream on the other.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::commands::{
    CommandDispatcher, CommandError, CommandHandler, CommandResult, DispatchResult,
};
use crate::input::{read_frames, CommandReadError};
use crate::key_value_store::KeyValueStore;
use crate::resp::RespValue;
use crate::server::{RedisRole, RedisServer};
use crate::state::State;

/// Serves one client connection until it closes or breaks protocol.
///
/// Commands execute in arrival order and replies go out in the same order.
/// A RESP framing error closes the connection without a reply; command
/// errors are written as error frames and the connection lives on.
pub async fn handle_client_connection(
    stream: TcpStream,
    server: Arc<RwLock<RedisServer>>,
    client_address: String,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(RwLock::new(writer));
    let mut buffer = BytesMut::with_capacity(4096);

    'connection: loop {
        let frames = match read_frames(&mut reader, &mut buffer).await {
            Ok(frames) => frames,
            Err(CommandReadError::ConnectionClosed) => {
                debug!(client = %client_address, "client disconnected");
                break;
            }
            Err(e) => {
                // protocol-level failure: no reply, drop the connection
                warn!(client = %client_address, error = %e, "closing connection");
                break;
            }
        };

        for input in frames {
            let command = match CommandHandler::new(input) {
                Ok(command) => command,
                Err(e) => {
                    if write_to_stream(&writer, e.as_string().as_bytes()).await.is_err() {
                        break 'connection;
                    }
                    continue;
                }
            };

            if is_write_forbidden(&server, &command).await {
                let error = CommandError::ReplicaWriteForbidden.as_string();
                if write_to_stream(&writer, error.as_bytes()).await.is_err() {
                    break 'connection;
                }
                continue;
            }

            let dispatch_result = match CommandDispatcher::new(&client_address, Arc::clone(&state))
                .dispatch_command(command)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    if write_to_stream(&writer, e.as_string().as_bytes()).await.is_err() {
                        break 'connection;
                    }
                    continue;
                }
            };

            match dispatch_result {
                DispatchResult::ImmediateResponse(response) => {
                    if write_to_stream(&writer, response.as_bytes()).await.is_err() {
                        break 'connection;
                    }
                }
                DispatchResult::ExecuteSingleCommand(command) => {
                    match command
                        .execute(&server, &client_address, &store, &state, &writer)
                        .await
                    {
                        Ok(CommandResult::Response(response)) => {
                            if write_to_stream(&writer, response.as_bytes()).await.is_err() {
                                break 'connection;
                            }

                            if RedisServer::is_write_command(&command.name) {
                                let mut server_guard = server.write().await;
                                server_guard.propagate_write_command(&command.input).await;
                            }
                        }
                        Ok(CommandResult::NoResponse) => {}
                        Ok(CommandResult::FullResync(payload)) => {
                            if write_to_stream(&writer, &payload).await.is_err() {
                                break 'connection;
                            }

                            let mut server_guard = server.write().await;
                            server_guard
                                .register_replica(client_address.clone(), Arc::clone(&writer));
                        }
                        Err(e) => {
                            if write_to_stream(&writer, e.as_string().as_bytes()).await.is_err() {
                                break 'connection;
                            }
                        }
                    }
                }
                DispatchResult::ExecuteTransactionCommands(commands) => {
                    let response =
                        execute_transaction(&commands, &server, &client_address, &store, &state)
                            .await;

                    if write_to_stream(&writer, response.as_bytes()).await.is_err() {
                        break 'connection;
                    }
                }
            }
        }
    }

    // drop whatever the client left behind: parked waits, transaction,
    // subscriptions, replica registration
    {
        let mut state_guard = state.lock().await;
        state_guard.remove_client(&client_address);
    }
    {
        let mut server_guard = server.write().await;
        server_guard.remove_replica(&client_address);
    }
}

/// Runs an EXEC queue in order while holding the keyspace and state locks
/// for the whole batch, so no other session observes an intermediate state.
/// Successful writes still propagate to replicas.
async fn execute_transaction(
    commands: &[CommandHandler],
    server: &Arc<RwLock<RedisServer>>,
    client_address: &str,
    store: &Arc<Mutex<KeyValueStore>>,
    state: &Arc<Mutex<State>>,
) -> String {
    let mut store_guard = store.lock().await;
    let mut state_guard = state.lock().await;

    let mut response = format!("*{}\r\n", commands.len());

    for command in commands {
        match command
            .execute_sync(server, client_address, &mut store_guard, &mut state_guard)
            .await
        {
            Ok(reply) => {
                response.push_str(&reply);

                if RedisServer::is_write_command(&command.name) {
                    let mut server_guard = server.write().await;
                    server_guard.propagate_write_command(&command.input).await;
                }
            }
            Err(e) => response.push_str(&e.as_string()),
        }
    }

    response
}

/// Services the replication stream a replica receives from its master.
///
/// Commands are applied with replies suppressed; application errors are
/// logged and skipped. `REPLCONF GETACK *` is answered with the offset
/// accumulated *before* the GETACK frame itself. Every frame advances the
/// processed-offset counter by its encoded length.
pub async fn handle_master_connection(
    stream: TcpStream,
    leftover: BytesMut,
    server: Arc<RwLock<RedisServer>>,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(RwLock::new(writer));
    let mut buffer = leftover;

    loop {
        let frames = match read_frames(&mut reader, &mut buffer).await {
            Ok(frames) => frames,
            Err(e) => {
                info!(error = %e, "master connection ended");
                break;
            }
        };

        for input in frames {
            let frame_len = input.encoded_len();

            match CommandHandler::new(input) {
                Ok(command) => {
                    if is_getack(&command) {
                        let processed = {
                            let server_guard = server.read().await;
                            server_guard.processed_offset
                        };

                        let ack = RespValue::Array(vec![
                            RespValue::BulkString("REPLCONF".to_string()),
                            RespValue::BulkString("ACK".to_string()),
                            RespValue::BulkString(processed.to_string()),
                        ])
                        .encode();

                        if write_to_stream(&writer, ack.as_bytes()).await.is_err() {
                            return;
                        }
                    } else {
                        let mut store_guard = store.lock().await;
                        let mut state_guard = state.lock().await;

                        if let Err(e) = command
                            .execute_sync(&server, "master", &mut store_guard, &mut state_guard)
                            .await
                        {
                            warn!(command = %command.name, error = %e, "skipping replicated command");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping unparseable frame from master");
                }
            }

            let mut server_guard = server.write().await;
            server_guard.processed_offset += frame_len;
        }
    }
}

fn is_getack(command: &CommandHandler) -> bool {
    command.name == "REPLCONF"
        && command
            .arguments
            .first()
            .is_some_and(|arg| arg.eq_ignore_ascii_case("GETACK"))
}

async fn is_write_forbidden(
    server: &Arc<RwLock<RedisServer>>,
    command: &CommandHandler,
) -> bool {
    let server_guard = server.read().await;

    matches!(server_guard.role, RedisRole::Replica(_))
        && RedisServer::is_write_command(&command.name)
}

pub async fn write_to_stream(
    writer: &Arc<RwLock<OwnedWriteHalf>>,
    response: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.write().await;
    writer_guard.write_all(response).await?;
    writer_guard.flush().await?;

    Ok(())
}
