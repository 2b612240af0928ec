//! Server configuration and lifecycle.
//!
//! Parses the command line, owns the replication identity and the replica
//! registry, and runs the accept loop. A replica-role server additionally
//! opens the connection to its master and performs the handshake before it
//! starts serving clients.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{error, info, warn};

use crate::connection::{handle_client_connection, handle_master_connection};
use crate::input::{handshake, CommandReadError};
use crate::key_value_store::KeyValueStore;
use crate::rdb::{EmptySnapshot, SnapshotError, SnapshotSource};
use crate::resp::RespValue;
use crate::state::State;

/// Commands whose successful execution mutates the keyspace and must be
/// forwarded to replicas.
pub const WRITE_COMMANDS: [&str; 9] = [
    "SET", "RPUSH", "LPUSH", "LPOP", "INCR", "XADD", "ZADD", "ZREM", "GEOADD",
];

#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid port flag value")]
    InvalidPortFlagValue,
    #[error("Invalid master address")]
    InvalidMasterAddress,
    #[error("Invalid master port")]
    InvalidMasterPort,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind TCP listener: {0}")]
    Bind(std::io::Error),
    #[error("failed to connect to master: {0}")]
    MasterConnect(std::io::Error),
    #[error("replication handshake failed: {0}")]
    Handshake(#[from] CommandReadError),
    #[error("failed to load snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// The role a server instance runs in: a master accepts writes and feeds
/// replicas; a replica applies its master's command stream and serves reads.
#[derive(Debug, PartialEq, Clone)]
pub enum RedisRole {
    Master,
    Replica((String, u16)),
}

impl RedisRole {
    /// Role name as reported by INFO (`slave` is the wire-level term).
    pub fn as_string(&self) -> &str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica(_) => "slave",
        }
    }
}

/// Everything the command line can configure. Each flag takes exactly one
/// value; whatever is absent falls back to a default when the server is
/// built.
#[derive(Debug, Default)]
struct CliOptions {
    port: Option<u16>,
    replica_of: Option<(String, u16)>,
    dir: Option<String>,
    dbfilename: Option<String>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Self, CliError> {
        let mut options = CliOptions::default();

        while let Some(flag) = args.next() {
            let value = args.next().ok_or(CliError::InvalidCommandLineFlag)?;

            match flag.as_str() {
                "--port" => {
                    options.port = Some(parse_port(&value).ok_or(CliError::InvalidPortFlagValue)?);
                }
                "--replicaof" => {
                    options.replica_of = Some(parse_master_address(&value)?);
                }
                "--dir" => options.dir = Some(value),
                "--dbfilename" => options.dbfilename = Some(value),
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(options)
    }
}

/// A usable TCP port: decimal, in range for `u16`, and not the reserved
/// port zero.
fn parse_port(raw: &str) -> Option<u16> {
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Splits a `--replicaof` value of the form `"<host> <port>"`.
///
/// A host that looks like a dotted quad must actually parse as an IPv4
/// address (so `10.0.0.999` is rejected); anything else passes as a
/// hostname of letters, digits, dots and hyphens.
fn parse_master_address(raw: &str) -> Result<(String, u16), CliError> {
    let mut parts = raw.split_whitespace();

    let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CliError::InvalidMasterAddress);
    };

    let looks_numeric = host.bytes().all(|b| b.is_ascii_digit() || b == b'.');

    let host_is_valid = if looks_numeric {
        host.parse::<Ipv4Addr>().is_ok()
    } else {
        host.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    };

    if !host_is_valid {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = parse_port(port).ok_or(CliError::InvalidMasterPort)?;

    Ok((host.to_string(), port))
}

/// A registered replica: the write half of its connection plus the highest
/// replication offset it has acknowledged.
#[derive(Debug, Clone)]
pub struct ReplicaHandle {
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
    pub acked_offset: usize,
}

/// Configuration and replication state for one server instance.
#[derive(Debug, Clone)]
pub struct RedisServer {
    pub port: u16,
    pub role: RedisRole,
    /// 40-character hex replication ID generated at startup.
    pub repl_id: String,
    /// Bytes of write commands propagated to replicas (master role).
    pub repl_offset: usize,
    /// Bytes of master stream commands applied locally (replica role).
    pub processed_offset: usize,
    /// Registered replicas keyed by peer address; `None` on a replica.
    pub replicas: Option<HashMap<String, ReplicaHandle>>,
    /// Wakes WAIT-ing sessions when a replica acknowledges an offset.
    pub ack_notify: Arc<Notify>,
    pub dir: String,
    pub dbfilename: String,
}

impl RedisServer {
    /// Builds a server from command-line arguments.
    ///
    /// Supported flags: `--port <n>` (default 6379), `--replicaof "<host>
    /// <port>"`, `--dir <path>` and `--dbfilename <name>` for the snapshot
    /// location reported by CONFIG GET.
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let options = CliOptions::parse(command_line_args.into_iter().skip(1))?;

        let role = match options.replica_of {
            Some((host, port)) => RedisRole::Replica((host, port)),
            None => RedisRole::Master,
        };

        let replicas = match role {
            RedisRole::Master => Some(HashMap::new()),
            RedisRole::Replica(_) => None,
        };

        Ok(RedisServer {
            port: options.port.unwrap_or(6379),
            role,
            repl_id: generate_replication_id(),
            repl_offset: 0,
            processed_offset: 0,
            replicas,
            ack_notify: Arc::new(Notify::new()),
            dir: options.dir.unwrap_or_else(|| ".".to_string()),
            dbfilename: options.dbfilename.unwrap_or_else(|| "dump.rdb".to_string()),
        })
    }

    pub fn is_write_command(name: &str) -> bool {
        WRITE_COMMANDS.contains(&name)
    }

    /// The INFO replication section body.
    pub fn info_replication(&self) -> String {
        format!(
            "role:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
            self.role.as_string(),
            self.repl_id,
            self.repl_offset
        )
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.as_ref().map_or(0, |replicas| replicas.len())
    }

    pub fn register_replica(&mut self, client_address: String, writer: Arc<RwLock<OwnedWriteHalf>>) {
        if let Some(replicas) = self.replicas.as_mut() {
            info!(replica = %client_address, "registered replica");
            replicas.insert(
                client_address,
                ReplicaHandle {
                    writer,
                    acked_offset: 0,
                },
            );
        }
    }

    pub fn remove_replica(&mut self, client_address: &str) {
        if let Some(replicas) = self.replicas.as_mut() {
            if replicas.remove(client_address).is_some() {
                info!(replica = %client_address, "removed replica");
            }
        }
    }

    /// Records an acknowledged offset from a replica and wakes WAIT-ers.
    pub fn record_replica_ack(&mut self, client_address: &str, offset: usize) {
        if let Some(replicas) = self.replicas.as_mut() {
            if let Some(replica) = replicas.get_mut(client_address) {
                replica.acked_offset = offset;
            }
        }

        self.ack_notify.notify_waiters();
    }

    /// Number of replicas whose acknowledged offset has reached `target`.
    pub fn acked_replicas(&self, target: usize) -> usize {
        self.replicas.as_ref().map_or(0, |replicas| {
            replicas
                .values()
                .filter(|replica| replica.acked_offset >= target)
                .count()
        })
    }

    /// Forwards a successfully applied write command to every registered
    /// replica and advances the replication offset by the frame length.
    /// Replicas whose connection is gone are dropped from the registry.
    pub async fn propagate_write_command(&mut self, input: &RespValue) {
        let Some(replicas) = self.replicas.as_mut() else {
            return;
        };

        if replicas.is_empty() {
            return;
        }

        let encoded = input.encode();
        let mut dead: Vec<String> = Vec::new();

        for (address, replica) in replicas.iter() {
            let mut writer = replica.writer.write().await;

            if let Err(e) = writer.write_all(encoded.as_bytes()).await {
                warn!(replica = %address, error = %e, "dropping unreachable replica");
                dead.push(address.clone());
            } else {
                let _ = writer.flush().await;
            }
        }

        for address in dead {
            replicas.remove(&address);
        }

        self.repl_offset += encoded.len();
    }

    /// Runs the server with the built-in empty snapshot source.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.run_with_snapshot(&EmptySnapshot).await
    }

    /// Runs the server, seeding the keyspace from `snapshot`.
    ///
    /// A replica first connects to its master and completes the handshake;
    /// the master connection is then serviced on its own task while the
    /// listener serves ordinary clients.
    pub async fn run_with_snapshot(&self, snapshot: &dyn SnapshotSource) -> Result<(), ServerError> {
        let store = Arc::new(Mutex::new(snapshot.load()?));
        let state = Arc::new(Mutex::new(State::new()));
        let server = Arc::new(RwLock::new(self.clone()));

        if let RedisRole::Replica((address, master_port)) = &self.role {
            let master_address = format!("{}:{}", address, master_port);

            let mut stream = TcpStream::connect(&master_address)
                .await
                .map_err(ServerError::MasterConnect)?;

            let leftover = handshake(&mut stream, Arc::clone(&server)).await?;
            info!(master = %master_address, "replication handshake complete");

            let server_clone = Arc::clone(&server);
            let store_clone = Arc::clone(&store);
            let state_clone = Arc::clone(&state);

            tokio::spawn(async move {
                handle_master_connection(stream, leftover, server_clone, store_clone, state_clone)
                    .await;
            });
        }

        let listener = TcpListener::bind(format!("127.0.0.1:{}", self.port))
            .await
            .map_err(ServerError::Bind)?;
        info!(port = self.port, role = self.role.as_string(), "listening");

        loop {
            match listener.accept().await {
                Ok((stream, client_address)) => {
                    let server_clone = Arc::clone(&server);
                    let store_clone = Arc::clone(&store);
                    let state_clone = Arc::clone(&state);

                    tokio::spawn(async move {
                        handle_client_connection(
                            stream,
                            server_clone,
                            client_address.to_string(),
                            store_clone,
                            state_clone,
                        )
                        .await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

fn generate_replication_id() -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();

    (0..40)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}
