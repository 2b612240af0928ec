use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::server::RedisServer;

#[derive(Debug, PartialEq)]
pub struct WaitArguments {
    required_replicas: usize,
    timeout: Option<Duration>,
}

impl WaitArguments {
    /// `WAIT numreplicas timeout-ms`; a zero timeout waits forever.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments("wait".to_string()));
        }

        let required_replicas = arguments[0]
            .parse::<usize>()
            .map_err(|_| CommandError::NotAnInteger)?;
        let timeout_ms = arguments[1]
            .parse::<u64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self {
            required_replicas,
            timeout: match timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        })
    }
}

/// WAIT blocks until enough replicas have acknowledged the replication
/// offset recorded at dispatch time, or until the deadline.
///
/// If nothing has been propagated yet the reply is simply the connected
/// replica count, with no GETACK round-trip.
pub async fn wait(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    let args = WaitArguments::parse(arguments)?;

    let (target, ack_notify) = {
        let server_guard = server.read().await;

        let target = server_guard.repl_offset;

        if target == 0 || args.required_replicas == 0 || server_guard.replica_count() == 0 {
            return Ok(RespValue::Integer(server_guard.replica_count() as i64).encode());
        }

        (target, Arc::clone(&server_guard.ack_notify))
    };

    send_getack_to_replicas(server).await;

    let deadline = args.timeout.map(|timeout| Instant::now() + timeout);

    loop {
        // register for the next ack notification before re-checking the
        // count, so an ack landing in between is not missed
        let notified = ack_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        {
            let server_guard = server.read().await;
            let acked = server_guard.acked_replicas(target);

            if acked >= args.required_replicas {
                return Ok(RespValue::Integer(acked as i64).encode());
            }
        }

        match deadline {
            None => notified.await,
            Some(deadline) => {
                let now = Instant::now();

                if now >= deadline {
                    let server_guard = server.read().await;
                    return Ok(
                        RespValue::Integer(server_guard.acked_replicas(target) as i64).encode()
                    );
                }

                if tokio::time::timeout(deadline - now, notified).await.is_err() {
                    let server_guard = server.read().await;
                    return Ok(
                        RespValue::Integer(server_guard.acked_replicas(target) as i64).encode()
                    );
                }
            }
        }
    }
}

/// The WAIT form used inside EXEC: no suspension, just the count of
/// replicas already at the current offset (or the replica count when
/// nothing has been propagated).
pub async fn wait_immediate(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<String, CommandError> {
    let _ = WaitArguments::parse(arguments)?;

    let server_guard = server.read().await;

    let count = if server_guard.repl_offset == 0 {
        server_guard.replica_count()
    } else {
        server_guard.acked_replicas(server_guard.repl_offset)
    };

    Ok(RespValue::Integer(count as i64).encode())
}

async fn send_getack_to_replicas(server: &Arc<RwLock<RedisServer>>) {
    let getack = RespValue::Array(vec![
        RespValue::BulkString("REPLCONF".to_string()),
        RespValue::BulkString("GETACK".to_string()),
        RespValue::BulkString("*".to_string()),
    ])
    .encode();

    let writers = {
        let server_guard = server.read().await;

        match &server_guard.replicas {
            Some(replicas) => replicas
                .values()
                .map(|replica| Arc::clone(&replica.writer))
                .collect::<Vec<_>>(),
            None => Vec::new(),
        }
    };

    for writer in writers {
        let mut writer_guard = writer.write().await;
        if writer_guard.write_all(getack.as_bytes()).await.is_ok() {
            let _ = writer_guard.flush().await;
        }
    }
}
