//! A Redis-compatible server.
//!
//! Clients speak RESP over long-lived TCP connections against an in-memory
//! keyspace holding strings, lists, streams and sorted sets (with a
//! geospatial layer on top of the latter), with key expiration, blocking
//! reads, transactions, pub/sub and single-leader replication.
//!
//! Subsystems:
//!
//! - [`resp`]: streaming RESP parser and encoder
//! - [`key_value_store`]: the typed keyspace with lazy TTL expiration
//! - [`state`]: parked blocking clients, pub/sub channels, transactions
//! - [`commands`]: per-command parsing and handlers plus the dispatcher
//! - [`server`]: configuration, roles and the replica registry
//! - [`connection`] / [`input`]: socket loops and the replication handshake
//! - [`rdb`]: the snapshot-source seam and the empty RDB image

pub mod commands;
pub mod connection;
pub mod input;
pub mod key_value_store;
pub mod rdb;
pub mod resp;
pub mod server;
pub mod state;
