//! Snapshot loading seam.
//!
//! Decoding an on-disk RDB file is the job of an external collaborator; the
//! server only depends on the [`SnapshotSource`] trait to seed its keyspace
//! at startup. The compiled-in empty RDB image below is what PSYNC transmits
//! to a replica of a fresh master.

use thiserror::Error;

use crate::key_value_store::KeyValueStore;

/// A syntactically valid, empty RDB file (header, metadata, end-of-file
/// opcode and checksum). Sent verbatim during a full resynchronization.
pub const EMPTY_RDB: [u8; 88] = [
    0x52, 0x45, 0x44, 0x49, 0x53, 0x30, 0x30, 0x31, 0x31, 0xfa, 0x09, 0x72,
    0x65, 0x64, 0x69, 0x73, 0x2d, 0x76, 0x65, 0x72, 0x05, 0x37, 0x2e, 0x32,
    0x2e, 0x30, 0xfa, 0x0a, 0x72, 0x65, 0x64, 0x69, 0x73, 0x2d, 0x62, 0x69,
    0x74, 0x73, 0xc0, 0x40, 0xfa, 0x05, 0x63, 0x74, 0x69, 0x6d, 0x65, 0xc2,
    0x6d, 0x08, 0xbc, 0x65, 0xfa, 0x08, 0x75, 0x73, 0x65, 0x64, 0x2d, 0x6d,
    0x65, 0x6d, 0xc2, 0xb0, 0xc4, 0x10, 0x00, 0xfa, 0x08, 0x61, 0x6f, 0x66,
    0x2d, 0x62, 0x61, 0x73, 0x65, 0xc0, 0x00, 0xff, 0xf0, 0x6e, 0x3b, 0xfe,
    0xc0, 0xff, 0x5a, 0xa2,
];

/// The bulk-prefixed full-resync payload: `$<len>\r\n` followed by the RDB
/// bytes with no trailing CRLF.
pub fn full_resync_payload() -> Vec<u8> {
    let mut payload = format!("${}\r\n", EMPTY_RDB.len()).into_bytes();
    payload.extend_from_slice(&EMPTY_RDB);
    payload
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Where the server's initial keyspace comes from.
pub trait SnapshotSource: Send + Sync {
    fn load(&self) -> Result<KeyValueStore, SnapshotError>;
}

/// The built-in source: an absent or unreadable snapshot file simply yields
/// an empty keyspace, which is also the fresh-master behavior.
#[derive(Debug, Clone)]
pub struct EmptySnapshot;

impl SnapshotSource for EmptySnapshot {
    fn load(&self) -> Result<KeyValueStore, SnapshotError> {
        Ok(KeyValueStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rdb_has_valid_header() {
        assert_eq!(&EMPTY_RDB[0..9], b"REDIS0011");
    }

    #[test]
    fn test_full_resync_payload_has_no_trailing_crlf() {
        let payload = full_resync_payload();

        assert!(payload.starts_with(b"$88\r\n"));
        assert_eq!(payload.len(), 5 + EMPTY_RDB.len());
        assert_ne!(&payload[payload.len() - 2..], b"\r\n");
    }

    #[test]
    fn test_empty_snapshot_yields_empty_keyspace() {
        let store = EmptySnapshot.load().unwrap();
        assert!(store.is_empty());
    }
}
