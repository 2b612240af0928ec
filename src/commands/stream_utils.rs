//! Stream entry ID parsing, generation and reply encoding shared by XADD,
//! XRANGE and XREAD.

use crate::commands::command_error::CommandError;
use crate::key_value_store::StreamId;
use crate::resp::RespValue;

const ID_TOO_SMALL: &str =
    "The ID specified in XADD is equal or smaller than the target stream top item";
const ID_ZERO: &str = "The ID specified in XADD must be greater than 0-0";
const ID_INVALID: &str = "Invalid stream ID specified as stream command argument";

/// How XADD was asked to pick an entry ID.
#[derive(Debug, PartialEq)]
pub enum EntryIdSpec {
    /// `*`: both parts auto-generated from the clock and the stream tail.
    Auto,
    /// `ms-*`: explicit milliseconds, auto sequence.
    AutoSeq(u64),
    /// `ms-seq` (or bare `ms`, which implies sequence 0).
    Explicit(StreamId),
}

pub fn parse_xadd_id(raw: &str) -> Result<EntryIdSpec, CommandError> {
    if raw == "*" {
        return Ok(EntryIdSpec::Auto);
    }

    match raw.split_once('-') {
        None => {
            let ms = parse_id_part(raw)?;
            Ok(EntryIdSpec::Explicit(StreamId::new(ms, 0)))
        }
        Some((ms_part, "*")) => Ok(EntryIdSpec::AutoSeq(parse_id_part(ms_part)?)),
        Some((ms_part, seq_part)) => Ok(EntryIdSpec::Explicit(StreamId::new(
            parse_id_part(ms_part)?,
            parse_id_part(seq_part)?,
        ))),
    }
}

/// Resolves an XADD ID against the stream's current last ID and the clock.
/// The result is always strictly greater than `last`, and `0-0` is never
/// produced or accepted.
pub fn resolve_entry_id(
    spec: EntryIdSpec,
    last: Option<StreamId>,
    clock_ms: u64,
) -> Result<StreamId, CommandError> {
    match spec {
        EntryIdSpec::Auto => {
            let ms = clock_ms.max(last.map_or(0, |id| id.ms));
            Ok(StreamId::new(ms, next_sequence(ms, last)?))
        }
        EntryIdSpec::AutoSeq(ms) => Ok(StreamId::new(ms, next_sequence(ms, last)?)),
        EntryIdSpec::Explicit(id) => {
            if id == StreamId::MIN {
                return Err(CommandError::InvalidStreamId(ID_ZERO.to_string()));
            }

            if let Some(last) = last {
                if id <= last {
                    return Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()));
                }
            }

            Ok(id)
        }
    }
}

fn next_sequence(ms: u64, last: Option<StreamId>) -> Result<u64, CommandError> {
    match last {
        None => Ok(if ms == 0 { 1 } else { 0 }),
        Some(last) => {
            if ms == last.ms {
                last.seq
                    .checked_add(1)
                    .ok_or_else(|| CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()))
            } else if ms > last.ms {
                Ok(0)
            } else {
                Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()))
            }
        }
    }
}

/// Parses an XRANGE bound: `-` and `+` are the extremes; a bare `ms`
/// defaults the sequence to 0 on the low bound and to the maximum on the
/// high bound.
pub fn parse_range_bound(raw: &str, is_low: bool) -> Result<StreamId, CommandError> {
    match raw {
        "-" => return Ok(StreamId::MIN),
        "+" => return Ok(StreamId::MAX),
        _ => {}
    }

    match raw.split_once('-') {
        None => {
            let ms = parse_id_part(raw)?;
            let seq = if is_low { 0 } else { u64::MAX };
            Ok(StreamId::new(ms, seq))
        }
        Some((ms_part, seq_part)) => Ok(StreamId::new(
            parse_id_part(ms_part)?,
            parse_id_part(seq_part)?,
        )),
    }
}

/// Parses an XREAD from-ID (exclusive); a bare `ms` implies sequence 0.
/// `$` is resolved by the caller before this sees the argument.
pub fn parse_xread_id(raw: &str) -> Result<StreamId, CommandError> {
    match raw.split_once('-') {
        None => Ok(StreamId::new(parse_id_part(raw)?, 0)),
        Some((ms_part, seq_part)) => Ok(StreamId::new(
            parse_id_part(ms_part)?,
            parse_id_part(seq_part)?,
        )),
    }
}

fn parse_id_part(raw: &str) -> Result<u64, CommandError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommandError::InvalidStreamId(ID_INVALID.to_string()));
    }

    raw.parse::<u64>()
        .map_err(|_| CommandError::InvalidStreamId(ID_INVALID.to_string()))
}

/// Encodes entries as the nested `[id, [field, value, ...]]` arrays shared
/// by XRANGE and the per-stream half of XREAD.
pub fn encode_stream_entries(entries: &[(StreamId, Vec<(String, String)>)]) -> RespValue {
    RespValue::Array(
        entries
            .iter()
            .map(|(id, fields)| {
                let mut flattened = Vec::with_capacity(fields.len() * 2);

                for (field, value) in fields {
                    flattened.push(RespValue::BulkString(field.clone()));
                    flattened.push(RespValue::BulkString(value.clone()));
                }

                RespValue::Array(vec![
                    RespValue::BulkString(id.to_string()),
                    RespValue::Array(flattened),
                ])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xadd_id() {
        let test_cases = vec![
            ("*", Ok(EntryIdSpec::Auto)),
            ("5-*", Ok(EntryIdSpec::AutoSeq(5))),
            ("5-3", Ok(EntryIdSpec::Explicit(StreamId::new(5, 3)))),
            ("5", Ok(EntryIdSpec::Explicit(StreamId::new(5, 0)))),
            ("0-0", Ok(EntryIdSpec::Explicit(StreamId::MIN))),
            (
                "abc",
                Err(CommandError::InvalidStreamId(ID_INVALID.to_string())),
            ),
            (
                "5-x",
                Err(CommandError::InvalidStreamId(ID_INVALID.to_string())),
            ),
            (
                "-5",
                Err(CommandError::InvalidStreamId(ID_INVALID.to_string())),
            ),
            (
                "5-",
                Err(CommandError::InvalidStreamId(ID_INVALID.to_string())),
            ),
        ];

        for (input, expected) in test_cases {
            assert_eq!(parse_xadd_id(input), expected, "parsing {:?}", input);
        }
    }

    #[test]
    fn test_resolve_explicit_ids() {
        let last = Some(StreamId::new(5, 5));

        let test_cases = vec![
            (StreamId::new(5, 6), last, Ok(StreamId::new(5, 6))),
            (StreamId::new(6, 0), last, Ok(StreamId::new(6, 0))),
            (
                StreamId::new(5, 5),
                last,
                Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string())),
            ),
            (
                StreamId::new(4, 9),
                last,
                Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string())),
            ),
            (
                StreamId::MIN,
                None,
                Err(CommandError::InvalidStreamId(ID_ZERO.to_string())),
            ),
            (StreamId::new(0, 1), None, Ok(StreamId::new(0, 1))),
        ];

        for (id, last, expected) in test_cases {
            assert_eq!(
                resolve_entry_id(EntryIdSpec::Explicit(id), last, 100),
                expected,
                "resolving {:?} against {:?}",
                id,
                last
            );
        }
    }

    #[test]
    fn test_resolve_auto_sequence() {
        let test_cases = vec![
            // same millisecond: bump the sequence
            (5, Some(StreamId::new(5, 5)), Ok(StreamId::new(5, 6))),
            // later millisecond: restart at 0
            (6, Some(StreamId::new(5, 5)), Ok(StreamId::new(6, 0))),
            // empty stream at time 0: sequence starts at 1 (0-0 is illegal)
            (0, None, Ok(StreamId::new(0, 1))),
            (7, None, Ok(StreamId::new(7, 0))),
            (
                4,
                Some(StreamId::new(5, 5)),
                Err(CommandError::InvalidStreamId(ID_TOO_SMALL.to_string())),
            ),
        ];

        for (ms, last, expected) in test_cases {
            assert_eq!(
                resolve_entry_id(EntryIdSpec::AutoSeq(ms), last, 100),
                expected,
                "auto-seq with ms {} against {:?}",
                ms,
                last
            );
        }
    }

    #[test]
    fn test_resolve_fully_auto_uses_clock_and_tail() {
        // clock ahead of the stream tail: clock wins, sequence 0
        assert_eq!(
            resolve_entry_id(EntryIdSpec::Auto, Some(StreamId::new(500, 3)), 1000),
            Ok(StreamId::new(1000, 0))
        );

        // clock behind the tail: tail wins, sequence bumps
        assert_eq!(
            resolve_entry_id(EntryIdSpec::Auto, Some(StreamId::new(2000, 3)), 1000),
            Ok(StreamId::new(2000, 4))
        );

        // empty stream
        assert_eq!(
            resolve_entry_id(EntryIdSpec::Auto, None, 1000),
            Ok(StreamId::new(1000, 0))
        );
    }

    #[test]
    fn test_parse_range_bound() {
        let test_cases = vec![
            ("-", true, Ok(StreamId::MIN)),
            ("+", false, Ok(StreamId::MAX)),
            ("5", true, Ok(StreamId::new(5, 0))),
            ("5", false, Ok(StreamId::new(5, u64::MAX))),
            ("5-2", true, Ok(StreamId::new(5, 2))),
            (
                "oops",
                true,
                Err(CommandError::InvalidStreamId(ID_INVALID.to_string())),
            ),
        ];

        for (input, is_low, expected) in test_cases {
            assert_eq!(
                parse_range_bound(input, is_low),
                expected,
                "bound {:?} (low: {})",
                input,
                is_low
            );
        }
    }

    #[test]
    fn test_encode_stream_entries() {
        let entries = vec![(
            StreamId::new(1000, 0),
            vec![("temperature".to_string(), "25".to_string())],
        )];

        let encoded = encode_stream_entries(&entries).encode();

        assert_eq!(
            encoded,
            "*1\r\n*2\r\n$6\r\n1000-0\r\n*2\r\n$11\r\ntemperature\r\n$2\r\n25\r\n"
        );
    }
}
