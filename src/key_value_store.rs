//! The typed keyspace.
//!
//! Every key maps to a [`Value`]: a tagged [`DataType`] plus an optional
//! absolute expiry timestamp in wall-clock milliseconds. Expiration is lazy:
//! accessors go through [`get_live`], which evicts a row whose deadline has
//! passed before anything can observe it. An emptied list, stream or sorted
//! set must be removed so it is indistinguishable from an absent key.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::time::SystemTime;

pub type KeyValueStore = HashMap<String, Value>;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: DataType,
    /// Absolute expiry deadline in epoch milliseconds; `None` means the key
    /// never expires.
    pub expires_at: Option<u128>,
}

impl Value {
    pub fn new(data: DataType) -> Self {
        Value {
            data,
            expires_at: None,
        }
    }

    pub fn with_expiry(data: DataType, expires_at: u128) -> Self {
        Value {
            data,
            expires_at: Some(expires_at),
        }
    }

    pub fn is_expired(&self, now: u128) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

/// The value shapes a key can hold. A key has exactly one shape; a command
/// expecting another shape fails with WRONGTYPE and mutates nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(String),
    List(VecDeque<String>),
    Stream(BTreeMap<StreamId, Vec<(String, String)>>),
    SortedSet(SortedSet),
}

impl DataType {
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::String(_) => "string",
            DataType::List(_) => "list",
            DataType::Stream(_) => "stream",
            DataType::SortedSet(_) => "zset",
        }
    }
}

/// A stream entry ID, ordered lexicographically on `(ms, seq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// A set of members each carrying a float score, ordered by
/// `(score ascending, member lexicographic)`. One score per member.
///
/// Ordered views are computed on demand; the sets this server handles are
/// small enough that a sort per query beats maintaining a parallel index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet::default()
    }

    /// Inserts or updates a member. Returns `true` only when the member is
    /// newly added; score updates return `false`.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        self.scores.insert(member, score).is_none()
    }

    pub fn remove(&mut self, member: &str) -> bool {
        self.scores.remove(member).is_some()
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members and scores in set order.
    pub fn ordered(&self) -> Vec<(String, f64)> {
        let mut members: Vec<(String, f64)> = self
            .scores
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();

        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members
    }

    /// 0-based rank of `member` under the set order, low end first.
    pub fn rank(&self, member: &str) -> Option<usize> {
        if !self.scores.contains_key(member) {
            return None;
        }

        self.ordered()
            .iter()
            .position(|(candidate, _)| candidate == member)
    }

    /// Members between the inclusive rank indices `start` and `stop`, with
    /// negative indices counted from the high end.
    pub fn range(&self, start: i64, stop: i64) -> Vec<String> {
        let ordered = self.ordered();

        match normalize_range(start, stop, ordered.len()) {
            Some((low, high)) => ordered[low..=high]
                .iter()
                .map(|(member, _)| member.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Normalizes an inclusive `[start, stop]` index pair over a sequence of
/// `len` elements: negative indices count from the tail, both ends clamp to
/// the valid range, and a crossed or out-of-range pair yields `None`.
pub fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }

    let len = len as i64;
    let low = (if start < 0 { len + start } else { start }).max(0);
    let high = (if stop < 0 { len + stop } else { stop }).min(len - 1);

    if low > high {
        return None;
    }

    Some((low as usize, high as usize))
}

/// Looks a key up, first evicting it when its expiry deadline has passed.
pub fn get_live<'a>(store: &'a mut KeyValueStore, key: &str) -> Option<&'a mut Value> {
    let now = now_ms();

    if let Some(value) = store.get(key) {
        if value.is_expired(now) {
            store.remove(key);
            return None;
        }
    }

    store.get_mut(key)
}

/// Drops the row when its collection has been emptied, keeping "empty" and
/// "absent" indistinguishable.
pub fn remove_if_empty(store: &mut KeyValueStore, key: &str) {
    let is_empty = match store.get(key) {
        Some(value) => match &value.data {
            DataType::List(list) => list.is_empty(),
            DataType::Stream(stream) => stream.is_empty(),
            DataType::SortedSet(set) => set.is_empty(),
            DataType::String(_) => false,
        },
        None => false,
    };

    if is_empty {
        store.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range() {
        let test_cases = vec![
            (0, -1, 5, Some((0, 4))),
            (0, 4, 5, Some((0, 4))),
            (1, 3, 5, Some((1, 3))),
            (-2, -1, 5, Some((3, 4))),
            (-100, 100, 5, Some((0, 4))),
            (3, 1, 5, None),
            (5, 10, 5, None),
            (0, -1, 0, None),
            (-1, -2, 5, None),
        ];

        for (start, stop, len, expected) in test_cases {
            assert_eq!(
                normalize_range(start, stop, len),
                expected,
                "normalizing ({}, {}) over len {}",
                start,
                stop,
                len
            );
        }
    }

    #[test]
    fn test_stream_id_ordering() {
        let test_cases = vec![
            (StreamId::new(1, 0), StreamId::new(2, 0)),
            (StreamId::new(1, 1), StreamId::new(1, 2)),
            (StreamId::new(9, 5), StreamId::new(10, 0)),
            (StreamId::MIN, StreamId::new(0, 1)),
            (StreamId::new(u64::MAX, 0), StreamId::MAX),
        ];

        for (smaller, larger) in test_cases {
            assert!(smaller < larger, "{} should sort before {}", smaller, larger);
        }
    }

    #[test]
    fn test_stream_id_display() {
        assert_eq!(StreamId::new(1526919030474, 0).to_string(), "1526919030474-0");
        assert_eq!(StreamId::new(0, 1).to_string(), "0-1");
    }

    #[test]
    fn test_sorted_set_insert_and_update() {
        let mut set = SortedSet::new();

        assert_eq!(set.insert("a".to_string(), 1.0), true);
        assert_eq!(set.insert("b".to_string(), 2.0), true);
        assert_eq!(set.insert("a".to_string(), 3.0), false);
        assert_eq!(set.len(), 2);
        assert_eq!(set.score("a"), Some(3.0));
    }

    #[test]
    fn test_sorted_set_ordering_breaks_ties_by_member() {
        let mut set = SortedSet::new();
        set.insert("b".to_string(), 1.0);
        set.insert("a".to_string(), 1.0);
        set.insert("c".to_string(), 2.0);

        let ordered: Vec<String> = set.ordered().into_iter().map(|(m, _)| m).collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);

        assert_eq!(set.rank("a"), Some(0));
        assert_eq!(set.rank("b"), Some(1));
        assert_eq!(set.rank("c"), Some(2));
        assert_eq!(set.rank("missing"), None);
    }

    #[test]
    fn test_sorted_set_range_with_negative_indices() {
        let mut set = SortedSet::new();
        set.insert("a".to_string(), 1.0);
        set.insert("b".to_string(), 2.0);
        set.insert("c".to_string(), 3.0);

        assert_eq!(set.range(0, -1), vec!["a", "b", "c"]);
        assert_eq!(set.range(-2, -1), vec!["b", "c"]);
        assert_eq!(set.range(1, 1), vec!["b"]);
        assert_eq!(set.range(2, 0), Vec::<String>::new());
    }

    #[test]
    fn test_sorted_set_handles_infinite_scores() {
        let mut set = SortedSet::new();
        set.insert("mid".to_string(), 0.0);
        set.insert("low".to_string(), f64::NEG_INFINITY);
        set.insert("high".to_string(), f64::INFINITY);

        let ordered: Vec<String> = set.ordered().into_iter().map(|(m, _)| m).collect();
        assert_eq!(ordered, vec!["low", "mid", "high"]);
    }

    #[test]
    fn test_get_live_evicts_expired_rows() {
        let mut store = KeyValueStore::new();
        store.insert(
            "stale".to_string(),
            Value::with_expiry(DataType::String("v".to_string()), 1),
        );
        store.insert(
            "fresh".to_string(),
            Value::new(DataType::String("v".to_string())),
        );

        assert!(get_live(&mut store, "stale").is_none());
        assert!(!store.contains_key("stale"));
        assert!(get_live(&mut store, "fresh").is_some());
    }

    #[test]
    fn test_remove_if_empty() {
        let mut store = KeyValueStore::new();
        store.insert(
            "empty".to_string(),
            Value::new(DataType::List(VecDeque::new())),
        );
        store.insert(
            "full".to_string(),
            Value::new(DataType::List(VecDeque::from(["x".to_string()]))),
        );

        remove_if_empty(&mut store, "empty");
        remove_if_empty(&mut store, "full");

        assert!(!store.contains_key("empty"));
        assert!(store.contains_key("full"));
    }
}
