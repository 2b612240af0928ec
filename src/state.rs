//! Shared per-server state outside the keyspace: parked blocking clients,
//! pub/sub channel registrations and per-client transaction queues.
//!
//! Everything here is mutated under the state mutex. Waking a parked client
//! is message passing: the waker sends through the waiter's oneshot channel
//! and never calls back into connection code.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{oneshot, RwLock};

use crate::commands::CommandHandler;

/// A client parked by BLPOP. The waker pops the element under the lock and
/// hands `(key, value)` straight through the channel, so a woken client
/// never races other readers for the data.
#[derive(Debug)]
pub struct ListWaiter {
    pub id: u64,
    pub client_address: String,
    pub keys: Vec<String>,
    pub sender: oneshot::Sender<(String, String)>,
}

/// A client parked by XREAD BLOCK. Stream reads are non-destructive, so the
/// wake carries no payload; the woken client re-reads past its baseline.
#[derive(Debug)]
pub struct StreamWaiter {
    pub id: u64,
    pub client_address: String,
    pub keys: Vec<String>,
    pub sender: oneshot::Sender<()>,
}

#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    pub client_address: String,
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
}

/// A MULTI transaction in progress: the queued commands plus the flag set
/// when queueing rejected a command (which makes EXEC abort).
#[derive(Debug, Default)]
pub struct Transaction {
    pub queue: Vec<CommandHandler>,
    pub errored: bool,
}

#[derive(Debug, Default)]
pub struct State {
    /// BLPOP waiters in arrival order; the earliest waiter watching a key
    /// wins when an element arrives.
    pub list_waiters: Vec<ListWaiter>,
    /// XREAD BLOCK waiters in arrival order.
    pub stream_waiters: Vec<StreamWaiter>,
    /// Open MULTI queues keyed by client address.
    pub transactions: HashMap<String, Transaction>,
    /// Channel name to subscribers in subscription order.
    pub channels: HashMap<String, Vec<ChannelSubscriber>>,
    next_waiter_id: u64,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    pub fn next_waiter_id(&mut self) -> u64 {
        self.next_waiter_id += 1;
        self.next_waiter_id
    }

    pub fn park_list_waiter(&mut self, waiter: ListWaiter) {
        self.list_waiters.push(waiter);
    }

    pub fn park_stream_waiter(&mut self, waiter: StreamWaiter) {
        self.stream_waiters.push(waiter);
    }

    /// Removes and returns the earliest-parked list waiter watching `key`.
    pub fn pop_list_waiter(&mut self, key: &str) -> Option<ListWaiter> {
        let position = self
            .list_waiters
            .iter()
            .position(|waiter| waiter.keys.iter().any(|k| k == key))?;

        Some(self.list_waiters.remove(position))
    }

    /// Removes and returns every stream waiter watching `key`. Stream wakes
    /// are non-destructive, so all of them get to read.
    pub fn drain_stream_waiters(&mut self, key: &str) -> Vec<StreamWaiter> {
        let mut woken = Vec::new();
        let mut index = 0;

        while index < self.stream_waiters.len() {
            if self.stream_waiters[index].keys.iter().any(|k| k == key) {
                woken.push(self.stream_waiters.remove(index));
            } else {
                index += 1;
            }
        }

        woken
    }

    pub fn remove_list_waiter(&mut self, id: u64) {
        self.list_waiters.retain(|waiter| waiter.id != id);
    }

    pub fn remove_stream_waiter(&mut self, id: u64) {
        self.stream_waiters.retain(|waiter| waiter.id != id);
    }

    /// Opens a transaction for the client. Returns `false` when one is
    /// already open (nested MULTI).
    pub fn start_transaction(&mut self, client_address: String) -> bool {
        if self.transactions.contains_key(&client_address) {
            return false;
        }

        self.transactions
            .insert(client_address, Transaction::default());
        true
    }

    pub fn transaction_mut(&mut self, client_address: &str) -> Option<&mut Transaction> {
        self.transactions.get_mut(client_address)
    }

    pub fn in_transaction(&self, client_address: &str) -> bool {
        self.transactions.contains_key(client_address)
    }

    /// Closes and returns the client's transaction, if any.
    pub fn take_transaction(&mut self, client_address: &str) -> Option<Transaction> {
        self.transactions.remove(client_address)
    }

    /// Registers a subscriber on `channel` unless already subscribed there.
    pub fn subscribe(&mut self, channel: String, subscriber: ChannelSubscriber) {
        let subscribers = self.channels.entry(channel).or_default();

        if subscribers
            .iter()
            .all(|existing| existing.client_address != subscriber.client_address)
        {
            subscribers.push(subscriber);
        }
    }

    pub fn unsubscribe(&mut self, channel: &str, client_address: &str) {
        if let Some(subscribers) = self.channels.get_mut(channel) {
            subscribers.retain(|subscriber| subscriber.client_address != client_address);

            if subscribers.is_empty() {
                self.channels.remove(channel);
            }
        }
    }

    /// How many channels the client is currently subscribed to.
    pub fn subscription_count(&self, client_address: &str) -> i64 {
        self.channels
            .values()
            .filter(|subscribers| {
                subscribers
                    .iter()
                    .any(|subscriber| subscriber.client_address == client_address)
            })
            .count() as i64
    }

    pub fn is_subscribed(&self, client_address: &str) -> bool {
        self.subscription_count(client_address) > 0
    }

    /// Subscriber write handles for `channel`, in subscription order. The
    /// caller writes to them after releasing the state lock.
    pub fn subscribers(&self, channel: &str) -> Vec<ChannelSubscriber> {
        self.channels.get(channel).cloned().unwrap_or_default()
    }

    /// Clears everything a disconnecting client left behind: parked waits,
    /// an open transaction and channel subscriptions.
    pub fn remove_client(&mut self, client_address: &str) {
        self.list_waiters
            .retain(|waiter| waiter.client_address != client_address);
        self.stream_waiters
            .retain(|waiter| waiter.client_address != client_address);
        self.transactions.remove(client_address);

        self.channels.retain(|_, subscribers| {
            subscribers.retain(|subscriber| subscriber.client_address != client_address);
            !subscribers.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_waiter(id: u64, address: &str, keys: &[&str]) -> (ListWaiter, oneshot::Receiver<(String, String)>) {
        let (sender, receiver) = oneshot::channel();
        (
            ListWaiter {
                id,
                client_address: address.to_string(),
                keys: keys.iter().map(|k| k.to_string()).collect(),
                sender,
            },
            receiver,
        )
    }

    #[test]
    fn test_list_waiters_wake_in_fifo_order() {
        let mut state = State::new();
        let (first, _rx1) = list_waiter(1, "client-1", &["orders"]);
        let (second, _rx2) = list_waiter(2, "client-2", &["orders"]);
        state.park_list_waiter(first);
        state.park_list_waiter(second);

        let woken = state.pop_list_waiter("orders").unwrap();
        assert_eq!(woken.id, 1);

        let woken = state.pop_list_waiter("orders").unwrap();
        assert_eq!(woken.id, 2);

        assert!(state.pop_list_waiter("orders").is_none());
    }

    #[test]
    fn test_list_waiter_matches_any_watched_key() {
        let mut state = State::new();
        let (waiter, _rx) = list_waiter(1, "client-1", &["a", "b"]);
        state.park_list_waiter(waiter);

        assert!(state.pop_list_waiter("b").is_some());
        assert!(state.list_waiters.is_empty());
    }

    #[test]
    fn test_drain_stream_waiters_wakes_all_watchers() {
        let mut state = State::new();

        for (id, address) in [(1, "c1"), (2, "c2"), (3, "c3")] {
            let (sender, _receiver) = oneshot::channel();
            state.park_stream_waiter(StreamWaiter {
                id,
                client_address: address.to_string(),
                keys: vec![if id == 3 { "other" } else { "events" }.to_string()],
                sender,
            });
        }

        let woken = state.drain_stream_waiters("events");
        assert_eq!(woken.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.stream_waiters.len(), 1);
        assert_eq!(state.stream_waiters[0].id, 3);
    }

    #[test]
    fn test_transactions_do_not_nest() {
        let mut state = State::new();

        assert!(state.start_transaction("client-1".to_string()));
        assert!(!state.start_transaction("client-1".to_string()));
        assert!(state.in_transaction("client-1"));

        let transaction = state.take_transaction("client-1").unwrap();
        assert!(transaction.queue.is_empty());
        assert!(!transaction.errored);
        assert!(!state.in_transaction("client-1"));
    }

    #[test]
    fn test_remove_client_clears_all_registrations() {
        let mut state = State::new();
        let (waiter, _rx) = list_waiter(1, "client-1", &["k"]);
        state.park_list_waiter(waiter);
        state.start_transaction("client-1".to_string());

        state.remove_client("client-1");

        assert!(state.list_waiters.is_empty());
        assert!(!state.in_transaction("client-1"));
    }
}
