// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The host automation platform boundary.
//!
//! TWIG does not own state persistence; the hosting platform does. This
//! module defines the contract TWIG requires from it: acknowledged state
//! reads/writes, subscription by id or pattern, a change notification
//! stream, and the inbound message box (`search` / `read` / `write`
//! commands with optional reply channels).
//!
//! [`MemoryStateStore`] is the in-process implementation used by tests and
//! standalone runs; a real platform binding implements [`StateStore`]
//! against its own transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::TwigError;
use crate::types::{BusAddress, StateRecord, StateValue};

// =============================================================================
// StateStore
// =============================================================================

/// A state-change notification: the fully qualified id and the new record,
/// or `None` when the state was deleted.
pub type StateChange = (String, Option<StateRecord>);

/// Contract for the platform's persisted state tree.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns all states matching a pattern (`"*"` suffix wildcard).
    async fn get_states(&self, pattern: &str) -> Result<HashMap<String, StateRecord>, TwigError>;

    /// Writes a state value with the given acknowledgement flag.
    ///
    /// The returned future resolves only once the write is durable from the
    /// platform's perspective.
    async fn set_state(&self, id: &str, value: StateValue, ack: bool) -> Result<(), TwigError>;

    /// Subscribes to change notifications for ids matching a pattern
    /// within this service's namespace.
    async fn subscribe_states(&self, pattern: &str) -> Result<(), TwigError>;

    /// Subscribes to change notifications for a single id outside this
    /// service's namespace.
    async fn subscribe_foreign_states(&self, id: &str) -> Result<(), TwigError>;

    /// Returns a receiver for change notifications on subscribed ids.
    fn changes(&self) -> broadcast::Receiver<StateChange>;
}

// =============================================================================
// MemoryStateStore
// =============================================================================

/// In-memory [`StateStore`] for tests and standalone operation.
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, StateRecord>>,
    subscriptions: RwLock<Vec<String>>,
    changes: broadcast::Sender<StateChange>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(256);
        Arc::new(Self {
            states: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(Vec::new()),
            changes,
        })
    }

    /// Seeds the store with existing records, bypassing notification.
    pub fn seed(&self, records: impl IntoIterator<Item = (String, StateRecord)>) {
        self.states.write().extend(records);
    }

    /// Injects a deletion notification for a subscribed id.
    pub fn delete_state(&self, id: &str) {
        self.states.write().remove(id);
        if self.is_subscribed(id) {
            let _ = self.changes.send((id.to_string(), None));
        }
    }

    fn is_subscribed(&self, id: &str) -> bool {
        self.subscriptions.read().iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => id.starts_with(prefix),
                None => pattern == id,
            }
        })
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_states(&self, pattern: &str) -> Result<HashMap<String, StateRecord>, TwigError> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        Ok(self
            .states
            .read()
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    async fn set_state(&self, id: &str, value: StateValue, ack: bool) -> Result<(), TwigError> {
        let record = StateRecord { val: value, ack };
        self.states.write().insert(id.to_string(), record.clone());
        if self.is_subscribed(id) {
            let _ = self.changes.send((id.to_string(), Some(record)));
        }
        Ok(())
    }

    async fn subscribe_states(&self, pattern: &str) -> Result<(), TwigError> {
        self.subscriptions.write().push(pattern.to_string());
        Ok(())
    }

    async fn subscribe_foreign_states(&self, id: &str) -> Result<(), TwigError> {
        self.subscriptions.write().push(id.to_string());
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Message Box
// =============================================================================

/// An inbound command from the platform's message box.
///
/// Replies travel back through the optional oneshot channel; commands
/// without a reply channel are fire-and-forget.
#[derive(Debug)]
pub enum Command {
    /// Scan a bus (the active one, or a freshly opened one by number).
    Search {
        /// Bus number to search.
        bus: u32,
        /// Reply channel carrying the discovered addresses as JSON.
        reply: Option<oneshot::Sender<Vec<BusAddress>>>,
    },
    /// Read bytes from a device, optionally register-addressed.
    Read {
        /// Target address.
        address: BusAddress,
        /// Command register; plain read when absent.
        register: Option<u8>,
        /// Number of bytes; defaults to 1.
        bytes: Option<usize>,
        /// Reply channel carrying the bytes read.
        reply: Option<oneshot::Sender<Vec<u8>>>,
    },
    /// Write bytes to a device, optionally register-addressed.
    Write {
        /// Target address.
        address: BusAddress,
        /// Command register; plain write when absent.
        register: Option<u8>,
        /// Bytes to write.
        data: Vec<u8>,
        /// Reply channel echoing the written bytes.
        reply: Option<oneshot::Sender<Vec<u8>>>,
    },
}

/// Sending half of the message box.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

impl CommandSender {
    /// Sends a command to the runtime.
    pub async fn send(&self, command: Command) -> Result<(), TwigError> {
        self.tx.send(command).await.map_err(|_| {
            TwigError::Listener(crate::error::ListenerError::SubscribeFailed {
                id: "message-box".to_string(),
                message: "command receiver dropped".to_string(),
            })
        })
    }
}

/// Creates the message-box channel pair.
pub fn command_channel(capacity: usize) -> (CommandSender, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandSender { tx }, rx)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_pattern_query() {
        let store = MemoryStateStore::new();
        store.seed([
            ("twig.0.foo".to_string(), StateRecord::acked(1)),
            ("twig.0.bar".to_string(), StateRecord::pending(2)),
            ("other.0.baz".to_string(), StateRecord::acked(3)),
        ]);

        let all = store.get_states("twig.0.*").await.unwrap();
        assert_eq!(all.len(), 2);

        let everything = store.get_states("*").await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_notifies_subscribed_only() {
        let store = MemoryStateStore::new();
        store.subscribe_states("twig.0.*").await.unwrap();
        let mut rx = store.changes();

        store
            .set_state("other.0.x", json!(true), false)
            .await
            .unwrap();
        store
            .set_state("twig.0.led", json!(1), false)
            .await
            .unwrap();

        let (id, record) = rx.recv().await.unwrap();
        assert_eq!(id, "twig.0.led");
        assert_eq!(record.unwrap().val, json!(1));
    }

    #[tokio::test]
    async fn test_memory_store_deletion_notification() {
        let store = MemoryStateStore::new();
        store.subscribe_foreign_states("sys.time").await.unwrap();
        store.seed([("sys.time".to_string(), StateRecord::acked(42))]);
        let mut rx = store.changes();

        store.delete_state("sys.time");

        let (id, record) = rx.recv().await.unwrap();
        assert_eq!(id, "sys.time");
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_command_channel_round_trip() {
        let (sender, mut rx) = command_channel(8);
        let (reply_tx, reply_rx) = oneshot::channel();

        sender
            .send(Command::Search {
                bus: 1,
                reply: Some(reply_tx),
            })
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            Command::Search { bus, reply } => {
                assert_eq!(bus, 1);
                reply
                    .unwrap()
                    .send(vec![BusAddress::new(0x11).unwrap()])
                    .unwrap();
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let found = reply_rx.await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
