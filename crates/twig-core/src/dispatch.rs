// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event dispatch for platform state changes.
//!
//! The dispatcher keeps two listener registries: one for states owned by
//! this service (keyed by fully qualified id, `namespace.id`) and one for
//! foreign states elsewhere in the platform's tree. It also caches the last
//! *acknowledged* value per own state, so local listeners receive the
//! settled previous value rather than whatever pending write happened to
//! come before.
//!
//! # Dispatch rules
//!
//! For a notification `(id, record)`:
//!
//! 1. `record == None` — the state was deleted; log and stop.
//! 2. `id` has foreign listeners — invoke them all concurrently with the
//!    new value, regardless of the ack flag, and stop.
//! 3. `record.ack == true` — our own acknowledged write echoing back; drop.
//! 4. No local listener — log an error naming the id; drop.
//! 5. Otherwise invoke all local listeners concurrently with
//!    `(last_acked_value, new_value)`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::error::{ListenerError, TwigError};
use crate::platform::StateStore;
use crate::types::{StateRecord, StateValue};

// =============================================================================
// Listener Types
// =============================================================================

/// A listener on a state owned by this service.
///
/// Receives the last acknowledged value (if any) and the new pending value.
pub type StateChangeListener =
    Arc<dyn Fn(Option<StateValue>, StateValue) -> BoxFuture<'static, ()> + Send + Sync>;

/// A listener on a state outside this service's namespace.
pub type ForeignStateChangeListener =
    Arc<dyn Fn(StateValue) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as a [`StateChangeListener`].
pub fn state_listener<F, Fut>(f: F) -> StateChangeListener
where
    F: Fn(Option<StateValue>, StateValue) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move |old, new| Box::pin(f(old, new)))
}

/// Wraps an async closure as a [`ForeignStateChangeListener`].
pub fn foreign_listener<F, Fut>(f: F) -> ForeignStateChangeListener
where
    F: Fn(StateValue) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move |new| Box::pin(f(new)))
}

// =============================================================================
// EventDispatcher
// =============================================================================

/// Routes platform state-change notifications to registered listeners.
pub struct EventDispatcher {
    namespace: String,
    store: Arc<dyn StateStore>,
    local: RwLock<HashMap<String, Vec<StateChangeListener>>>,
    foreign: RwLock<HashMap<String, Vec<ForeignStateChangeListener>>>,
    /// Last-acknowledged value per fully qualified own-state id. Updated
    /// only by our own acknowledged writes and the startup seed.
    current: RwLock<HashMap<String, StateValue>>,
}

impl EventDispatcher {
    /// Creates a dispatcher for the given service namespace.
    pub fn new(namespace: impl Into<String>, store: Arc<dyn StateStore>) -> Arc<Self> {
        Arc::new(Self {
            namespace: namespace.into(),
            store,
            local: RwLock::new(HashMap::new()),
            foreign: RwLock::new(HashMap::new()),
            current: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the service namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn qualify(&self, id: &str) -> String {
        format!("{}.{}", self.namespace, id)
    }

    /// Seeds the last-acknowledged cache from the persisted state tree.
    ///
    /// Only acknowledged records are taken; pending writes that survived a
    /// restart must not masquerade as settled values.
    pub async fn seed_from_store(&self) -> Result<(), TwigError> {
        let pattern = format!("{}.*", self.namespace);
        let states = self.store.get_states(&pattern).await?;
        let mut current = self.current.write();
        for (id, record) in states {
            if record.ack {
                current.insert(id, record.val);
            }
        }
        Ok(())
    }

    /// Registers a listener for a state local to this service.
    ///
    /// `id` is namespace-relative; qualification happens here.
    pub fn add_state_change_listener(&self, id: &str, listener: StateChangeListener) {
        let key = self.qualify(id);
        self.local.write().entry(key).or_default().push(listener);
    }

    /// Registers a listener for a foreign state.
    ///
    /// The very first registration for an id subscribes to it at the
    /// platform; later registrations only append to the list.
    pub async fn add_foreign_state_change_listener(
        &self,
        id: &str,
        listener: ForeignStateChangeListener,
    ) -> Result<(), TwigError> {
        let first = {
            let mut foreign = self.foreign.write();
            let entry = foreign.entry(id.to_string()).or_default();
            entry.push(listener);
            entry.len() == 1
        };
        if first {
            self.store.subscribe_foreign_states(id).await.map_err(|e| {
                TwigError::Listener(ListenerError::SubscribeFailed {
                    id: id.to_string(),
                    message: e.to_string(),
                })
            })?;
        }
        Ok(())
    }

    /// Writes a state value with `ack = true` and records it as the new
    /// last-acknowledged value.
    ///
    /// The cache update happens before the platform write so that the next
    /// notification dispatched after this call observes it; the write is
    /// awaited so the value is durable before the caller proceeds.
    pub async fn set_state_ack(&self, id: &str, value: StateValue) -> Result<(), TwigError> {
        let key = self.qualify(id);
        self.current.write().insert(key.clone(), value.clone());
        self.store.set_state(&key, value, true).await
    }

    /// Returns the last acknowledged value for a namespace-relative id.
    pub fn get_state_value(&self, id: &str) -> Option<StateValue> {
        self.current.read().get(&self.qualify(id)).cloned()
    }

    /// Handles one state-change notification from the platform.
    ///
    /// All matched listeners run concurrently; the call returns once every
    /// one of them finished.
    pub async fn on_state_change(&self, id: &str, record: Option<StateRecord>) {
        let Some(record) = record else {
            debug!(id, "State deleted");
            return;
        };
        debug!(id, ack = record.ack, "stateChange");

        let foreign = self.foreign.read().get(id).cloned();
        if let Some(listeners) = foreign {
            join_all(listeners.iter().map(|l| l(record.val.clone()))).await;
            return;
        }

        if record.ack {
            return;
        }

        let Some(listeners) = self.local.read().get(id).cloned() else {
            error!("{}", ListenerError::UnsupportedState { id: id.to_string() });
            return;
        };

        // Intentionally the last-acknowledged value, not the previous
        // pending one.
        let old_value = self.current.read().get(id).cloned();
        join_all(
            listeners
                .iter()
                .map(|l| l(old_value.clone(), record.val.clone())),
        )
        .await;
    }
}

// =============================================================================
// Tests
// =============================================================================
