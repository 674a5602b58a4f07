// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-side event listener registry
//!
//! Callbacks never leave the host. The worker only sees their ids and asks
//! the host to invoke them.

use circuit_eval::EngineEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identifier of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// An engine event callback
pub type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Registered callbacks, keyed by id
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`, returning the id the worker will refer to it by
    pub fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().insert(id, listener);
        id
    }

    /// Invoke a listener; unknown ids were released and are ignored
    pub fn invoke(&self, id: ListenerId, event: &EngineEvent) {
        // Clone out so the callback runs without the lock held
        let listener = self.listeners.lock().get(&id).cloned();
        match listener {
            Some(listener) => listener(event),
            None => debug!("Dropping '{}' for released listener {:?}", event.name, id),
        }
    }

    /// Release every listener
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no listeners are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
