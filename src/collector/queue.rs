//! The pending queue of events awaiting delivery.
//!
//! The queue lives in memory and is mirrored to durable storage after every
//! change, so it survives a reload of the host page or process.

use crate::collector::types::Event;
use crate::platform::{KeyValueStore, StoreError};

/// Durable-storage key holding the pending queue.
pub const PENDING_QUEUE_KEY: &str = "analytics_offline_events";

/// Ordered, persisted list of undelivered events.
pub struct PendingQueue {
    store: Box<dyn KeyValueStore>,
    events: Vec<Event>,
}

impl PendingQueue {
    /// Open the queue, loading whatever a previous run left behind.
    ///
    /// An unreadable persisted queue is logged and treated as empty.
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        let events = match load(&*store) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Failed to load pending events: {}", e);
                Vec::new()
            }
        };

        Self { store, events }
    }

    /// Append an event and persist.
    pub fn push(&mut self, event: Event) -> Result<(), StoreError> {
        self.events.push(event);
        self.persist()
    }

    /// Remove and return every queued event, persisting the empty queue.
    ///
    /// The events are returned even when the persistence write fails.
    pub fn drain(&mut self) -> (Vec<Event>, Result<(), StoreError>) {
        let events = std::mem::take(&mut self.events);
        let result = self.store.remove(PENDING_QUEUE_KEY);
        (events, result)
    }

    /// Drop everything without delivering it.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.events.clear();
        self.store.remove(PENDING_QUEUE_KEY)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.events)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(PENDING_QUEUE_KEY, &json)
    }
}

/// Read the persisted queue from a store without opening it.
pub fn load(store: &dyn KeyValueStore) -> Result<Vec<Event>, StoreError> {
    match store.get(PENDING_QUEUE_KEY)? {
        Some(json) => {
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))
        }
        None => Ok(Vec::new()),
    }
}
