//! In-memory platform implementations.
//!
//! These stand in for browser storage and network primitives in tests and
//! demos. Every type is a cheap clonable handle over shared state, so a test
//! can keep one clone and give the other to the collector.

use crate::collector::types::Event;
use crate::platform::{
    Clock, Connectivity, KeyValueStore, StoreError, TransmissionError, Transport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Key-value store backed by a shared `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::QuotaExceeded`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::QuotaExceeded);
        }
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::QuotaExceeded);
        }
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// How a [`RecordingTransport`] answers a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accept the request
    Accept,
    /// Reject it synchronously
    Fail,
    /// Accept it, then report it through `take_failed`
    FailLater,
}

#[derive(Debug)]
struct TransportState {
    sent: Vec<Event>,
    beacons: Vec<Event>,
    failed: Vec<Event>,
    standard: SendOutcome,
    durable: Option<SendOutcome>,
}

/// Transport that records every request instead of sending it.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    state: Arc<Mutex<TransportState>>,
    online: Arc<AtomicBool>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Accepts every standard request and has a working durable path.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                sent: Vec::new(),
                beacons: Vec::new(),
                failed: Vec::new(),
                standard: SendOutcome::Accept,
                durable: Some(SendOutcome::Accept),
            })),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Set how standard requests are answered.
    pub fn set_standard(&self, outcome: SendOutcome) {
        lock(&self.state).standard = outcome;
    }

    /// Set how durable sends are answered; `None` removes the primitive.
    pub fn set_durable(&self, outcome: Option<SendOutcome>) {
        lock(&self.state).durable = outcome;
    }

    /// Value reported through [`Connectivity`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Every standard request issued, in order, including failed ones.
    pub fn sent(&self) -> Vec<Event> {
        lock(&self.state).sent.clone()
    }

    /// Every durable send issued, in order.
    pub fn beacons(&self) -> Vec<Event> {
        lock(&self.state).beacons.clone()
    }

    /// Total requests of either kind.
    pub fn request_count(&self) -> usize {
        let state = lock(&self.state);
        state.sent.len() + state.beacons.len()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, event: &Event) -> Result<(), TransmissionError> {
        let mut state = lock(&self.state);
        state.sent.push(event.clone());
        match state.standard {
            SendOutcome::Accept => Ok(()),
            SendOutcome::Fail => Err(TransmissionError::Network("simulated failure".into())),
            SendOutcome::FailLater => {
                state.failed.push(event.clone());
                Ok(())
            }
        }
    }

    fn send_durable(&self, event: &Event) -> Option<Result<(), TransmissionError>> {
        let mut state = lock(&self.state);
        let outcome = state.durable?;
        state.beacons.push(event.clone());
        Some(match outcome {
            SendOutcome::Accept => Ok(()),
            SendOutcome::Fail => Err(TransmissionError::Rejected("simulated rejection".into())),
            SendOutcome::FailLater => {
                state.failed.push(event.clone());
                Ok(())
            }
        })
    }

    fn take_failed(&self) -> Vec<Event> {
        std::mem::take(&mut lock(&self.state).failed)
    }
}

impl Connectivity for RecordingTransport {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::Metadata;

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap(), Some("v".to_string()));

        other.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_recording_transport_fail_later() {
        let transport = RecordingTransport::new();
        transport.set_standard(SendOutcome::FailLater);
        let event = Event::new("click", Metadata::new(), 1, "/", "s");

        assert!(transport.send(&event).is_ok());
        assert_eq!(transport.take_failed(), vec![event]);
        assert!(transport.take_failed().is_empty());
    }

    #[test]
    fn test_missing_durable_primitive() {
        let transport = RecordingTransport::new();
        transport.set_durable(None);
        let event = Event::new("time_on_page", Metadata::new(), 1, "/", "s");

        assert!(transport.send_durable(&event).is_none());
        assert!(transport.beacons().is_empty());
    }
}
