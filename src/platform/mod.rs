//! Platform capabilities consumed by the event collector.
//!
//! The collector never touches the network, the filesystem or the wall clock
//! directly. Everything it needs from the host comes through the traits in
//! this module, so a browser-less host (a CLI, a test) can supply its own.

pub mod file_store;
pub mod memory;

#[cfg(feature = "http")]
pub mod http;

use crate::collector::types::Event;

// Re-export commonly used types
pub use file_store::FileStore;
pub use memory::{ManualClock, MemoryStore, RecordingTransport, SendOutcome};

#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportConfig};

/// Delivery of wire events to the collection endpoint.
pub trait Transport {
    /// Hand an event to the standard request path.
    ///
    /// `Ok` means the request was issued, not that it succeeded. Failures that
    /// surface after hand-off are reported through [`Transport::take_failed`].
    fn send(&self, event: &Event) -> Result<(), TransmissionError>;

    /// Hand an event to the durable fire-and-forget path used at unload time.
    ///
    /// Returns `None` when the platform has no such primitive.
    fn send_durable(&self, event: &Event) -> Option<Result<(), TransmissionError>>;

    /// Events whose in-flight delivery failed since the last call.
    fn take_failed(&self) -> Vec<Event> {
        Vec::new()
    }
}

/// Current network reachability as reported by the host.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// String key-value storage (the host's local or session storage).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Wall-clock source in epoch milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Transmission error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmissionError {
    /// The request could not be issued or the connection failed
    Network(String),
    /// The endpoint answered with a non-success status
    Status(u16),
    /// The request did not complete in time
    Timeout,
    /// The durable send primitive refused the payload
    Rejected(String),
    /// The event could not be encoded
    Serialization(String),
}

impl std::fmt::Display for TransmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransmissionError::Network(msg) => write!(f, "Network error: {msg}"),
            TransmissionError::Status(status) => write!(f, "Endpoint returned status {status}"),
            TransmissionError::Timeout => write!(f, "Request timed out"),
            TransmissionError::Rejected(msg) => write!(f, "Durable send rejected: {msg}"),
            TransmissionError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for TransmissionError {}

/// Key-value storage errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying read or write failed
    Io(String),
    /// Stored data could not be (de)serialized
    Serialization(String),
    /// The store is full
    QuotaExceeded,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Storage IO error: {e}"),
            StoreError::Serialization(e) => write!(f, "Storage serialization error: {e}"),
            StoreError::QuotaExceeded => write!(f, "Storage quota exceeded"),
        }
    }
}

impl std::error::Error for StoreError {}
