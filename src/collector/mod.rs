//! Event collection module.
//!
//! Producers feed events into an [`EventCollector`], which stamps them with a
//! timestamp, the page path and the session id, then delivers or queues them.

pub mod event_collector;
pub mod queue;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use event_collector::{EventCollector, Platform};
pub use queue::{PendingQueue, PENDING_QUEUE_KEY};
pub use session::{generate_session_id, SessionIdProvider, SESSION_ID_KEY};
pub use types::{meta, names, Event, Metadata};
