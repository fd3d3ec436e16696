//! ListGenie Analytics - best-effort event capture for the landing page.
//!
//! This library records interaction and timing events, delivers them to a
//! collection endpoint and keeps undeliverable ones in a durable local queue
//! until connectivity returns.
//!
//! # Delivery Guarantees
//!
//! - **Never disruptive**: recording an event cannot fail or panic in the caller
//! - **Best-effort durability**: events that could not be sent are persisted
//!   locally and re-sent on reconnect
//! - **No exactly-once**: an event may be delivered twice, or lost if local
//!   storage itself fails
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ListGenie Analytics                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌────────────────┐   ┌───────────────┐    │
//! │  │  PageScope  │──▶│ EventCollector │──▶│   Transport   │    │
//! │  │ (producers) │   │ (stamp, route) │   │ (http/beacon) │    │
//! │  └─────────────┘   └────────────────┘   └───────────────┘    │
//! │                      │            ▲            │ failed      │
//! │                      ▼            │ flush      ▼             │
//! │               ┌─────────────┐   ┌──────────────────┐         │
//! │               │Transparency │   │  Pending Queue   │         │
//! │               │    Log      │   │ (KeyValueStore)  │         │
//! │               └─────────────┘   └──────────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use listgenie_analytics::collector::{EventCollector, Metadata, Platform};
//! use listgenie_analytics::platform::{MemoryStore, RecordingTransport};
//!
//! let transport = RecordingTransport::new();
//! let platform = Platform::new(transport.clone(), MemoryStore::new(), MemoryStore::new());
//! let mut collector = EventCollector::new(platform, true);
//!
//! collector.record("page_view", Metadata::new(), false);
//! assert_eq!(transport.sent().len(), 1);
//! ```

pub mod collector;
pub mod config;
pub mod platform;
pub mod tracking;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Event, EventCollector, Metadata, Platform};
pub use config::{Config, ConfigError};
pub use platform::{
    Clock, Connectivity, FileStore, KeyValueStore, StoreError, SystemClock, TransmissionError,
    Transport,
};
pub use tracking::{PageScope, ScrollDepthTracker};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

#[cfg(feature = "http")]
pub use platform::{HttpTransport, HttpTransportConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Declaration of what the collector tracks, for display to users.
pub const DATA_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             LISTGENIE ANALYTICS - DATA DECLARATION               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This collector records how visitors use the landing page.      ║
║                                                                  ║
║  ✓ WHAT WE RECORD:                                               ║
║    • Page views (path, referrer, browser, viewport size)         ║
║    • Clicks on tracked buttons and links (label, target)         ║
║    • Form submissions (form id, method, field count only)        ║
║    • Scroll depth milestones (25%, 50%, 75%, 100%)               ║
║    • Time spent on the page and load performance                 ║
║                                                                  ║
║  ✗ WHAT WE NEVER RECORD:                                         ║
║    • Anything typed into form fields                             ║
║    • Listing text entered into the preview generator             ║
║    • Identity beyond a per-visit session id                      ║
║                                                                  ║
║  The session id ends with the browsing session. Events that      ║
║  cannot be sent are kept locally until the connection returns.   ║
║                                                                  ║
║  You can view delivery statistics anytime with:                  ║
║    listgenie-beacon status                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
