//! Transparency module for the analytics collector.
//!
//! Tracks what happened to recorded events and exposes it to the operator.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
