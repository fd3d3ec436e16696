//! Event producers.
//!
//! This module contains:
//! - Scroll-depth tracking with a high-water mark
//! - Metadata builders for page views, clicks, forms and navigation timing
//! - Host-driven repeating timers
//! - The page scope tying producers to a collector

pub mod interactions;
pub mod page;
pub mod scroll;
pub mod timers;

// Re-export commonly used types
pub use interactions::{FormSubmission, NavigationTiming, PageView, TrackedClick, Viewport};
pub use page::{PageScope, DEFAULT_TIME_ON_PAGE_INTERVAL};
pub use scroll::{scroll_percent, ScrollDepth, ScrollDepthTracker, ScrollMilestone};
pub use timers::{TaskId, Timers};
