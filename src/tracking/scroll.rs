//! Scroll-depth tracking.
//!
//! Reports each of the 25/50/75/100 percent thresholds at most once per page
//! load. Progress is measured against a high-water mark, so scrolling back up
//! and down again never re-reports a threshold.

use crate::collector::types::names;
use serde::{Deserialize, Serialize};

/// Furthest threshold reached on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScrollDepth {
    Below25,
    At25,
    At50,
    At75,
    /// Terminal for the page lifetime
    At100,
}

impl ScrollDepth {
    /// Depth reached by a given percentage.
    pub fn for_percent(percent: u32) -> Self {
        match percent {
            0..=24 => ScrollDepth::Below25,
            25..=49 => ScrollDepth::At25,
            50..=74 => ScrollDepth::At50,
            75..=99 => ScrollDepth::At75,
            _ => ScrollDepth::At100,
        }
    }

    /// The next deeper state, if any.
    fn next(self) -> Option<Self> {
        match self {
            ScrollDepth::Below25 => Some(ScrollDepth::At25),
            ScrollDepth::At25 => Some(ScrollDepth::At50),
            ScrollDepth::At50 => Some(ScrollDepth::At75),
            ScrollDepth::At75 => Some(ScrollDepth::At100),
            ScrollDepth::At100 => None,
        }
    }

    /// Event name reported on entering this state.
    pub fn event_name(self) -> Option<&'static str> {
        match self {
            ScrollDepth::Below25 => None,
            ScrollDepth::At25 => Some(names::SCROLL_25),
            ScrollDepth::At50 => Some(names::SCROLL_50),
            ScrollDepth::At75 => Some(names::SCROLL_75),
            ScrollDepth::At100 => Some(names::SCROLL_100),
        }
    }
}

/// A threshold crossing to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMilestone {
    pub depth: ScrollDepth,
    /// Scroll percentage observed when the threshold was crossed
    pub scroll_percent: u32,
}

impl ScrollMilestone {
    pub fn event_name(&self) -> &'static str {
        self.depth.event_name().unwrap_or(names::SCROLL_25)
    }
}

/// Per-page scroll-depth state machine.
#[derive(Debug, Clone)]
pub struct ScrollDepthTracker {
    depth: ScrollDepth,
    max_percent: u32,
}

impl Default for ScrollDepthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollDepthTracker {
    pub fn new() -> Self {
        Self {
            depth: ScrollDepth::Below25,
            max_percent: 0,
        }
    }

    pub fn depth(&self) -> ScrollDepth {
        self.depth
    }

    /// Highest percentage seen so far.
    pub fn max_percent(&self) -> u32 {
        self.max_percent
    }

    /// Feed one scroll observation.
    ///
    /// Returns one milestone per newly crossed threshold, shallowest first.
    /// Observations at or below the high-water mark return nothing.
    pub fn observe(&mut self, percent: u32) -> Vec<ScrollMilestone> {
        if percent <= self.max_percent {
            return Vec::new();
        }
        self.max_percent = percent;

        let target = ScrollDepth::for_percent(percent);
        let mut milestones = Vec::new();
        while self.depth < target {
            let Some(next) = self.depth.next() else {
                break;
            };
            self.depth = next;
            milestones.push(ScrollMilestone {
                depth: next,
                scroll_percent: percent,
            });
        }
        milestones
    }
}

/// Scroll position as a rounded percentage of the scrollable distance.
///
/// `None` when the document fits in the viewport and cannot scroll.
pub fn scroll_percent(scroll_y: f64, document_height: f64, viewport_height: f64) -> Option<u32> {
    let scrollable = document_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 || !scroll_y.is_finite() {
        return None;
    }
    let percent = (scroll_y.max(0.0) / scrollable * 100.0).round();
    Some(percent.min(100.0) as u32)
}
