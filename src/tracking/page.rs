//! One page lifetime.
//!
//! [`PageScope`] owns the collector together with every producer that feeds
//! it. The host forwards its notifications (load, scroll, click, submit,
//! connectivity, clock ticks, unload) and the scope turns them into events.

use crate::collector::types::{names, Metadata};
use crate::collector::EventCollector;
use crate::config::Config;
use crate::tracking::interactions::{FormSubmission, NavigationTiming, PageView, TrackedClick};
use crate::tracking::scroll::{scroll_percent, ScrollDepthTracker};
use crate::tracking::timers::{TaskId, Timers};
use serde_json::json;
use std::time::Duration;

/// Default period of `time_on_page_interval` reports.
pub const DEFAULT_TIME_ON_PAGE_INTERVAL: Duration = Duration::from_secs(30);

/// Producers and timers scoped to one page load.
pub struct PageScope {
    collector: EventCollector,
    scroll: ScrollDepthTracker,
    timers: Timers,
    time_on_page_task: Option<TaskId>,
    time_on_page_interval: Duration,
    /// Load time in epoch milliseconds, set by `load`
    started_at: Option<i64>,
    torn_down: bool,
}

impl PageScope {
    pub fn new(collector: EventCollector) -> Self {
        Self {
            collector,
            scroll: ScrollDepthTracker::new(),
            timers: Timers::new(),
            time_on_page_task: None,
            time_on_page_interval: DEFAULT_TIME_ON_PAGE_INTERVAL,
            started_at: None,
            torn_down: false,
        }
    }

    pub fn with_time_on_page_interval(mut self, interval: Duration) -> Self {
        self.time_on_page_interval = interval;
        self
    }

    /// Apply the page-level settings from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_time_on_page_interval(config.time_on_page_interval)
    }

    /// The page finished loading at `now`: reports the page view and starts
    /// the time-on-page timer. Only the first call has any effect.
    pub fn load(&mut self, view: &PageView, now: i64) {
        if self.torn_down || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(now);
        self.collector.set_path(view.path.clone());
        self.collector.record(names::PAGE_VIEW, view.meta(), false);

        let interval =
            i64::try_from(self.time_on_page_interval.as_millis()).unwrap_or(i64::MAX);
        self.time_on_page_task = self.timers.schedule(now, interval);
    }

    /// A scroll position observation.
    pub fn scroll(&mut self, scroll_y: f64, document_height: f64, viewport_height: f64) {
        if let Some(percent) = scroll_percent(scroll_y, document_height, viewport_height) {
            self.scroll_to_percent(percent);
        }
    }

    /// A scroll observation already expressed as a percentage.
    pub fn scroll_to_percent(&mut self, percent: u32) {
        if self.torn_down {
            return;
        }
        for milestone in self.scroll.observe(percent) {
            let meta = Metadata::from_iter([
                ("scrollPercent".to_string(), json!(milestone.scroll_percent)),
                ("timestamp".to_string(), json!(self.collector.now_millis())),
            ]);
            self.collector.record(milestone.event_name(), meta, false);
        }
    }

    /// A click on an element flagged for tracking.
    pub fn click(&mut self, click: &TrackedClick) {
        if self.torn_down {
            return;
        }
        self.collector.record(click.event_name(), click.meta(), false);
    }

    /// A form submission.
    pub fn submit(&mut self, form: &FormSubmission) {
        if self.torn_down {
            return;
        }
        self.collector.record(names::FORM_SUBMIT, form.meta(), false);
    }

    /// Navigation timing became available.
    pub fn performance(&mut self, timing: &NavigationTiming) {
        if self.torn_down {
            return;
        }
        self.collector
            .record(names::PERFORMANCE_METRICS, timing.meta(), false);
    }

    /// An application-defined event, e.g. `preview_generated`.
    pub fn track(&mut self, name: &str, meta: Metadata) {
        if self.torn_down {
            return;
        }
        self.collector.record(name, meta, false);
    }

    pub fn online(&mut self) {
        self.collector.notify_online();
    }

    pub fn offline(&mut self) {
        self.collector.notify_offline();
    }

    /// Advance the page clock, firing any due time-on-page reports.
    pub fn tick(&mut self, now: i64) {
        let Some(started_at) = self.started_at else {
            return;
        };
        for (id, at) in self.timers.due(now) {
            if Some(id) == self.time_on_page_task {
                let meta = time_on_page_meta(started_at, at);
                self.collector
                    .record(names::TIME_ON_PAGE_INTERVAL, meta, false);
            }
        }
        self.collector.reclaim();
    }

    /// The page is going away: reports the final time on page over the
    /// durable path, then tears the scope down.
    pub fn unload(&mut self, now: i64) {
        if self.torn_down {
            return;
        }
        if let Some(started_at) = self.started_at {
            let meta = time_on_page_meta(started_at, now);
            self.collector.record(names::TIME_ON_PAGE, meta, true);
        }
        self.teardown();
    }

    /// Cancel every timer and stop accepting producer input.
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
        self.time_on_page_task = None;
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn active_timers(&self) -> usize {
        self.timers.active()
    }

    pub fn collector(&self) -> &EventCollector {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut EventCollector {
        &mut self.collector
    }

    /// End the scope, handing back the collector.
    pub fn into_collector(mut self) -> EventCollector {
        self.teardown();
        self.collector
    }
}

fn time_on_page_meta(started_at: i64, now: i64) -> Metadata {
    Metadata::from_iter([
        (
            "timeOnPage".to_string(),
            json!(now.saturating_sub(started_at).max(0)),
        ),
        ("timestamp".to_string(), json!(now)),
    ])
}
