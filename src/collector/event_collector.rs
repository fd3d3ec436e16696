//! The event collector.
//!
//! Producers call [`EventCollector::record`]. The collector stamps the event,
//! tries to deliver it and falls back to the pending queue on any failure.
//! Nothing here ever returns an error to a producer: failures end in a log
//! line, a queue write, or both.

use crate::collector::queue::PendingQueue;
use crate::collector::session::SessionIdProvider;
use crate::collector::types::{names, Event, Metadata};
use crate::platform::{Clock, KeyValueStore, StoreError, SystemClock, Transport};
use crate::transparency::{create_shared_log, SharedTransparencyLog};

/// Capabilities the collector needs from its host.
pub struct Platform {
    /// Standard and durable delivery
    pub transport: Box<dyn Transport>,
    /// Durable storage holding the pending queue
    pub local_store: Box<dyn KeyValueStore>,
    /// Session-scoped storage holding the session id
    pub session_store: Box<dyn KeyValueStore>,
    /// Timestamp source
    pub clock: Box<dyn Clock>,
}

impl Platform {
    /// Platform using the system clock.
    pub fn new(
        transport: impl Transport + 'static,
        local_store: impl KeyValueStore + 'static,
        session_store: impl KeyValueStore + 'static,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            local_store: Box::new(local_store),
            session_store: Box::new(session_store),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

/// Captures events and delivers them best-effort.
pub struct EventCollector {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    queue: PendingQueue,
    sessions: SessionIdProvider,
    /// Last known connectivity, driven by host notifications
    online: bool,
    /// Page path stamped on new events
    path: String,
    /// Highest timestamp handed out so far
    last_timestamp: i64,
    log: SharedTransparencyLog,
}

impl EventCollector {
    /// Create a collector. Events left in the pending queue by a previous run
    /// are loaded, but not re-sent until the next flush.
    pub fn new(platform: Platform, online: bool) -> Self {
        Self {
            transport: platform.transport,
            clock: platform.clock,
            queue: PendingQueue::open(platform.local_store),
            sessions: SessionIdProvider::new(platform.session_store),
            online,
            path: "/".to_string(),
            last_timestamp: i64::MIN,
            log: create_shared_log(),
        }
    }

    /// Count deliveries into an existing transparency log.
    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = log;
        self
    }

    /// Set the page path stamped on subsequent events.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record one event.
    ///
    /// With `use_durable_transport` the durable fire-and-forget primitive is
    /// tried first; if it is missing or refuses the event, the standard path
    /// is used instead.
    pub fn record(&mut self, name: &str, meta: Metadata, use_durable_transport: bool) {
        self.reclaim();

        let event = self.capture(name, meta);
        self.log.record_event();

        if use_durable_transport {
            match self.transport.send_durable(&event) {
                Some(Ok(())) => {
                    self.log.record_beacon();
                    return;
                }
                Some(Err(e)) => {
                    tracing::warn!("Beacon failed, falling back to standard request: {}", e);
                }
                None => {}
            }
        }

        self.send_standard(event);
    }

    /// Host notification: the network became reachable. Flushes the queue.
    pub fn notify_online(&mut self) {
        self.online = true;
        self.flush();
    }

    /// Host notification: the network became unreachable.
    pub fn notify_offline(&mut self) {
        self.reclaim();
        self.online = false;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Re-send every queued event on the standard path.
    ///
    /// Events whose re-send fails go back into the queue, so a failed flush
    /// loses nothing. Returns the number of events handed to the transport.
    pub fn flush(&mut self) -> usize {
        self.reclaim();

        let (events, drained) = self.queue.drain();
        if let Err(e) = drained {
            self.persistence_failed(&e);
        }
        if events.is_empty() {
            return 0;
        }

        let total = events.len();
        tracing::debug!("Flushing {} pending events", total);

        let requeued_before = self.queue.len();
        for event in events {
            self.send_standard(event);
        }
        let handed_off = total - (self.queue.len() - requeued_before);

        self.log.record_flushed(handed_off as u64);
        handed_off
    }

    /// Queue any events the transport reported as failed after hand-off.
    pub fn reclaim(&mut self) {
        for event in self.transport.take_failed() {
            tracing::warn!("Delivery of '{}' failed, queueing for retry", event.name());
            self.enqueue(event);
        }
    }

    /// Current time on the collector's clock, in epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// The current session id, created on first use.
    pub fn session_id(&mut self) -> String {
        let now = self.clock.now_millis();
        self.sessions.session_id(now)
    }

    /// End the current session; the next event starts a new one.
    pub fn reset_session(&mut self) -> Result<(), StoreError> {
        self.sessions.reset()
    }

    /// Events awaiting delivery, oldest first.
    pub fn pending(&self) -> &[Event] {
        self.queue.events()
    }

    /// Discard every pending event.
    pub fn clear_pending(&mut self) -> Result<(), StoreError> {
        self.queue.clear()
    }

    pub fn transparency_log(&self) -> &SharedTransparencyLog {
        &self.log
    }

    fn capture(&mut self, name: &str, meta: Metadata) -> Event {
        let name = if name.is_empty() {
            tracing::warn!("Event recorded without a name, using '{}'", names::FALLBACK);
            names::FALLBACK
        } else {
            name
        };

        // Timestamps never go backwards, even if the wall clock does.
        let timestamp = self.clock.now_millis().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let session_id = self.sessions.session_id(timestamp);
        Event::new(name, meta, timestamp, self.path.clone(), session_id)
    }

    fn send_standard(&mut self, event: Event) {
        if !self.online {
            self.enqueue(event);
            return;
        }

        match self.transport.send(&event) {
            Ok(()) => self.log.record_request(),
            Err(e) => {
                tracing::warn!("Analytics request failed: {}", e);
                self.enqueue(event);
            }
        }
    }

    fn enqueue(&mut self, event: Event) {
        self.log.record_queued();
        if let Err(e) = self.queue.push(event) {
            self.persistence_failed(&e);
        }
    }

    fn persistence_failed(&self, error: &StoreError) {
        tracing::warn!("Failed to persist analytics events: {}", error);
        self.log.record_persistence_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::queue::{self, PENDING_QUEUE_KEY};
    use crate::collector::types::meta;
    use crate::platform::memory::SendOutcome;
    use crate::platform::{ManualClock, MemoryStore, RecordingTransport};
    use serde_json::json;

    struct Harness {
        transport: RecordingTransport,
        local: MemoryStore,
        clock: ManualClock,
    }

    fn collector(online: bool) -> (EventCollector, Harness) {
        let harness = Harness {
            transport: RecordingTransport::new(),
            local: MemoryStore::new(),
            clock: ManualClock::new(1_000),
        };
        let platform = Platform::new(
            harness.transport.clone(),
            harness.local.clone(),
            MemoryStore::new(),
        )
        .with_clock(harness.clock.clone());
        (EventCollector::new(platform, online), harness)
    }

    #[test]
    fn test_online_record_sends_once() {
        let (mut collector, h) = collector(true);

        collector.record("click", meta([("buttonText", json!("Try it"))]), false);

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name(), "click");
        assert_eq!(sent[0].meta()["buttonText"], "Try it");
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn test_failed_send_is_queued() {
        let (mut collector, h) = collector(true);
        h.transport.set_standard(SendOutcome::Fail);

        collector.record("click", Metadata::new(), false);

        assert_eq!(collector.pending().len(), 1);
        assert_eq!(queue::load(&h.local).unwrap().len(), 1);
    }

    #[test]
    fn test_late_failure_is_reclaimed() {
        let (mut collector, h) = collector(true);
        h.transport.set_standard(SendOutcome::FailLater);

        collector.record("click", Metadata::new(), false);
        assert!(collector.pending().is_empty());

        collector.reclaim();
        assert_eq!(collector.pending().len(), 1);
        assert_eq!(collector.pending()[0].name(), "click");
    }

    #[test]
    fn test_beacon_used_when_requested() {
        let (mut collector, h) = collector(true);

        collector.record("time_on_page", Metadata::new(), true);

        assert_eq!(h.transport.beacons().len(), 1);
        assert!(h.transport.sent().is_empty());
    }

    #[test]
    fn test_beacon_ignores_offline_state() {
        let (mut collector, h) = collector(false);

        collector.record("time_on_page", Metadata::new(), true);

        assert_eq!(h.transport.beacons().len(), 1);
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn test_beacon_failure_falls_back_to_standard() {
        let (mut collector, h) = collector(true);
        h.transport.set_durable(Some(SendOutcome::Fail));

        collector.record("time_on_page", Metadata::new(), true);

        assert_eq!(h.transport.beacons().len(), 1);
        assert_eq!(h.transport.sent().len(), 1);
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn test_missing_beacon_uses_standard() {
        let (mut collector, h) = collector(true);
        h.transport.set_durable(None);

        collector.record("time_on_page", Metadata::new(), true);

        assert_eq!(h.transport.sent().len(), 1);
    }

    #[test]
    fn test_empty_name_uses_fallback() {
        let (mut collector, h) = collector(true);

        collector.record("", Metadata::new(), false);

        assert_eq!(h.transport.sent()[0].name(), names::FALLBACK);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let (mut collector, h) = collector(true);

        collector.record("a", Metadata::new(), false);
        h.clock.set(500);
        collector.record("b", Metadata::new(), false);
        h.clock.set(2_000);
        collector.record("c", Metadata::new(), false);

        let stamps: Vec<i64> = h.transport.sent().iter().map(|e| e.timestamp()).collect();
        assert_eq!(stamps, vec![1_000, 1_000, 2_000]);
    }

    #[test]
    fn test_path_is_stamped_at_capture() {
        let (mut collector, h) = collector(true);

        collector.set_path("/pricing");
        collector.record("page_view", Metadata::new(), false);
        collector.set_path("/faq");
        collector.record("page_view", Metadata::new(), false);

        let sent = h.transport.sent();
        assert_eq!(sent[0].path(), "/pricing");
        assert_eq!(sent[1].path(), "/faq");
    }

    #[test]
    fn test_flush_requeues_failures() {
        let (mut collector, h) = collector(false);
        collector.record("a", Metadata::new(), false);
        collector.record("b", Metadata::new(), false);

        h.transport.set_standard(SendOutcome::Fail);
        collector.notify_online();

        assert_eq!(h.transport.sent().len(), 2);
        let names: Vec<&str> = collector.pending().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(queue::load(&h.local).unwrap().len(), 2);
    }

    #[test]
    fn test_flush_returns_handed_off_count() {
        let (mut collector, _h) = collector(false);
        collector.record("a", Metadata::new(), false);
        collector.record("b", Metadata::new(), false);
        collector.record("c", Metadata::new(), false);

        collector.notify_online();
        assert!(collector.pending().is_empty());
        assert_eq!(collector.flush(), 0);
        assert_eq!(collector.transparency_log().stats().events_flushed, 3);
    }

    #[test]
    fn test_offline_notification_stops_sending() {
        let (mut collector, h) = collector(true);

        collector.notify_offline();
        collector.record("a", Metadata::new(), false);

        assert!(!collector.is_online());
        assert!(h.transport.sent().is_empty());
        assert_eq!(collector.pending().len(), 1);
    }

    #[test]
    fn test_persistence_failure_is_swallowed() {
        let (mut collector, h) = collector(false);
        h.local.fail_writes(true);

        collector.record("a", Metadata::new(), false);

        assert_eq!(collector.pending().len(), 1);
        assert_eq!(h.local.get(PENDING_QUEUE_KEY).unwrap(), None);
        assert_eq!(collector.transparency_log().stats().persistence_failures, 1);
    }

    #[test]
    fn test_queue_survives_restart() {
        let transport = RecordingTransport::new();
        let local = MemoryStore::new();
        let sessions = MemoryStore::new();

        {
            let platform = Platform::new(transport.clone(), local.clone(), sessions.clone());
            let mut collector = EventCollector::new(platform, false);
            collector.record("before_reload", Metadata::new(), false);
        }

        let platform = Platform::new(transport.clone(), local, sessions);
        let mut collector = EventCollector::new(platform, false);
        assert_eq!(collector.pending().len(), 1);

        collector.notify_online();
        assert_eq!(transport.sent()[0].name(), "before_reload");
        assert!(collector.pending().is_empty());
    }
}
