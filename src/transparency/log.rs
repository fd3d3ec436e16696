//! Delivery transparency log.
//!
//! Counts what the collector did with each event so the operator can see how
//! much was delivered, queued or lost, without keeping any event content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Delivery statistics for the current run.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of `record` calls
    events_recorded: AtomicU64,
    /// Number of standard requests handed off
    requests_sent: AtomicU64,
    /// Number of durable sends accepted
    beacons_sent: AtomicU64,
    /// Number of events put in the pending queue
    events_queued: AtomicU64,
    /// Number of queued events re-sent by a flush
    events_flushed: AtomicU64,
    /// Number of failed writes to durable storage
    persistence_failures: AtomicU64,
    /// Run start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            events_recorded: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            beacons_sent: AtomicU64::new(0),
            events_queued: AtomicU64::new(0),
            events_flushed: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log that accumulates into a file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous delivery stats: {}", e);
        }

        log
    }

    pub fn record_event(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_beacon(&self) {
        self.beacons_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queued(&self) {
        self.events_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flushed(&self, count: u64) {
        self.events_flushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            beacons_sent: self.beacons_sent.load(Ordering::Relaxed),
            events_queued: self.events_queued.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Delivery Statistics:\n\
             - Events recorded: {}\n\
             - Requests sent: {}\n\
             - Beacons sent: {}\n\
             - Events queued for retry: {}\n\
             - Events re-sent by flush: {}\n\
             - Storage write failures: {}\n\
             \n\
             Delivery is best-effort: queued events are re-sent when\n\
             connectivity returns, never retried on a schedule.",
            stats.events_recorded,
            stats.requests_sent,
            stats.beacons_sent,
            stats.events_queued,
            stats.events_flushed,
            stats.persistence_failures
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                events_recorded: stats.events_recorded,
                requests_sent: stats.requests_sent,
                beacons_sent: stats.beacons_sent,
                events_queued: stats.events_queued,
                events_flushed: stats.events_flushed,
                persistence_failures: stats.persistence_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.events_recorded
                    .store(persisted.events_recorded, Ordering::Relaxed);
                self.requests_sent
                    .store(persisted.requests_sent, Ordering::Relaxed);
                self.beacons_sent
                    .store(persisted.beacons_sent, Ordering::Relaxed);
                self.events_queued
                    .store(persisted.events_queued, Ordering::Relaxed);
                self.events_flushed
                    .store(persisted.events_flushed, Ordering::Relaxed);
                self.persistence_failures
                    .store(persisted.persistence_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of delivery statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub events_recorded: u64,
    pub requests_sent: u64,
    pub beacons_sent: u64,
    pub events_queued: u64,
    pub events_flushed: u64,
    pub persistence_failures: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    events_recorded: u64,
    requests_sent: u64,
    beacons_sent: u64,
    events_queued: u64,
    events_flushed: u64,
    persistence_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let log = TransparencyLog::new();

        log.record_event();
        log.record_event();
        log.record_request();
        log.record_queued();
        log.record_flushed(3);

        let stats = log.stats();
        assert_eq!(stats.events_recorded, 2);
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.events_queued, 1);
        assert_eq!(stats.events_flushed, 3);
        assert_eq!(stats.beacons_sent, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let path = std::env::temp_dir()
            .join(format!("listgenie-stats-{}", uuid::Uuid::new_v4()))
            .join("delivery.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_event();
        log.record_persistence_failure();
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path);
        reloaded.record_event();
        let stats = reloaded.stats();
        assert_eq!(stats.events_recorded, 2);
        assert_eq!(stats.persistence_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = TransparencyLog::new().summary();

        assert!(summary.contains("Events recorded"));
        assert!(summary.contains("Storage write failures"));
        assert!(summary.contains("best-effort"));
    }
}
