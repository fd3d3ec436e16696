//! HTTP transport for the collection endpoint.
//!
//! Standard sends are spawned onto a runtime owned by the transport and return
//! immediately; failures come back through [`Transport::take_failed`]. Durable
//! sends go to a dedicated beacon thread that drains its backlog before the
//! transport is dropped, so an unload-time event outlives its sender.

use crate::collector::types::Event;
use crate::platform::{Connectivity, Transport, TransmissionError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Maximum number of beacons waiting for the beacon thread.
const BEACON_BACKLOG: usize = 1_024;

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Collection endpoint URL events are POSTed to
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Health-check URL on the endpoint's origin, used for connectivity probes.
    pub fn health_url(&self) -> Result<String, TransmissionError> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| TransmissionError::Network(format!("Invalid endpoint: {e}")))?;
        url.set_path("/health");
        url.set_query(None);
        Ok(url.to_string())
    }
}

/// Transport posting events with reqwest.
///
/// Clones share the same runtime, beacon thread and failure channel.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<Inner>,
}

struct Inner {
    config: HttpTransportConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    in_flight: Arc<AtomicUsize>,
    failed_tx: Sender<Event>,
    failed_rx: Receiver<Event>,
    beacon_tx: Mutex<Option<Sender<String>>>,
    beacon_thread: Mutex<Option<JoinHandle<()>>>,
}

impl HttpTransport {
    /// Create a transport and start its beacon thread.
    pub fn new(config: HttpTransportConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("listgenie-http")
            .enable_all()
            .build()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(std::io::Error::other)?;

        let (failed_tx, failed_rx) = unbounded();
        let (beacon_tx, beacon_rx) = bounded::<String>(BEACON_BACKLOG);

        let beacon_thread = {
            let client = client.clone();
            let handle = runtime.handle().clone();
            let endpoint = config.endpoint.clone();
            std::thread::Builder::new()
                .name("listgenie-beacon".to_string())
                .spawn(move || {
                    // Runs until every sender is gone and the backlog is empty.
                    for body in beacon_rx {
                        if let Err(e) = handle.block_on(post(&client, &endpoint, body)) {
                            tracing::warn!("Beacon delivery failed: {}", e);
                        }
                    }
                })?
        };

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                runtime,
                in_flight: Arc::new(AtomicUsize::new(0)),
                failed_tx,
                failed_rx,
                beacon_tx: Mutex::new(Some(beacon_tx)),
                beacon_thread: Mutex::new(Some(beacon_thread)),
            }),
        })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.inner.config
    }

    /// Number of standard requests still in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Block until no standard request is in flight or `timeout` elapses.
    ///
    /// Returns `true` if everything settled.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }
}

impl Transport for HttpTransport {
    fn send(&self, event: &Event) -> Result<(), TransmissionError> {
        let body = event
            .to_json()
            .map_err(|e| TransmissionError::Serialization(e.to_string()))?;

        let inner = &self.inner;
        let client = inner.client.clone();
        let endpoint = inner.config.endpoint.clone();
        let failed_tx = inner.failed_tx.clone();
        let event = event.clone();
        let guard = InFlight::enter(&inner.in_flight);

        inner.runtime.spawn(async move {
            let _guard = guard;
            if let Err(e) = post(&client, &endpoint, body).await {
                tracing::warn!("Analytics error: {}", e);
                let _ = failed_tx.send(event);
            }
        });

        Ok(())
    }

    fn send_durable(&self, event: &Event) -> Option<Result<(), TransmissionError>> {
        let body = match event.to_json() {
            Ok(body) => body,
            Err(e) => return Some(Err(TransmissionError::Serialization(e.to_string()))),
        };

        let beacon_tx = match self.inner.beacon_tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = beacon_tx.as_ref()?;

        Some(sender.try_send(body).map_err(|e| match e {
            TrySendError::Full(_) => TransmissionError::Rejected("beacon backlog full".into()),
            TrySendError::Disconnected(_) => {
                TransmissionError::Rejected("beacon thread stopped".into())
            }
        }))
    }

    fn take_failed(&self) -> Vec<Event> {
        self.inner.failed_rx.try_iter().collect()
    }
}

impl Connectivity for HttpTransport {
    fn is_online(&self) -> bool {
        let url = match self.inner.config.health_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Connectivity probe skipped: {}", e);
                return false;
            }
        };

        // Any HTTP answer means the endpoint is reachable.
        let client = self.inner.client.clone();
        self.inner
            .runtime
            .block_on(async move { client.get(url).send().await.is_ok() })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Closing the channel lets the beacon thread finish its backlog and exit.
        if let Ok(mut tx) = self.beacon_tx.lock() {
            tx.take();
        }
        let thread = self.beacon_thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("Beacon thread panicked");
            }
        }
    }
}

/// Decrements the in-flight counter when the request task ends, even if the
/// runtime cancels it.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn post(
    client: &reqwest::Client,
    endpoint: &str,
    body: String,
) -> Result<(), TransmissionError> {
    let response = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                TransmissionError::Timeout
            } else {
                TransmissionError::Network(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransmissionError::Status(status.as_u16()));
    }
    Ok(())
}
