//! ListGenie analytics CLI
//!
//! Records events, inspects the pending queue and flushes it on reconnect.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use listgenie_analytics::{
    collector::{queue, EventCollector, Metadata, Platform, SESSION_ID_KEY},
    config::Config,
    platform::{Connectivity, FileStore, HttpTransport, HttpTransportConfig, KeyValueStore},
    transparency::{create_shared_log_with_persistence, SharedTransparencyLog},
    DATA_DECLARATION, VERSION,
};

/// Extra time granted to in-flight requests beyond the request timeout.
const SETTLE_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "listgenie-beacon")]
#[command(author = "ListGenie")]
#[command(version = VERSION)]
#[command(about = "Best-effort analytics event collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one event
    Record {
        /// Event name, e.g. page_view
        name: String,

        /// Metadata entry as key=value (value parsed as JSON when possible)
        #[arg(long = "meta", short)]
        meta: Vec<String>,

        /// Page path stamped on the event
        #[arg(long, default_value = "/")]
        path: String,

        /// Use the durable beacon path
        #[arg(long)]
        beacon: bool,
    },

    /// Re-send every pending event
    Flush,

    /// List pending events
    Pending {
        /// Output format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Discard every pending event
    Clear,

    /// Show queue, session and delivery status
    Status,

    /// End the current session
    NewSession,

    /// Watch connectivity and flush the queue whenever it returns
    Watch {
        /// Seconds between connectivity probes
        #[arg(long, default_value = "5")]
        interval: u64,
    },

    /// Pause recording
    Pause,

    /// Resume recording
    Resume,

    /// Display the data declaration
    Declaration,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    init_tracing(&config);

    let result = match cli.command {
        Commands::Record {
            name,
            meta,
            path,
            beacon,
        } => cmd_record(&config, &name, &meta, &path, beacon),
        Commands::Flush => cmd_flush(&config),
        Commands::Pending { format } => cmd_pending(&config, &format),
        Commands::Clear => cmd_clear(&config),
        Commands::Status => cmd_status(&config),
        Commands::NewSession => cmd_new_session(&config),
        Commands::Watch { interval } => cmd_watch(&config, interval),
        Commands::Pause => cmd_set_paused(config, true),
        Commands::Resume => cmd_set_paused(config, false),
        Commands::Declaration => {
            println!("{DATA_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// A collector wired to the HTTP transport and the on-disk stores.
struct Session {
    collector: EventCollector,
    transport: HttpTransport,
    log: SharedTransparencyLog,
    settle_timeout: Duration,
}

impl Session {
    fn open(config: &Config) -> anyhow::Result<Self> {
        config.ensure_directories()?;

        let transport = HttpTransport::new(HttpTransportConfig::new(
            config.endpoint.clone(),
            config.request_timeout,
        ))
        .context("Failed to create HTTP transport")?;

        let online = transport.is_online();
        tracing::debug!("Endpoint reachable: {}", online);

        let log = create_shared_log_with_persistence(config.stats_path());
        let platform = Platform::new(
            transport.clone(),
            FileStore::new(config.local_store_path()),
            FileStore::new(config.session_store_path()),
        );
        let collector = EventCollector::new(platform, online).with_transparency_log(log.clone());

        Ok(Self {
            collector,
            transport,
            log,
            settle_timeout: config.request_timeout + SETTLE_GRACE,
        })
    }

    /// Wait for in-flight requests and queue whatever failed.
    fn settle(&mut self) {
        if !self.transport.wait_idle(self.settle_timeout) {
            tracing::warn!(
                "{} requests still in flight, giving up on them",
                self.transport.in_flight()
            );
        }
        self.collector.reclaim();
    }

    fn close(mut self) {
        self.settle();
        if let Err(e) = self.log.save() {
            eprintln!("Warning: Could not save delivery stats: {e}");
        }
    }
}

fn cmd_record(
    config: &Config,
    name: &str,
    meta: &[String],
    path: &str,
    beacon: bool,
) -> anyhow::Result<()> {
    if config.paused {
        println!("Recording is paused. Use 'listgenie-beacon resume' to continue.");
        return Ok(());
    }

    let meta = parse_meta(meta)?;
    let mut session = Session::open(config)?;
    let pending_before = session.collector.pending().len();

    session.collector.set_path(path);
    session.collector.record(name, meta, beacon);
    session.settle();

    let pending_after = session.collector.pending().len();
    let session_id = session.collector.session_id();
    session.close();

    if pending_after > pending_before {
        println!("Queued '{name}' for later delivery ({pending_after} pending)");
    } else {
        println!("Sent '{name}' (session {session_id})");
    }
    Ok(())
}

fn cmd_flush(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::open(config)?;
    let pending = session.collector.pending().len();

    if pending == 0 {
        println!("No pending events.");
        return Ok(());
    }
    if !session.collector.is_online() {
        println!("Endpoint unreachable, {pending} events stay queued.");
        return Ok(());
    }

    let sent = session.collector.flush();
    session.settle();
    let remaining = session.collector.pending().len();
    session.close();

    println!("Flushed {sent} of {pending} pending events ({remaining} still queued)");
    Ok(())
}

fn cmd_pending(config: &Config, format: &str) -> anyhow::Result<()> {
    let store = FileStore::new(config.local_store_path());
    let events = queue::load(&store)?;

    if events.is_empty() {
        println!("No pending events.");
        return Ok(());
    }

    if format == "jsonl" {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&events)?);
    }
    Ok(())
}

fn cmd_clear(config: &Config) -> anyhow::Result<()> {
    let store = FileStore::new(config.local_store_path());
    let count = queue::load(&store).map(|events| events.len()).unwrap_or(0);
    store.remove(queue::PENDING_QUEUE_KEY)?;
    println!("Discarded {count} pending events.");
    Ok(())
}

fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("ListGenie Analytics Status");
    println!("==========================");
    println!();

    println!("Configuration:");
    println!("  Endpoint: {}", config.endpoint);
    println!("  Request timeout: {}s", config.request_timeout.as_secs());
    println!("  Paused: {}", config.paused);
    println!();

    let local = FileStore::new(config.local_store_path());
    match queue::load(&local) {
        Ok(events) => println!("Pending events: {}", events.len()),
        Err(e) => println!("Pending events: unreadable ({e})"),
    }

    let sessions = FileStore::new(config.session_store_path());
    match sessions.get(SESSION_ID_KEY) {
        Ok(Some(id)) => println!("Current session: {id}"),
        Ok(None) => println!("Current session: none"),
        Err(e) => println!("Current session: unreadable ({e})"),
    }
    println!();

    if config.stats_path().exists() {
        let log = create_shared_log_with_persistence(config.stats_path());
        println!("{}", log.summary());
    } else {
        println!("No delivery statistics found.");
    }
    Ok(())
}

fn cmd_new_session(config: &Config) -> anyhow::Result<()> {
    let sessions = FileStore::new(config.session_store_path());
    sessions.remove(SESSION_ID_KEY)?;
    println!("Session ended. The next event starts a new session.");
    Ok(())
}

fn cmd_watch(config: &Config, interval: u64) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let mut session = Session::open(config)?;
    let interval = Duration::from_secs(interval.max(1));

    println!(
        "Watching {} (probe every {}s). Press Ctrl+C to stop.",
        config.endpoint,
        interval.as_secs()
    );
    println!(
        "  Connectivity: {}",
        if session.collector.is_online() {
            "online"
        } else {
            "offline"
        }
    );
    println!("  Pending events: {}", session.collector.pending().len());

    if session.collector.is_online() && !session.collector.pending().is_empty() {
        session.collector.notify_online();
        session.settle();
    }

    let mut last_probe = Instant::now();
    while running.load(Ordering::SeqCst) {
        if last_probe.elapsed() < interval {
            thread::sleep(Duration::from_millis(100));
            continue;
        }
        last_probe = Instant::now();
        session.collector.reclaim();

        let online = session.transport.is_online();
        if online == session.collector.is_online() {
            continue;
        }

        if online {
            let pending = session.collector.pending().len();
            println!("[{}] Back online, flushing {pending} events", timestamp());
            session.collector.notify_online();
            session.settle();
            println!(
                "[{}] {} events still queued",
                timestamp(),
                session.collector.pending().len()
            );
        } else {
            println!("[{}] Endpoint unreachable", timestamp());
            session.collector.notify_offline();
        }
    }

    println!();
    println!("Stopping watch...");
    let summary = session.log.summary();
    session.close();
    println!("{summary}");
    Ok(())
}

fn cmd_set_paused(mut config: Config, paused: bool) -> anyhow::Result<()> {
    config.paused = paused;
    config.save()?;
    if paused {
        println!("Recording paused. Use 'listgenie-beacon resume' to continue.");
    } else {
        println!("Recording resumed.");
    }
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Parse `key=value` pairs; values that are not valid JSON are kept as strings.
fn parse_meta(pairs: &[String]) -> anyhow::Result<Metadata> {
    let mut meta = Metadata::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid metadata '{pair}', expected key=value"))?;
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        meta.insert(key.trim().to_string(), value);
    }
    Ok(meta)
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_values() {
        let meta = parse_meta(&[
            "tone=luxury".to_string(),
            "hasContent=true".to_string(),
            "count=3".to_string(),
        ])
        .unwrap();

        assert_eq!(meta["tone"], "luxury");
        assert_eq!(meta["hasContent"], true);
        assert_eq!(meta["count"], 3);
    }

    #[test]
    fn test_parse_meta_rejects_missing_separator() {
        assert!(parse_meta(&["novalue".to_string()]).is_err());
    }
}
