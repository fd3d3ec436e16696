//! Demonstration of a simulated page lifetime.
//!
//! This example shows how to:
//! 1. Build a collector on the in-memory platform
//! 2. Feed page load, scroll, click and form events through a page scope
//! 3. Lose connectivity, queue events, and flush them on reconnect
//! 4. Send the unload beacon and tear the page down
//!
//! Run with: cargo run --example page_demo

use listgenie_analytics::{
    collector::{EventCollector, Platform},
    config::Config,
    platform::{ManualClock, MemoryStore, RecordingTransport},
    tracking::{FormSubmission, PageScope, PageView, TrackedClick, Viewport},
    transparency::create_shared_log,
    DATA_DECLARATION,
};

fn main() {
    println!("ListGenie Analytics - Page Demo");
    println!("===============================");
    println!();
    println!("{DATA_DECLARATION}");

    let transport = RecordingTransport::new();
    let local = MemoryStore::new();
    let clock = ManualClock::new(1_700_000_000_000);
    let log = create_shared_log();

    let platform = Platform::new(transport.clone(), local.clone(), MemoryStore::new())
        .with_clock(clock.clone());
    let collector = EventCollector::new(platform, true).with_transparency_log(log.clone());
    let config = Config::load().unwrap_or_default();
    let mut page = PageScope::new(collector).with_config(&config);

    let start = 1_700_000_000_000;
    page.load(
        &PageView {
            path: "/".into(),
            referrer: Some("https://www.google.com/".into()),
            user_agent: Some("page-demo".into()),
            viewport: Some(Viewport {
                width: 1440,
                height: 900,
            }),
        },
        start,
    );

    for scroll_y in [400.0, 1200.0, 800.0, 2100.0] {
        clock.advance(2_000);
        page.scroll(scroll_y, 3000.0, 900.0);
    }

    clock.advance(5_000);
    page.click(&TrackedClick {
        event_name: Some("cta_try_free".into()),
        text: Some("Try it free".into()),
        class_name: Some("btn btn-primary track".into()),
        href: Some("#preview".into()),
        element_type: None,
    });

    println!("Going offline...");
    page.offline();
    clock.advance(10_000);
    page.submit(&FormSubmission {
        id: Some("waitlist".into()),
        action: Some("/waitlist".into()),
        method: Some("post".into()),
        field_count: 1,
    });
    clock.set(start + 31_000);
    page.tick(start + 31_000);
    println!(
        "  Pending while offline: {}",
        page.collector().pending().len()
    );

    println!("Back online...");
    page.online();
    println!(
        "  Pending after flush: {}",
        page.collector().pending().len()
    );

    clock.set(start + 45_000);
    page.unload(start + 45_000);

    println!();
    println!("Requests sent:");
    for event in transport.sent() {
        println!("  {} {}", event.name(), serde_json::Value::Object(event.meta().clone()));
    }
    println!("Beacons sent:");
    for event in transport.beacons() {
        println!("  {} {}", event.name(), serde_json::Value::Object(event.meta().clone()));
    }

    println!();
    println!("{}", log.summary());
    println!();
    println!("Demo complete!");
}
