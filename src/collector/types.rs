//! Analytics event types.
//!
//! An [`Event`] is built once by the collector and never mutated afterwards.
//! Its serde form is the wire contract POSTed to the collection endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form event metadata.
pub type Metadata = Map<String, Value>;

/// Event names emitted by the built-in producers.
pub mod names {
    pub const CLICK: &str = "click";
    pub const FORM_SUBMIT: &str = "form_submit";
    pub const PAGE_VIEW: &str = "page_view";
    pub const PERFORMANCE_METRICS: &str = "performance_metrics";
    pub const TIME_ON_PAGE: &str = "time_on_page";
    pub const TIME_ON_PAGE_INTERVAL: &str = "time_on_page_interval";
    pub const SCROLL_25: &str = "scroll_25";
    pub const SCROLL_50: &str = "scroll_50";
    pub const SCROLL_75: &str = "scroll_75";
    pub const SCROLL_100: &str = "scroll_100";
    /// Substituted when a producer passes an empty name.
    pub const FALLBACK: &str = "event";
}

/// One observed interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Category tag, e.g. `page_view`
    #[serde(rename = "event")]
    name: String,
    /// Producer-specific metadata
    #[serde(default)]
    meta: Metadata,
    /// Capture time in epoch milliseconds
    timestamp: i64,
    /// Page path at capture time
    path: String,
    /// Browsing session identifier
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        meta: Metadata,
        timestamp: i64,
        path: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            meta,
            timestamp,
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Encode as the JSON request body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Build a metadata map from key/value pairs.
///
/// ```
/// use listgenie_analytics::collector::types::meta;
/// use serde_json::json;
///
/// let m = meta([("tone", json!("friendly")), ("hasContent", json!(true))]);
/// assert_eq!(m["tone"], "friendly");
/// ```
pub fn meta<K, I>(pairs: I) -> Metadata
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let event = Event::new(
            "page_view",
            meta([("referrer", json!("https://example.com"))]),
            1_700_000_000_000,
            "/pricing",
            "session_1_abc",
        );

        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "page_view");
        assert_eq!(value["meta"]["referrer"], "https://example.com");
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert_eq!(value["path"], "/pricing");
        assert_eq!(value["sessionId"], "session_1_abc");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_missing_meta_defaults_to_empty() {
        let raw = r#"{"event":"click","timestamp":5,"path":"/","sessionId":"s"}"#;
        let event: Event = serde_json::from_str(raw).unwrap();
        assert!(event.meta().is_empty());
        assert_eq!(event.name(), "click");
    }
}
