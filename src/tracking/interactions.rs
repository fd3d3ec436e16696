//! Metadata builders for page interactions.
//!
//! Each type describes what the host observed. Its `meta()` turns that into
//! event metadata, leaving out whatever the host could not supply.

use crate::collector::types::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn insert_opt(meta: &mut Metadata, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        meta.insert(key.to_string(), value.into());
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// What is known about a page when it loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageView {
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
}

impl PageView {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn meta(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("path".into(), json!(self.path));
        insert_opt(&mut meta, "referrer", self.referrer.clone());
        insert_opt(&mut meta, "userAgent", self.user_agent.clone());
        if let Some(viewport) = self.viewport {
            meta.insert(
                "viewport".into(),
                json!({ "width": viewport.width, "height": viewport.height }),
            );
        }
        meta
    }
}

/// A clicked element flagged for tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedClick {
    /// Event-name annotation on the element
    pub event_name: Option<String>,
    pub text: Option<String>,
    pub class_name: Option<String>,
    pub href: Option<String>,
    /// Element type attribute
    pub element_type: Option<String>,
}

impl TrackedClick {
    /// The annotated event name, or `click`.
    pub fn event_name(&self) -> &str {
        match self.event_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => crate::collector::names::CLICK,
        }
    }

    pub fn meta(&self) -> Metadata {
        let mut meta = Metadata::new();
        insert_opt(&mut meta, "buttonText", self.text.as_deref().map(str::trim));
        insert_opt(&mut meta, "buttonClass", self.class_name.clone());
        insert_opt(&mut meta, "href", self.href.clone());
        let element_type = self.element_type.as_deref().unwrap_or("button");
        meta.insert("buttonType".into(), json!(element_type));
        meta
    }
}

/// A submitted form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub field_count: usize,
}

impl FormSubmission {
    pub fn meta(&self) -> Metadata {
        let mut meta = Metadata::new();
        let id = match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => "unknown",
        };
        meta.insert("formId".into(), json!(id));
        insert_opt(&mut meta, "formAction", self.action.clone());
        insert_opt(&mut meta, "formMethod", self.method.clone());
        meta.insert("fieldCount".into(), json!(self.field_count));
        meta
    }
}

/// Navigation timing marks, in milliseconds relative to navigation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationTiming {
    pub fetch_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub dom_content_loaded_event_start: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_start: f64,
    pub load_event_end: f64,
}

impl NavigationTiming {
    /// Phase durations reported as `performance_metrics`.
    pub fn meta(&self) -> Metadata {
        let mut meta = Metadata::new();
        let phases = [
            ("dns", self.domain_lookup_end - self.domain_lookup_start),
            ("tcp", self.connect_end - self.connect_start),
            ("ttfb", self.response_start - self.request_start),
            (
                "domLoad",
                self.dom_content_loaded_event_end - self.dom_content_loaded_event_start,
            ),
            ("loadComplete", self.load_event_end - self.load_event_start),
            ("total", self.load_event_end - self.fetch_start),
        ];
        for (key, value) in phases {
            meta.insert(key.into(), json!(value));
        }
        meta
    }
}
