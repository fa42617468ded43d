//! GA4 Measurement Protocol sink
//!
//! Native stand-in for the Firebase web SDK: events go out as individual
//! fire-and-forget POSTs to the Measurement Protocol collect endpoint.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use serde_json::{json, Map, Value};
use tokio::runtime::Handle;

use ogdlog_core::prelude::*;
use ogdlog_core::AnalyticsConfig;

use super::AnalyticsSink;

pub const GA4_COLLECT_URL: &str = "https://www.google-analytics.com/mp/collect";

/// RFC 3986 unreserved characters pass through
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const MAX_EVENT_NAME_LEN: usize = 40;
const RESERVED_PREFIXES: [&str; 3] = ["firebase_", "google_", "ga_"];

/// Check an event name against GA4 naming rules
pub fn validate_event_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_EVENT_NAME_LEN {
        return Err(Error::mirror(format!(
            "event name must be 1-{} characters: {:?}",
            MAX_EVENT_NAME_LEN, name
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(Error::mirror(format!(
            "event name must start with a letter: {:?}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::mirror(format!(
            "event name may only contain letters, digits and underscores: {:?}",
            name
        )));
    }
    if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return Err(Error::mirror(format!("event name uses a reserved prefix: {:?}", name)));
    }
    Ok(())
}

/// Parameter values must be scalars; anything nested is sent as JSON text
fn scalarize(params: Map<String, Value>) -> Map<String, Value> {
    params
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Array(_) | Value::Object(_) => Some((key, Value::from(value.to_string()))),
            scalar => Some((key, scalar)),
        })
        .collect()
}

fn generate_client_id() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}.{}", rand::thread_rng().gen::<u32>(), seconds)
}

#[derive(Debug)]
pub struct MeasurementProtocolSink {
    http: reqwest::Client,
    collect_url: String,
    client_id: String,
    user_id: Mutex<Option<String>>,
    user_properties: Mutex<Map<String, Value>>,
    runtime: Handle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MeasurementProtocolSink {
    /// Sink bound to the current tokio runtime
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::runtime(e.to_string()))?;
        Ok(Self::with_runtime(config, runtime))
    }

    pub fn with_runtime(config: &AnalyticsConfig, runtime: Handle) -> Self {
        Self {
            http: reqwest::Client::new(),
            collect_url: collect_url(GA4_COLLECT_URL, config),
            client_id: generate_client_id(),
            user_id: Mutex::new(None),
            user_properties: Mutex::new(Map::new()),
            runtime,
        }
    }

    /// Post to a different collect endpoint, e.g. `/debug/mp/collect`
    pub fn with_collect_base(mut self, base: &str, config: &AnalyticsConfig) -> Self {
        self.collect_url = collect_url(base, config);
        self
    }

    pub fn collect_url(&self) -> &str {
        &self.collect_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Request body for one event, with the current user identity
    pub fn request_body(&self, name: &str, params: Map<String, Value>) -> Value {
        let mut body = json!({
            "client_id": self.client_id,
            "events": [{ "name": name, "params": scalarize(params) }],
        });

        if let Some(user_id) = lock(&self.user_id).clone() {
            body["user_id"] = Value::from(user_id);
        }

        let properties = lock(&self.user_properties);
        if !properties.is_empty() {
            let wrapped: Map<String, Value> = properties
                .iter()
                .map(|(key, value)| (key.clone(), json!({ "value": value })))
                .collect();
            body["user_properties"] = Value::Object(wrapped);
        }
        body
    }
}

fn collect_url(base: &str, config: &AnalyticsConfig) -> String {
    format!(
        "{}?measurement_id={}&api_secret={}",
        base,
        utf8_percent_encode(&config.measurement_id, QUERY_SET),
        utf8_percent_encode(&config.api_secret, QUERY_SET)
    )
}

impl AnalyticsSink for MeasurementProtocolSink {
    fn set_user_id(&self, user_id: &str) {
        *lock(&self.user_id) = (!user_id.is_empty()).then(|| user_id.to_string());
    }

    /// Empty or null values clear the property
    fn set_user_properties(&self, properties: Map<String, Value>) {
        let mut current = lock(&self.user_properties);
        for (key, value) in properties {
            match value {
                Value::Null => current.remove(&key),
                Value::String(ref text) if text.is_empty() => current.remove(&key),
                value => current.insert(key, value),
            };
        }
    }

    fn log_event(&self, name: &str, params: Map<String, Value>) -> Result<()> {
        validate_event_name(name)?;

        let body = self.request_body(name, params);
        let request = self.http.post(&self.collect_url).json(&body);
        let event_name = name.to_string();

        self.runtime.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    trace!(%event_name, "Analytics event accepted");
                }
                Ok(resp) => {
                    warn!(%event_name, status = resp.status().as_u16(), "Analytics collect rejected event");
                }
                Err(e) => {
                    warn!(%event_name, "Analytics collect failed: {}", e);
                }
            }
        });
        Ok(())
    }
}
