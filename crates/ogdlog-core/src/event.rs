//! Event records and the formatter that builds them
//!
//! An [`EventRecord`] is the flat JSON object the OGD endpoint ingests. The
//! structured fields (`user_data`, `game_state`, `event_data`) are carried as
//! JSON *strings*, not nested objects: the endpoint decodes them twice.

use chrono::{DateTime, FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::session::Session;

/// One formatted, immutable telemetry event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_name: String,
    pub event_sequence_index: u64,
    pub client_time: String,
    pub client_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<String>,
}

/// A gameplay event as submitted by the caller, before formatting.
///
/// Parameters are converted to JSON at construction time, so a value that
/// cannot be serialized is rejected here rather than inside the queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogEvent {
    name: String,
    params: Option<Value>,
}

impl LogEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    /// Replace all parameters with the serialized form of `params`
    pub fn with_params<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    /// Add a single named parameter.
    ///
    /// If the parameters were previously set to a non-object value, they are
    /// replaced by an object holding just this entry.
    pub fn param<V: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &V) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        match &mut self.params {
            Some(Value::Object(map)) => {
                map.insert(key.into(), value);
            }
            _ => {
                let mut map = Map::new();
                map.insert(key.into(), value);
                self.params = Some(Value::Object(map));
            }
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }
}

/// Build an event record.
///
/// `now` supplies both the wall-clock reading and the local offset; callers
/// normally pass [`local_now`].
pub fn format_event(
    name: &str,
    params: Option<&Value>,
    session: &Session,
    game_state: Option<&Value>,
    sequence_index: u64,
    now: DateTime<FixedOffset>,
) -> Result<EventRecord> {
    Ok(EventRecord {
        event_name: name.to_string(),
        event_sequence_index: sequence_index,
        client_time: format_client_time(&now),
        client_offset: format_client_offset(now.offset().local_minus_utc()),
        user_data: session.user_data().map(serde_json::to_string).transpose()?,
        game_state: game_state.map(serde_json::to_string).transpose()?,
        event_data: params.map(serde_json::to_string).transpose()?,
    })
}

/// Current local time with its UTC offset
pub fn local_now() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(&now.offset().fix())
}

/// `YYYY-MM-DD HH:MM:SS.mmm` of the local clock followed by a literal `Z`.
///
/// The suffix does not mean UTC; downstream consumers already parse this
/// exact shape.
pub fn format_client_time(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

/// Signed `H:MM:SS` offset from UTC, each field truncated
pub fn format_client_offset(offset_seconds: i32) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let total = offset_seconds.unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}{}:{:02}:{:02}", sign, hours, minutes, seconds)
}
