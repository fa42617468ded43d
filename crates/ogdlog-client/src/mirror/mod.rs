//! Analytics mirrors: optional copies of each event sent to a third-party
//! analytics service.
//!
//! The [`AnalyticsMirror`] trait lets the logger forward events without
//! depending on any particular SDK. Mirrors are fire-and-forget: the logger
//! calls them after an event is queued, logs any error, and moves on.
//!
//! # Mirror Lifecycle
//!
//! 1. Mirror is registered via `Logger::add_mirror()`
//! 2. `set_app_consts()` and `set_session_consts()` are called immediately
//! 3. `set_session_consts()` is called again whenever the user identity changes
//! 4. `mirror()` is called for each logged event while `status()` is `Ready`

use std::fmt;

use serde_json::Value;

use ogdlog_core::prelude::*;
use ogdlog_core::AppConfig;

mod firebase;
mod measurement;

pub use firebase::{AnalyticsSink, FirebaseMirror};
pub use measurement::{validate_event_name, MeasurementProtocolSink, GA4_COLLECT_URL};

/// Readiness of an analytics module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleStatus {
    #[default]
    Uninitialized,
    Preparing,
    Ready,
    Error,
}

impl ModuleStatus {
    pub fn is_ready(self) -> bool {
        self == ModuleStatus::Ready
    }
}

/// Receives a copy of every logged event.
///
/// Callbacks other than [`mirror`](AnalyticsMirror::mirror) have no-op
/// defaults. Mirrors must be `Send + Sync` so a logger can live on any thread.
pub trait AnalyticsMirror: Send + Sync + fmt::Debug {
    /// Name for diagnostics
    fn name(&self) -> &str;

    /// Events are only forwarded while this returns `Ready`
    fn status(&self) -> ModuleStatus;

    /// Static app identity
    fn set_app_consts(&self, _config: &AppConfig) {}

    /// Current user identity; `user_data` is already in its string form
    fn set_session_consts(&self, _user_id: Option<&str>, _user_data: Option<&str>) {}

    /// Forward one event
    fn mirror(&self, event_name: &str, params: Option<&Value>, sequence_index: u64) -> Result<()>;
}
