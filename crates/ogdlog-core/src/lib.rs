//! # ogdlog-core - Core Domain Types
//!
//! Foundation crate for the OGD logger. Provides configuration, session state,
//! endpoint construction, event formatting, and error handling.
//!
//! This crate has **zero internal dependencies** and does no I/O beyond
//! reading configuration and installing the tracing subscriber.
//!
//! ## Public API
//!
//! ### Configuration (`config`, `settings`)
//! - [`AppConfig`] - App identity, endpoint, settings and analytics sections
//! - [`load_config()`] - Load and validate `ogdlog.toml`
//! - [`LogSettings`] - Debug / base64 bit flags
//!
//! ### Session (`session`)
//! - [`Session`] - Session id, user identity, event sequence counter
//! - [`generate_session_id()`] - 17-digit time-plus-random identifier
//!
//! ### Endpoint (`endpoint`)
//! - [`build_endpoint()`] - Percent-encoded logging URL for a config and session
//!
//! ### Events (`event`)
//! - [`LogEvent`] - Caller-side event with parameters
//! - [`EventRecord`] - Formatted wire record
//! - [`format_event()`] - Build a record from an event, session and game state
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with a `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use ogdlog_core::prelude::*;
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod logging;
pub mod session;
pub mod settings;

/// Prelude for common imports used throughout the OGD logger crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use config::{
    load_config, parse_config, AnalyticsConfig, AppConfig, SettingsConfig,
    DEFAULT_USER_ID_PARAMETER, OGD_LOG_ENDPOINT,
};
pub use endpoint::build_endpoint;
pub use error::{Error, Result, ResultExt};
pub use event::{
    format_client_offset, format_client_time, format_event, local_now, EventRecord, LogEvent,
};
pub use session::{generate_session_id, session_id_from_parts, Session, SessionId};
pub use settings::LogSettings;
