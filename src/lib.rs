//! OGD Logger
//!
//! Client-side telemetry logger for games: events are formatted, batched and
//! posted to the OpenGameData logging endpoint, optionally mirrored to an
//! analytics service.
//!
//! ```ignore
//! use ogd_logger::prelude::*;
//!
//! let config = ogd_logger::core::load_config(Path::new("ogdlog.toml"))?;
//! let mut logger = Logger::connect(config)?;
//! logger.set_user_id(Some("player-1"), None);
//! logger.log(LogEvent::new("level_start").param("level", &3)?)?;
//! ```

pub use ogdlog_core as core;
pub use ogdlog_core::logging;

pub use ogdlog_client::*;
pub use ogdlog_core::{
    AppConfig, Error, EventRecord, LogEvent, LogSettings, Result, Session, SessionId,
};

/// Common imports for logger users
pub mod prelude {
    pub use ogdlog_client::{HttpTransport, Logger, Transport, TransportResponse};
    pub use ogdlog_core::{AppConfig, Error, LogEvent, LogSettings, Result};
}
