//! # ogdlog-client - Delivery Layer
//!
//! Everything that moves events off the device: the [`Logger`] facade, the
//! single-flight [`BatchQueue`], the [`Transport`] abstraction with its HTTP
//! implementation, and optional analytics mirrors.
//!
//! Depends on `ogdlog-core` for configuration, session state and formatting.

pub mod logger;
pub mod mirror;
pub mod payload;
pub mod queue;
pub mod transport;

pub use logger::Logger;
pub use mirror::{
    validate_event_name, AnalyticsMirror, AnalyticsSink, FirebaseMirror,
    MeasurementProtocolSink, ModuleStatus, GA4_COLLECT_URL,
};
pub use payload::{decode_batch, encode_batch};
pub use queue::{BatchQueue, QueueState};
pub use transport::{is_success_status, HttpTransport, LocalTransport, Transport, TransportResponse};
