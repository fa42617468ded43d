//! The logger facade the game talks to
//!
//! [`Logger`] owns everything one logging session needs: app configuration,
//! session identity, the game-state snapshot, the cached endpoint URL, the
//! batching queue and any analytics mirrors. All mutating calls are plain
//! synchronous methods; network work happens on the queue's runtime.

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;

use ogdlog_core::prelude::*;
use ogdlog_core::{
    build_endpoint, format_event, local_now, AppConfig, LogEvent, LogSettings, Session, SessionId,
};

use crate::mirror::{AnalyticsMirror, FirebaseMirror, MeasurementProtocolSink};
use crate::queue::BatchQueue;
use crate::transport::{HttpTransport, Transport};

pub struct Logger<T> {
    config: AppConfig,
    settings: LogSettings,
    session: Session,
    game_state: Option<Value>,
    /// Rebuilt whenever session or user identity changes
    endpoint: String,
    queue: BatchQueue<T>,
    mirrors: Vec<Box<dyn AnalyticsMirror>>,
}

impl<T> std::fmt::Debug for Logger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("app_id", &self.config.app_id)
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("queue", &self.queue)
            .field("mirrors", &self.mirrors)
            .finish()
    }
}

impl Logger<HttpTransport> {
    /// HTTP logger on the current runtime, with the GA4 mirror wired up when
    /// the config has an `[analytics]` section
    pub fn connect(config: AppConfig) -> Result<Self> {
        let analytics = config.analytics.clone();
        let mut logger = Self::new(config, HttpTransport::new())?;

        if let Some(analytics) = analytics {
            let sink = MeasurementProtocolSink::from_config(&analytics)?;
            logger.add_mirror(FirebaseMirror::from_config(sink, &analytics));
        }
        Ok(logger)
    }
}

impl<T> Logger<T>
where
    T: Transport + Sync + 'static,
{
    /// Logger with a fresh session, bound to the current tokio runtime
    pub fn new(config: AppConfig, transport: T) -> Result<Self> {
        Self::with_session(config, transport, Session::new())
    }

    pub fn with_session(config: AppConfig, transport: T, session: Session) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::runtime(e.to_string()))?;
        Self::with_runtime(config, transport, session, runtime)
    }

    /// Logger whose flushes run on `runtime`; `log` may then be called from
    /// any thread
    pub fn with_runtime(
        config: AppConfig,
        transport: T,
        session: Session,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let settings = config.log_settings();
        let endpoint = build_endpoint(&config, &session);
        let queue = BatchQueue::with_runtime(transport, endpoint.clone(), settings, runtime);

        info!(
            app_id = %config.app_id,
            session_id = session.id(),
            "OGD logger initialized"
        );

        Ok(Self {
            config,
            settings,
            session,
            game_state: None,
            endpoint,
            queue,
            mirrors: Vec::new(),
        })
    }

    /// Register a mirror and push the current app and session constants to it
    pub fn add_mirror(&mut self, mirror: impl AnalyticsMirror + 'static) {
        mirror.set_app_consts(&self.config);
        mirror.set_session_consts(
            self.session.user_id(),
            self.session.user_data_string().as_deref(),
        );
        debug!(mirror = mirror.name(), "Analytics mirror registered");
        self.mirrors.push(Box::new(mirror));
    }

    /// Set the player identity.
    ///
    /// Returns `false` and does nothing when the identity is unchanged.
    /// Otherwise the endpoint is rebuilt for subsequent flushes and mirrors
    /// are resynchronized.
    pub fn set_user_id(&mut self, user_id: Option<&str>, user_data: Option<Value>) -> bool {
        if !self.session.set_user(user_id.map(str::to_string), user_data) {
            return false;
        }

        self.refresh_endpoint();
        let user_data = self.session.user_data_string();
        for mirror in &self.mirrors {
            mirror.set_session_consts(self.session.user_id(), user_data.as_deref());
        }
        true
    }

    /// Start a new session: new identifier, counter back to zero.
    ///
    /// Already-queued records are neither flushed nor dropped and keep their
    /// sequence indices.
    pub fn reset_session(&mut self) -> SessionId {
        let id = self.session.reset();
        self.refresh_endpoint();
        info!(session_id = id, "Session reset");
        id
    }

    pub fn set_settings(&mut self, settings: LogSettings) {
        self.settings = settings;
        self.queue.set_settings(settings);
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.set_settings(self.settings.with_debug(debug));
    }

    /// Snapshot attached to every subsequent event
    pub fn set_game_state<S: Serialize + ?Sized>(&mut self, state: &S) -> Result<()> {
        self.game_state = Some(serde_json::to_value(state)?);
        Ok(())
    }

    pub fn clear_game_state(&mut self) {
        self.game_state = None;
    }

    /// Format an event, queue it and mirror it.
    ///
    /// Returns the sequence index the event was logged with. A formatting
    /// failure returns `Err` before anything is queued and leaves the counter
    /// untouched; mirror failures are logged and ignored.
    pub fn log(&mut self, event: LogEvent) -> Result<u64> {
        let index = self.session.next_sequence_index();
        let record = format_event(
            event.name(),
            event.params(),
            &self.session,
            self.game_state.as_ref(),
            index,
            local_now(),
        )?;
        self.session.advance_sequence();

        if self.settings.is_debug() {
            info!(event = event.name(), index, "Logging event");
        }
        self.queue.enqueue(record);

        for mirror in &self.mirrors {
            if !mirror.status().is_ready() {
                trace!(mirror = mirror.name(), "Mirror not ready; event skipped");
                continue;
            }
            if let Err(e) = mirror.mirror(event.name(), event.params(), index) {
                warn!(mirror = mirror.name(), event = event.name(), "Mirror failed: {}", e);
            }
        }

        Ok(index)
    }

    /// Shorthand for `log(LogEvent::new(name).with_params(params)?)`
    pub fn log_with<P: Serialize + ?Sized>(&mut self, name: &str, params: &P) -> Result<u64> {
        self.log(LogEvent::new(name).with_params(params)?)
    }

    /// Ask the queue to submit now instead of waiting for the scheduled flush
    pub fn flush(&self) {
        self.queue.flush();
    }

    fn refresh_endpoint(&mut self) {
        self.endpoint = build_endpoint(&self.config, &self.session);
        self.queue.set_endpoint(self.endpoint.clone());
    }
}

impl<T> Logger<T> {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> LogSettings {
        self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn game_state(&self) -> Option<&Value> {
        self.game_state.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn queue(&self) -> &BatchQueue<T> {
        &self.queue
    }

    pub fn mirrors(&self) -> impl Iterator<Item = &dyn AnalyticsMirror> {
        self.mirrors.iter().map(|m| m.as_ref())
    }
}
