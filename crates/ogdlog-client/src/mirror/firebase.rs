//! Firebase-style analytics mirror
//!
//! Keeps the same cache the Firebase web module keeps: the current user
//! identity, app constants folded into a set of default event parameters, and
//! the legacy option that copies the user id into every event. The actual
//! delivery goes through an [`AnalyticsSink`].

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use ogdlog_core::prelude::*;
use ogdlog_core::{AnalyticsConfig, AppConfig, DEFAULT_USER_ID_PARAMETER};

use super::{AnalyticsMirror, ModuleStatus};

/// The SDK surface a [`FirebaseMirror`] drives
pub trait AnalyticsSink: Send + Sync + fmt::Debug {
    fn set_user_id(&self, user_id: &str);

    fn set_user_properties(&self, properties: Map<String, Value>);

    fn log_event(&self, name: &str, params: Map<String, Value>) -> Result<()>;
}

#[derive(Debug, Default)]
struct Cache {
    user_id: Option<String>,
    user_data: Option<String>,
    app_version: Option<String>,
    app_flavor: Option<String>,
    log_version: Option<String>,
    /// Legacy: parameter name the user id is copied into
    user_id_parameter: Option<String>,
    default_parameters: Map<String, Value>,
}

/// Mirror that shapes events the way the Firebase module does
#[derive(Debug)]
pub struct FirebaseMirror<S> {
    sink: S,
    status: Mutex<ModuleStatus>,
    cache: Mutex<Cache>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: AnalyticsSink> FirebaseMirror<S> {
    /// Ready mirror with the default legacy `user_code` copy enabled
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            status: Mutex::new(ModuleStatus::Ready),
            cache: Mutex::new(Cache {
                user_id_parameter: Some(DEFAULT_USER_ID_PARAMETER.to_string()),
                ..Cache::default()
            }),
        }
    }

    pub fn from_config(sink: S, config: &AnalyticsConfig) -> Self {
        let mirror = Self::new(sink);
        mirror.configure_user_id_parameter(config.user_id_parameter());
        mirror
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn set_status(&self, status: ModuleStatus) {
        *lock(&self.status) = status;
    }

    /// Legacy option: copy the user id into `name` on every event; `None` disables
    pub fn configure_user_id_parameter(&self, name: Option<&str>) {
        let mut cache = lock(&self.cache);
        if let Some(old) = cache.user_id_parameter.take() {
            cache.default_parameters.remove(&old);
        }
        cache.user_id_parameter = name.map(str::to_string);
        self.sync_settings(&mut cache);
    }

    /// Parameter attached to every subsequent event
    pub fn set_default_param(&self, name: impl Into<String>, value: impl Into<Value>) {
        lock(&self.cache)
            .default_parameters
            .insert(name.into(), value.into());
    }

    /// Push the cached identity to the sink and refresh default parameters
    fn sync_settings(&self, cache: &mut Cache) {
        self.sink
            .set_user_id(cache.user_id.as_deref().unwrap_or_default());

        let mut properties = Map::new();
        properties.insert(
            "user_data".to_string(),
            Value::from(cache.user_data.clone().unwrap_or_default()),
        );
        self.sink.set_user_properties(properties);

        let app_consts = [
            ("app_version", cache.app_version.clone()),
            ("app_flavor", cache.app_flavor.clone()),
            ("log_version", cache.log_version.clone()),
        ];
        for (key, value) in app_consts {
            match value {
                Some(value) => cache.default_parameters.insert(key.to_string(), value.into()),
                None => cache.default_parameters.remove(key),
            };
        }

        if let Some(param) = cache.user_id_parameter.clone() {
            match cache.user_id.clone() {
                Some(user_id) => cache.default_parameters.insert(param, user_id.into()),
                None => cache.default_parameters.remove(&param),
            };
        }
    }

    fn event_params(
        cache: &Cache,
        params: Option<&Value>,
        sequence_index: u64,
    ) -> Map<String, Value> {
        let mut event = Map::new();
        event.insert("event_sequence_index".to_string(), sequence_index.into());
        event.extend(cache.default_parameters.clone());

        match params {
            Some(Value::Object(map)) => event.extend(map.clone()),
            Some(Value::Null) | None => {}
            Some(other) => {
                event.insert("event_data".to_string(), other.to_string().into());
            }
        }
        event
    }
}

impl<S: AnalyticsSink> AnalyticsMirror for FirebaseMirror<S> {
    fn name(&self) -> &str {
        "firebase"
    }

    fn status(&self) -> ModuleStatus {
        *lock(&self.status)
    }

    fn set_app_consts(&self, config: &AppConfig) {
        let mut cache = lock(&self.cache);
        cache.app_version = Some(config.app_version.clone());
        cache.app_flavor = config.app_branch.clone();
        cache.log_version = Some(config.log_version.clone());
        self.sync_settings(&mut cache);
    }

    fn set_session_consts(&self, user_id: Option<&str>, user_data: Option<&str>) {
        let mut cache = lock(&self.cache);
        cache.user_id = user_id.map(str::to_string);
        cache.user_data = user_data.map(str::to_string);
        self.sync_settings(&mut cache);
    }

    fn mirror(&self, event_name: &str, params: Option<&Value>, sequence_index: u64) -> Result<()> {
        let event = {
            let cache = lock(&self.cache);
            Self::event_params(&cache, params, sequence_index)
        };
        trace!(event_name, sequence_index, "Mirroring event to analytics");
        self.sink.log_event(event_name, event)
    }
}
