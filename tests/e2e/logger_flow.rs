//! Logger facade driven end to end: identity, sessions, game state, mirrors

use std::sync::{Arc, Mutex};

use ogd_logger::{
    AnalyticsSink, FirebaseMirror, LogEvent, LogSettings, Logger, ModuleStatus, Result, Session,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::mock_endpoint::{MockEndpoint, MockTransport, ReplyMode};
use crate::{settle, test_config};

const SESSION_ID: u64 = 26_09_19_09_30_00_42424;

fn logger(mode: ReplyMode) -> (Logger<MockTransport>, MockEndpoint) {
    let (transport, endpoint) = MockEndpoint::with_mode(mode);
    let logger = Logger::with_session(test_config(), transport, Session::with_id(SESSION_ID))
        .expect("logger construction failed");
    (logger, endpoint)
}

#[derive(Debug, Default, Clone)]
struct SharedSink {
    events: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
    user_ids: Arc<Mutex<Vec<String>>>,
}

impl AnalyticsSink for SharedSink {
    fn set_user_id(&self, user_id: &str) {
        self.user_ids.lock().unwrap().push(user_id.to_string());
    }

    fn set_user_properties(&self, _properties: Map<String, Value>) {}

    fn log_event(&self, name: &str, params: Map<String, Value>) -> Result<()> {
        self.events.lock().unwrap().push((name.to_string(), params));
        Ok(())
    }
}

#[derive(Serialize)]
struct Placement {
    tile: (u32, u32),
    kind: &'static str,
}

#[tokio::test]
async fn test_endpoint_carries_app_and_session_identity() {
    let (logger, _endpoint) = logger(ReplyMode::Auto(200));
    assert_eq!(
        logger.endpoint(),
        "http://mock.local/logger/log.php?app_id=BLOOM&app_version=2.4.1&appbranch=main\
         &log_version=3&session_id=26091909300042424"
    );
}

#[tokio::test]
async fn test_logged_events_arrive_with_identity_and_state() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Auto(200));
    logger.set_user_id(Some("kid#7"), Some(json!({"class": "4B"})));
    logger.set_game_state(&json!({"day": 3})).unwrap();

    let placement = Placement {
        tile: (4, 9),
        kind: "farm",
    };
    assert_eq!(logger.log_with("place_building", &placement).unwrap(), 0);
    assert_eq!(
        logger
            .log(LogEvent::new("inspect").param("tile", &[4, 9]).unwrap())
            .unwrap(),
        1
    );

    let request = endpoint.recv_request().await.unwrap();
    assert!(request
        .url
        .ends_with("&user_id=kid%237&user_data=%7B%22class%22%3A%224B%22%7D"));

    let records = request.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event_name, "place_building");
    assert_eq!(
        records[0].event_data.as_deref(),
        Some(r#"{"tile":[4,9],"kind":"farm"}"#)
    );
    assert_eq!(records[0].user_data.as_deref(), Some(r#"{"class":"4B"}"#));
    assert_eq!(records[0].game_state.as_deref(), Some(r#"{"day":3}"#));
    assert_eq!(records[1].event_data.as_deref(), Some(r#"{"tile":[4,9]}"#));

    settle().await;
    assert!(logger.queue().is_empty());
}

#[tokio::test]
async fn test_user_change_applies_to_next_flush_only() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Manual);
    logger.log(LogEvent::new("a")).unwrap();
    let first = endpoint.recv_request().await.unwrap();
    assert!(!first.url.contains("user_id"));

    logger.set_user_id(Some("p2"), None);
    logger.log(LogEvent::new("b")).unwrap();
    first.respond(200);

    let second = endpoint.recv_request().await.unwrap();
    assert!(second.url.ends_with("&user_id=p2"));
    assert_eq!(second.names(), vec!["b"]);
    second.respond(200);
}

#[tokio::test]
async fn test_reset_session_does_not_touch_queued_records() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Manual);
    logger.log(LogEvent::new("a")).unwrap();
    logger.log(LogEvent::new("b")).unwrap();
    let first = endpoint.recv_request().await.unwrap();
    first.respond(503);

    // The retry is already out when the session resets
    let retry = endpoint.recv_request().await.unwrap();
    let new_id = logger.reset_session();
    assert_ne!(new_id, SESSION_ID);
    assert_eq!(logger.queue().len(), 2);

    assert_eq!(logger.log(LogEvent::new("c")).unwrap(), 0);
    assert!(retry.url.contains(&format!("session_id={}", SESSION_ID)));
    assert_eq!(retry.indices(), vec![0, 1]);
    retry.respond(200);

    let next = endpoint.recv_request().await.unwrap();
    assert!(next.url.contains(&format!("session_id={}", new_id)));
    assert_eq!(next.indices(), vec![0]);
    next.respond(200);
}

#[tokio::test]
async fn test_settings_change_reaches_wire() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Auto(200));
    logger.set_settings(LogSettings::default());
    logger.log(LogEvent::new("a")).unwrap();

    let request = endpoint.recv_request().await.unwrap();
    assert!(request.body.starts_with("data="));
    assert_eq!(request.records_with(LogSettings::default())[0].event_name, "a");
}

#[tokio::test]
async fn test_firebase_mirror_sees_every_event() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Auto(200));
    let sink = SharedSink::default();
    logger.add_mirror(FirebaseMirror::new(sink.clone()));
    logger.set_user_id(Some("p9"), None);

    logger.log_with("level_start", &json!({"level": 2})).unwrap();
    logger.log_with("note", &"free text").unwrap();
    endpoint.recv_request().await.unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 2);

    let (name, params) = &events[0];
    assert_eq!(name, "level_start");
    assert_eq!(params["event_sequence_index"], 0);
    assert_eq!(params["level"], 2);
    assert_eq!(params["app_version"], "2.4.1");
    assert_eq!(params["app_flavor"], "main");
    assert_eq!(params["log_version"], "3");
    assert_eq!(params["user_code"], "p9");

    assert_eq!(events[1].1["event_data"], r#""free text""#);
    assert_eq!(sink.user_ids.lock().unwrap().last().unwrap(), "p9");
}

#[tokio::test]
async fn test_mirror_not_ready_is_skipped() {
    let (mut logger, _endpoint) = logger(ReplyMode::Auto(200));
    let sink = SharedSink::default();
    let mirror = FirebaseMirror::new(sink.clone());
    mirror.set_status(ModuleStatus::Preparing);
    logger.add_mirror(mirror);

    logger.log(LogEvent::new("a")).unwrap();
    assert!(sink.events.lock().unwrap().is_empty());
    assert_eq!(logger.queue().len(), 1);
}

#[tokio::test]
async fn test_flush_while_in_flight_is_ignored() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Manual);
    logger.log(LogEvent::new("a")).unwrap();
    let first = endpoint.recv_request().await.unwrap();

    logger.flush();
    logger.flush();
    settle().await;
    assert!(endpoint.try_recv_request().is_none());

    first.respond(200);
    settle().await;
    assert!(logger.queue().is_empty());
    assert_eq!(endpoint.max_in_flight(), 1);
}

#[tokio::test]
async fn test_string_user_data_is_raw_in_url_and_json_in_records() {
    let (mut logger, mut endpoint) = logger(ReplyMode::Auto(200));
    logger.set_user_id(Some("p3"), Some(json!("classroom-4")));
    logger.log(LogEvent::new("start")).unwrap();

    let request = endpoint.recv_request().await.unwrap();
    assert!(request.url.ends_with("&user_id=p3&user_data=classroom-4"));

    let records = request.records();
    let user_data = records[0].user_data.as_deref().unwrap();
    assert_eq!(user_data, r#""classroom-4""#);
    assert_eq!(serde_json::from_str::<Value>(user_data).unwrap(), json!("classroom-4"));
}
