//! Batching queue behavior against the mock endpoint

use ogd_logger::{BatchQueue, LogSettings, QueueState};

use super::mock_endpoint::MockEndpoint;
use crate::{record, settle, TEST_ENDPOINT};

fn queue() -> (BatchQueue<super::mock_endpoint::MockTransport>, MockEndpoint) {
    let (transport, endpoint) = MockEndpoint::new();
    let queue = BatchQueue::new(transport, TEST_ENDPOINT, LogSettings::empty()).unwrap();
    (queue, endpoint)
}

fn queued_indices<T>(queue: &BatchQueue<T>) -> Vec<u64> {
    queue
        .snapshot()
        .iter()
        .map(|r| r.event_sequence_index)
        .collect()
}

#[tokio::test]
async fn test_single_record_delivered_and_queue_idles() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("start", 0));
    assert_eq!(queue.state(), QueueState::Pending);

    let request = endpoint.recv_request().await.expect("no request sent");
    assert_eq!(request.url, TEST_ENDPOINT);
    assert_eq!(request.indices(), vec![0]);
    assert_eq!(queue.state(), QueueState::Flushing);

    request.respond(200);
    settle().await;

    assert!(queue.is_empty());
    assert_eq!(queue.state(), QueueState::Idle);
    assert!(endpoint.try_recv_request().is_none());
}

#[tokio::test]
async fn test_same_turn_records_share_one_request() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    queue.enqueue(record("b", 1));

    let request = endpoint.recv_request().await.unwrap();
    assert_eq!(request.names(), vec!["a", "b"]);
    request.respond(200);
    settle().await;

    assert!(endpoint.try_recv_request().is_none());
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_enqueue_during_flight_survives_and_reflushes() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    queue.enqueue(record("b", 1));
    let first = endpoint.recv_request().await.unwrap();

    queue.enqueue(record("c", 2));
    settle().await;
    // Single flight: nothing new goes out while the first batch is pending
    assert!(endpoint.try_recv_request().is_none());
    assert_eq!(queued_indices(&queue), vec![0, 1, 2]);

    first.respond(200);
    let second = endpoint.recv_request().await.expect("no automatic re-flush");
    assert_eq!(second.indices(), vec![2]);
    assert_eq!(queued_indices(&queue), vec![2]);

    second.respond(204);
    settle().await;
    assert!(queue.is_empty());
    assert_eq!(endpoint.max_in_flight(), 1);
}

#[tokio::test]
async fn test_server_error_resubmits_batch_verbatim() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    queue.enqueue(record("b", 1));

    let first = endpoint.recv_request().await.unwrap();
    let first_body = first.body.clone();
    first.respond(500);

    let retry = endpoint.recv_request().await.expect("batch was not resubmitted");
    assert_eq!(retry.body, first_body);
    assert_eq!(queue.len(), 2);

    retry.respond(200);
    settle().await;
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_retry_picks_up_records_added_after_failure() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    let first = endpoint.recv_request().await.unwrap();

    queue.enqueue(record("b", 1));
    first.fail("connection reset");

    let retry = endpoint.recv_request().await.unwrap();
    assert_eq!(retry.indices(), vec![0, 1]);
    retry.respond(200);
    settle().await;
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_dropped_request_counts_as_failure() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    drop(endpoint.recv_request().await.unwrap());

    let retry = endpoint.recv_request().await.unwrap();
    assert_eq!(retry.indices(), vec![0]);
    retry.respond(302);
    settle().await;
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_client_error_status_keeps_batch() {
    let (queue, mut endpoint) = queue();
    queue.enqueue(record("a", 0));
    endpoint.recv_request().await.unwrap().respond(400);

    let retry = endpoint.recv_request().await.unwrap();
    assert_eq!(queue.len(), 1);
    retry.respond(0);
    settle().await;
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_base64_batches_decode_with_settings() {
    let (transport, mut endpoint) = MockEndpoint::new();
    let queue = BatchQueue::new(transport, TEST_ENDPOINT, LogSettings::default()).unwrap();
    queue.enqueue(record("a", 0));

    let request = endpoint.recv_request().await.unwrap();
    let records = request.records_with(LogSettings::default());
    assert_eq!(records, vec![record("a", 0)]);
    request.respond(200);
}
