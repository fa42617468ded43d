//! Mock logging endpoint for integration testing
//!
//! Stands in for the HTTP collector at the [`Transport`] level: every request
//! the queue sends is handed to the test, which decides how it completes.
//!
//! # Reply Modes
//!
//! - **Manual** (default): each request waits until the test calls
//!   [`MockRequest::respond`] or [`MockRequest::fail`]. Use this to hold a
//!   batch in flight while more events are logged.
//! - **Auto**: every request completes immediately with a fixed status.
//!
//! Dropping a [`MockRequest`] without answering resolves it as a transport
//! failure, so a forgotten reply can never hang the queue.
//!
//! # Usage Example
//!
//! ```ignore
//! let (transport, mut endpoint) = MockEndpoint::new();
//! let queue = BatchQueue::new(transport, "http://mock/log.php", LogSettings::empty())?;
//!
//! queue.enqueue(record("a", 0));
//! let request = endpoint.recv_request().await.unwrap();
//! assert_eq!(request.indices(), vec![0]);
//! request.respond(200);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ogd_logger::{decode_batch, EventRecord, LogSettings, Transport, TransportResponse};
use tokio::sync::{mpsc, oneshot};

/// How the mock completes requests
#[derive(Debug, Clone, Copy)]
pub enum ReplyMode {
    Manual,
    Auto(u16),
}

/// One request received by the mock
pub struct MockRequest {
    pub url: String,
    pub body: String,
    reply: Option<oneshot::Sender<TransportResponse>>,
}

impl MockRequest {
    /// Decode the batch, assuming the given settings were used to encode it
    pub fn records_with(&self, settings: LogSettings) -> Vec<EventRecord> {
        decode_batch(&self.body, settings).expect("mock received an undecodable body")
    }

    /// Decode a plain-JSON batch
    pub fn records(&self) -> Vec<EventRecord> {
        self.records_with(LogSettings::empty())
    }

    /// Event sequence indices in the batch, in order
    pub fn indices(&self) -> Vec<u64> {
        self.records()
            .iter()
            .map(|r| r.event_sequence_index)
            .collect()
    }

    /// Event names in the batch, in order
    pub fn names(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.event_name).collect()
    }

    pub fn respond(mut self, status: u16) {
        self.complete(TransportResponse::completed(status, ""));
    }

    pub fn fail(mut self, message: &str) {
        self.complete(TransportResponse::failed(message));
    }

    fn complete(&mut self, response: TransportResponse) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(response);
        }
    }
}

/// Transport half, moved into the queue under test
pub struct MockTransport {
    requests: mpsc::UnboundedSender<MockRequest>,
    mode: ReplyMode,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Transport for MockTransport {
    async fn send(&self, url: &str, body: String) -> TransportResponse {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let response = match self.mode {
            ReplyMode::Auto(status) => {
                let _ = self.requests.send(MockRequest {
                    url: url.to_string(),
                    body,
                    reply: None,
                });
                TransportResponse::completed(status, "")
            }
            ReplyMode::Manual => {
                let (reply, response) = oneshot::channel();
                let _ = self.requests.send(MockRequest {
                    url: url.to_string(),
                    body,
                    reply: Some(reply),
                });
                response
                    .await
                    .unwrap_or_else(|_| TransportResponse::failed("mock request dropped"))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Test half: receives requests and observes concurrency
pub struct MockEndpoint {
    requests: mpsc::UnboundedReceiver<MockRequest>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockEndpoint {
    /// Default timeout for request reception
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Manual-reply mock
    pub fn new() -> (MockTransport, MockEndpoint) {
        Self::with_mode(ReplyMode::Manual)
    }

    pub fn with_mode(mode: ReplyMode) -> (MockTransport, MockEndpoint) {
        let (tx, rx) = mpsc::unbounded_channel();
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let transport = MockTransport {
            requests: tx,
            mode,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: max_in_flight.clone(),
        };
        let endpoint = MockEndpoint {
            requests: rx,
            max_in_flight,
        };
        (transport, endpoint)
    }

    /// Receive the next request with the default timeout
    pub async fn recv_request(&mut self) -> Option<MockRequest> {
        self.recv_request_with_timeout(Self::DEFAULT_TIMEOUT).await
    }

    /// Returns `None` if the timeout expires or the transport is gone
    pub async fn recv_request_with_timeout(&mut self, timeout: Duration) -> Option<MockRequest> {
        tokio::time::timeout(timeout, self.requests.recv())
            .await
            .ok()
            .flatten()
    }

    /// Non-blocking check for a request that has already arrived
    pub fn try_recv_request(&mut self) -> Option<MockRequest> {
        self.requests.try_recv().ok()
    }

    /// Highest number of simultaneous in-flight sends observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}
