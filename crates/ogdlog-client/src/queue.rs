//! Batching queue with single-flight flushing
//!
//! Records accumulate in FIFO order. The first enqueue after an idle period
//! spawns a deferred flush on the runtime, so every record logged in the same
//! turn lands in one batch. A flush submits everything queued at that moment
//! and remembers only the *count* `N`; records enqueued while the request is in
//! flight are left alone. On success the first `N` records are dropped; on
//! failure nothing is dropped. Either way the queue immediately tries to flush
//! again, which starts the next round or settles back to idle.
//!
//! ```text
//!   Idle ──enqueue──▶ Pending ──flush──▶ Flushing ──complete──▶ flush()
//!    ▲                                                            │
//!    └──────────────────────── queue empty ◀──────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;

use ogdlog_core::prelude::*;
use ogdlog_core::{EventRecord, LogSettings};

use crate::payload::encode_batch;
use crate::transport::{Transport, TransportResponse};

/// Observable queue state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing queued, nothing scheduled
    Idle,
    /// Records queued; a flush is scheduled or about to be
    Pending,
    /// A submission is in flight
    Flushing,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<EventRecord>,
    endpoint: String,
    settings: LogSettings,
    /// Single-flight guard
    flushing: bool,
    /// Pending-trigger token; at most one deferred flush exists
    scheduled: bool,
}

/// FIFO batch queue feeding a [`Transport`]
///
/// Cloning yields another handle to the same queue.
pub struct BatchQueue<T> {
    inner: Arc<Mutex<Inner>>,
    transport: Arc<T>,
    runtime: Handle,
}

impl<T> Clone for BatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            transport: Arc::clone(&self.transport),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BatchQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("BatchQueue")
            .field("len", &inner.records.len())
            .field("flushing", &inner.flushing)
            .field("scheduled", &inner.scheduled)
            .finish()
    }
}

impl<T> BatchQueue<T> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the queue half-updated:
        // every critical section is a single push, drain or flag write.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of queued records, including any in flight
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.lock().flushing
    }

    pub fn is_scheduled(&self) -> bool {
        self.lock().scheduled
    }

    pub fn state(&self) -> QueueState {
        let inner = self.lock();
        if inner.flushing {
            QueueState::Flushing
        } else if inner.scheduled || !inner.records.is_empty() {
            QueueState::Pending
        } else {
            QueueState::Idle
        }
    }

    /// Copy of the queued records, oldest first
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// URL used by the next flush
    pub fn endpoint(&self) -> String {
        self.lock().endpoint.clone()
    }

    /// Point subsequent flushes at a new URL; an in-flight request keeps its URL
    pub fn set_endpoint(&self, endpoint: impl Into<String>) {
        self.lock().endpoint = endpoint.into();
    }

    pub fn settings(&self) -> LogSettings {
        self.lock().settings
    }

    pub fn set_settings(&self, settings: LogSettings) {
        self.lock().settings = settings;
    }
}

impl<T> BatchQueue<T>
where
    T: Transport + Sync + 'static,
{
    /// Create a queue bound to the current tokio runtime.
    ///
    /// Fails when called outside a runtime; use [`BatchQueue::with_runtime`]
    /// to bind to a runtime owned elsewhere.
    pub fn new(transport: T, endpoint: impl Into<String>, settings: LogSettings) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::runtime(e.to_string()))?;
        Ok(Self::with_runtime(transport, endpoint, settings, runtime))
    }

    /// Create a queue that spawns its flushes on `runtime`.
    ///
    /// `enqueue` may then be called from any thread, including a game loop
    /// that is not a runtime worker.
    pub fn with_runtime(
        transport: T,
        endpoint: impl Into<String>,
        settings: LogSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: VecDeque::new(),
                endpoint: endpoint.into(),
                settings,
                flushing: false,
                scheduled: false,
            })),
            transport: Arc::new(transport),
            runtime,
        }
    }

    /// Append a record and make sure a flush will pick it up.
    ///
    /// Never blocks on the network. If a flush is already scheduled or in
    /// flight, the record simply waits for it.
    pub fn enqueue(&self, record: EventRecord) {
        let schedule = {
            let mut inner = self.lock();
            inner.records.push_back(record);
            if inner.scheduled || inner.flushing {
                false
            } else {
                inner.scheduled = true;
                true
            }
        };

        if schedule {
            let queue = self.clone();
            self.runtime.spawn(async move {
                queue.flush();
            });
        }
    }

    /// Submit everything queued, unless a submission is already in flight.
    ///
    /// Safe to call at any time; a call while idle or flushing does nothing.
    pub fn flush(&self) {
        let (url, body, batch_len, debug) = {
            let mut inner = self.lock();
            inner.scheduled = false;

            if inner.flushing || inner.records.is_empty() {
                return;
            }

            // EventRecord holds only strings and integers, which serde_json
            // always serializes; the next enqueue re-arms the flush if it ever fails.
            let body = match encode_batch(inner.records.iter(), inner.settings) {
                Ok(body) => body,
                Err(e) => {
                    error!("Failed to encode batch of {}: {}", inner.records.len(), e);
                    return;
                }
            };

            inner.flushing = true;
            (
                inner.endpoint.clone(),
                body,
                inner.records.len(),
                inner.settings.is_debug(),
            )
        };

        if debug {
            info!(batch_len, %url, body_len = body.len(), "Posting batch");
        } else {
            trace!(batch_len, %url, "Posting batch");
        }

        let queue = self.clone();
        self.runtime.spawn(async move {
            let response = queue.transport.send(&url, body).await;
            queue.complete(batch_len, &response);
            queue.flush();
        });
    }

    /// Apply the result of the submission that covered the first `batch_len` records
    fn complete(&self, batch_len: usize, response: &TransportResponse) {
        let mut inner = self.lock();

        if response.is_success() {
            let removed = batch_len.min(inner.records.len());
            inner.records.drain(..removed);
            if inner.settings.is_debug() {
                if let TransportResponse::Completed { status, body } = response {
                    info!(removed, status, response = %body, "Batch delivered");
                }
            } else {
                debug!(removed, remaining = inner.records.len(), "Batch delivered");
            }
        } else {
            match response {
                TransportResponse::Completed { status, .. } => {
                    warn!(status, batch_len, "Logging endpoint returned error status; batch kept for retry");
                }
                TransportResponse::Failed { message } => {
                    warn!(batch_len, "Logging request failed: {}; batch kept for retry", message);
                }
            }
        }

        inner.flushing = false;
    }
}
