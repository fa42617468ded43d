//! Transport for submitting batches to the logging endpoint
//!
//! The batching queue only needs one operation: POST a body to a URL and learn
//! whether it worked. [`Transport`] captures that; [`HttpTransport`] is the
//! production implementation over `reqwest`.

use reqwest::header::CONTENT_TYPE;

use ogdlog_core::prelude::*;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Outcome of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse {
    /// The request completed with an HTTP status (0 = no network status,
    /// e.g. a local file or test harness)
    Completed { status: u16, body: String },
    /// The request never produced a status
    Failed { message: String },
}

impl TransportResponse {
    pub fn completed(status: u16, body: impl Into<String>) -> Self {
        Self::Completed {
            status,
            body: body.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Completed { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status().is_some_and(is_success_status)
    }
}

/// Status `0` and the 2xx–3xx range count as delivered
pub fn is_success_status(status: u16) -> bool {
    status == 0 || (200..400).contains(&status)
}

/// Batch submission
///
/// Implementations must resolve exactly once per call, including on
/// network-level failure (as [`TransportResponse::Failed`]).
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// POST `body` to `url`
    async fn send(&self, url: &str, body: String) -> TransportResponse;
}

/// Form-encoded POST over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, custom TLS, timeouts)
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: &str, body: String) -> TransportResponse {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_else(|e| {
                    debug!("Could not read response body: {}", e);
                    String::new()
                });
                TransportResponse::completed(status, body)
            }
            Err(e) => {
                debug!(?e, "POST to logging endpoint failed");
                TransportResponse::failed(e.to_string())
            }
        }
    }
}
