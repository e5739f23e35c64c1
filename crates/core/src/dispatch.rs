//! Request dispatcher.
//!
//! Submits a built request to the engine's FHIR server as an upsert-by-id (`PUT
//! <server>/Bundle/<header id>`) and turns the HTTP outcome into a status entry. A non-2xx answer
//! is recorded, not raised; only a transport failure aborts job creation.

use crate::constants::{BUNDLE_PATH_SEGMENT, REQUEST_CONTENT_TYPE};
use crate::models::{now_millis, MatchRequest, StatusEntry};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// HTTP status returned by the engine's server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportStatus {
    pub code: u16,
    /// Status line text, for example `200 OK`.
    pub text: String,
}

impl TransportStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Outbound transport for request bundles.
#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// PUTs `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Dispatch`] when no HTTP response was obtained.
    async fn put_bundle(&self, url: &str, body: Vec<u8>) -> CoreResult<TransportStatus>;
}

/// [`MatchTransport`] over `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport; `timeout` of `None` keeps the client default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> CoreResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CoreError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MatchTransport for HttpTransport {
    async fn put_bundle(&self, url: &str, body: Vec<u8>) -> CoreResult<TransportStatus> {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::Dispatch(format!("PUT {url}: {e}")))?;

        let status = response.status();
        Ok(TransportStatus {
            code: status.as_u16(),
            text: status.to_string(),
        })
    }
}

/// Builds `<server>/Bundle/<id>` from a server endpoint that may or may not already name the
/// Bundle collection.
pub fn submission_url(server_endpoint: &str, message_id: &str) -> String {
    let collection = format!("/{BUNDLE_PATH_SEGMENT}");
    let mut url = server_endpoint.to_owned();

    if !url.ends_with('/') {
        if url.ends_with(&collection) {
            url.push('/');
        } else {
            url.push_str(&collection);
            url.push('/');
        }
    } else if !url.ends_with(&format!("{collection}/")) {
        url.push_str(BUNDLE_PATH_SEGMENT);
        url.push('/');
    }

    url.push_str(message_id);
    url
}

#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn MatchTransport>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn MatchTransport>) -> Self {
        Self { transport }
    }

    /// Submits `request` and returns the status entry describing the outcome.
    ///
    /// `submitted_on` is stamped immediately before the call is made.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the request has no message header id, and
    /// [`CoreError::Dispatch`] if the server could not be reached.
    pub async fn dispatch(
        &self,
        request: &mut MatchRequest,
        server_endpoint: &str,
    ) -> CoreResult<StatusEntry> {
        let correlation_id = request
            .correlation_id()
            .ok_or_else(|| CoreError::Validation("request message has no header id".into()))?
            .to_owned();
        let url = submission_url(server_endpoint, &correlation_id);
        let body = request.message.to_json_vec()?;

        request.submitted_on = Some(now_millis());
        let status = self.transport.put_bundle(&url, body).await?;

        if status.is_success() {
            info!(request_id = %correlation_id, status = %status.text, "Record match request sent");
            Ok(StatusEntry::request_sent(&status.text))
        } else {
            warn!(request_id = %correlation_id, status = %status.text, "Record matcher rejected request");
            Ok(StatusEntry::request_failed(&status.text))
        }
    }
}
