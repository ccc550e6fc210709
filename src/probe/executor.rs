use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::KbFuzzError;
use crate::models::{HttpMethod, HttpStatus, OutcomeRecord, Payload, RequestBody, StatusSentinel};
use crate::utils::truncate_preview;
use super::classifier::{classify, is_auth_blocked, ClassifierConfig};
use super::session::SessionCredential;
use super::transport::{ProbeRequest, RawResult, ResponseBody, Transport};

const ACCEPT: &str = "application/json, text/plain, */*";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Issues one operation and turns whatever happens into an [`OutcomeRecord`].
/// Nothing below this boundary escapes as an error.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: Arc<SessionCredential>,
    timeout: Duration,
    classifier: ClassifierConfig,
}

impl Executor {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        session: Arc<SessionCredential>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            timeout,
            classifier: ClassifierConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn session(&self) -> &Arc<SessionCredential> {
        &self.session
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, KbFuzzError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| KbFuzzError::Config(format!("invalid URL for path '{}': {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn headers_for(&self, body: &RequestBody, content_type: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), ACCEPT.to_string())];
        if let Some(credential) = self.session.current() {
            headers.push(("Authorization".to_string(), credential));
        }
        // Multipart bodies carry their own boundary content type.
        if !matches!(body, RequestBody::File(_)) {
            headers.push((
                "Content-Type".to_string(),
                content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            ));
        }
        headers
    }

    /// Send without recording. Used by discovery and cleanup calls whose
    /// results never enter the ledger.
    pub async fn send_raw(
        &self,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
    ) -> Result<RawResult, KbFuzzError> {
        let url = self.build_url(path, &[])?;
        let request = ProbeRequest {
            method,
            headers: self.headers_for(&body, None),
            url,
            body,
            timeout: self.timeout,
        };
        self.transport.send(&request).await
    }

    pub async fn execute(&self, payload: &Payload) -> OutcomeRecord {
        self.execute_capturing(payload).await.0
    }

    /// Like [`execute`](Self::execute), also handing back the parsed response
    /// body for callers that need to act on it (cleanup of created resources).
    pub async fn execute_capturing(&self, payload: &Payload) -> (OutcomeRecord, Option<Value>) {
        let preview = payload.preview();
        let url = match self.build_url(&payload.path, &payload.query) {
            Ok(url) => url,
            Err(e) => {
                let fallback = format!("{}{}", self.base_url, payload.path);
                return (self.execution_error(payload, fallback, e), None);
            }
        };

        let request = ProbeRequest {
            method: payload.method,
            headers: self.headers_for(&payload.body, payload.content_type.as_deref()),
            url: url.clone(),
            body: payload.body.clone(),
            timeout: self.timeout,
        };

        match self.transport.send(&request).await {
            Ok(raw) => {
                let record = self.record(payload, url.to_string(), preview, &raw);
                (record, raw.json().cloned())
            }
            Err(e) => (self.execution_error(payload, url.to_string(), e), None),
        }
    }

    fn record(
        &self,
        payload: &Payload,
        url: String,
        preview: Option<String>,
        raw: &RawResult,
    ) -> OutcomeRecord {
        let verdict = classify(raw, &self.classifier);
        let latency = raw.latency();

        let (http_status, response_preview, error) = match raw {
            RawResult::Response { status, body, .. } => {
                let body_preview = match body {
                    ResponseBody::Parsed(v) => Some(truncate_preview(&v.to_string())),
                    ResponseBody::Raw(text) => Some(text.clone()),
                    ResponseBody::None => None,
                };
                (HttpStatus::Code(*status), body_preview, None)
            }
            RawResult::TimedOut { .. } => (
                HttpStatus::Sentinel(StatusSentinel::Timeout),
                None,
                Some(format!("request exceeded {}s timeout", self.timeout.as_secs_f64())),
            ),
            RawResult::TransportFailure { error, .. } => (
                HttpStatus::Sentinel(StatusSentinel::ConnectionError),
                None,
                Some(error.clone()),
            ),
        };

        let api_code = raw.api_code();
        if verdict.is_bug {
            warn!(
                test = %payload.test_name,
                method = %payload.method,
                status = %http_status,
                api_code = ?api_code,
                bug_type = %verdict.bug_type,
                "Bug observed"
            );
        } else {
            debug!(
                test = %payload.test_name,
                method = %payload.method,
                status = %http_status,
                api_code = ?api_code,
                latency_ms = latency.as_millis() as u64,
                "Request completed"
            );
        }

        OutcomeRecord {
            test_name: payload.test_name.clone(),
            category: payload.category,
            method: payload.method,
            url,
            payload_preview: preview,
            http_status: Some(http_status),
            response_time_ms: latency.as_millis() as u64,
            api_code,
            api_message: raw.api_message(),
            response_preview,
            is_bug: verdict.is_bug,
            bug_type: verdict.bug_type,
            auth_blocked: !verdict.is_bug && is_auth_blocked(raw),
            error,
            execution_error: None,
            property: None,
            timestamp: Utc::now(),
        }
    }

    fn execution_error(
        &self,
        payload: &Payload,
        url: String,
        err: KbFuzzError,
    ) -> OutcomeRecord {
        warn!(test = %payload.test_name, error = %err, "Payload could not be executed");
        OutcomeRecord::execution_failure(payload, url, &err.to_string())
    }
}
