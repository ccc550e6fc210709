use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tracing::trace;

use crate::errors::KbFuzzError;
use crate::models::{HttpMethod, RequestBody};
use crate::utils::{truncate_error, truncate_preview};

/// A fully built request, ready for the wire.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Duration,
}

/// Response body as observed: parsed JSON, raw (truncated) text, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Parsed(Value),
    Raw(String),
    None,
}

/// What came back from a single network call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Response {
        status: u16,
        latency: Duration,
        body: ResponseBody,
    },
    TimedOut {
        latency: Duration,
    },
    TransportFailure {
        error: String,
        latency: Duration,
    },
}

impl RawResult {
    pub fn latency(&self) -> Duration {
        match self {
            RawResult::Response { latency, .. }
            | RawResult::TimedOut { latency }
            | RawResult::TransportFailure { latency, .. } => *latency,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RawResult::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            RawResult::Response { body: ResponseBody::Parsed(v), .. } => Some(v),
            _ => None,
        }
    }

    /// Envelope `code`, when the body is a JSON object carrying one.
    pub fn api_code(&self) -> Option<i64> {
        self.json().and_then(|v| v.get("code")).and_then(Value::as_i64)
    }

    pub fn api_message(&self) -> Option<String> {
        self.json()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// The network seam. `Err` means the request could not be issued at all;
/// timeouts and transport failures come back as `Ok` results.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResult, KbFuzzError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, KbFuzzError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn failure_from(err: reqwest::Error, latency: Duration) -> RawResult {
    if err.is_timeout() {
        RawResult::TimedOut { latency }
    } else {
        RawResult::TransportFailure { error: truncate_error(&err.to_string()), latency }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResult, KbFuzzError> {
        let mut builder = self.client
            .request(to_method(request.method), request.url.clone())
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
            RequestBody::Text(text) => builder.body(text.clone()),
            RequestBody::File(file) => {
                let part = Part::bytes(file.bytes.as_ref().clone())
                    .file_name(file.filename.clone())
                    .mime_str(&file.mime_type)?;
                builder.multipart(Form::new().part("file", part))
            }
        };

        let request_obj = builder.build()?;
        let started = Instant::now();
        let response = match self.client.execute(request_obj).await {
            Ok(resp) => resp,
            Err(e) => return Ok(failure_from(e, started.elapsed())),
        };

        let status = response.status().as_u16();
        let is_json = response.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.contains("json"));

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Ok(failure_from(e, started.elapsed())),
        };
        let latency = started.elapsed();
        trace!(url = %request.url, status, latency_ms = latency.as_millis() as u64, "Response received");

        let body = if is_json {
            match serde_json::from_str::<Value>(&text) {
                Ok(v) => ResponseBody::Parsed(v),
                Err(_) => ResponseBody::Raw(truncate_preview(&text)),
            }
        } else if text.is_empty() {
            ResponseBody::None
        } else {
            ResponseBody::Raw(truncate_preview(&text))
        };

        Ok(RawResult::Response { status, latency, body })
    }
}
