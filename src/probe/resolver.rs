use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::KbFuzzError;
use crate::models::{HttpMethod, RequestBody};
use super::classifier::NOT_FOUND_CODE;
use super::executor::Executor;
use super::transport::RawResult;

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}"));

/// True if the path still has unresolved `{placeholders}`.
pub fn has_unresolved(path: &str) -> bool {
    PLACEHOLDER.as_ref().map_or(false, |re| re.is_match(path))
}

/// Expand `{resource_id}` in a candidate template. Any other placeholder is
/// a configuration error.
pub fn expand_template(template: &str, resource_id: &str) -> Result<String, KbFuzzError> {
    let expanded = template.replace("{resource_id}", resource_id);
    if has_unresolved(&expanded) {
        return Err(KbFuzzError::Config(format!(
            "unresolved placeholder in candidate '{}'",
            template
        )));
    }
    Ok(expanded)
}

/// The endpoint bound for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEndpoint {
    pub path: String,
    pub index: usize,
    /// False when no candidate qualified and the first one was used.
    pub accepted: bool,
}

/// Outcome of a best-effort lookup that never gates anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    pub http_status: Option<u16>,
    pub api_code: Option<i64>,
    pub data: Option<Value>,
}

/// A candidate qualifies when it answered with parseable JSON whose
/// envelope does not say "not found". An envelope without a code counts as
/// found unless the HTTP status itself is 404.
pub fn is_accepted(raw: &RawResult) -> bool {
    if raw.json().is_none() {
        return false;
    }
    match raw.api_code() {
        Some(code) => code != NOT_FOUND_CODE,
        None => raw.status() != Some(404),
    }
}

pub struct EndpointResolver<'a> {
    executor: &'a Executor,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// Try each candidate in declared order; the first accepted one wins.
    /// Falls back to the first candidate when none qualifies.
    pub async fn resolve(
        &self,
        candidates: &[String],
        probe: &RequestBody,
    ) -> Result<ResolvedEndpoint, KbFuzzError> {
        let first = candidates.first()
            .ok_or_else(|| KbFuzzError::Config("no endpoint candidates to resolve".into()))?;

        for (index, path) in candidates.iter().enumerate() {
            match self.executor.send_raw(HttpMethod::Post, path, probe.clone()).await {
                Ok(raw) => {
                    let accepted = is_accepted(&raw);
                    info!(
                        candidate = %path,
                        status = ?raw.status(),
                        api_code = ?raw.api_code(),
                        accepted,
                        "Probed endpoint candidate"
                    );
                    if accepted {
                        return Ok(ResolvedEndpoint { path: path.clone(), index, accepted: true });
                    }
                }
                Err(e) => {
                    warn!(candidate = %path, error = %e, "Candidate probe failed");
                }
            }
        }

        warn!(fallback = %first, "No candidate accepted; using first candidate");
        Ok(ResolvedEndpoint { path: first.clone(), index: 0, accepted: false })
    }

    /// GET a path and summarise the envelope. `None` when the call could not
    /// be made or returned no JSON.
    pub async fn lookup(&self, path: &str) -> Option<ProbeSummary> {
        match self.executor.send_raw(HttpMethod::Get, path, RequestBody::Empty).await {
            Ok(raw) => {
                debug!(path = %path, status = ?raw.status(), api_code = ?raw.api_code(), "Lookup");
                let json = raw.json()?;
                Some(ProbeSummary {
                    http_status: raw.status(),
                    api_code: raw.api_code(),
                    data: json.get("data").cloned(),
                })
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Lookup failed");
                None
            }
        }
    }

    /// Confirm the resource under test exists. Informational only.
    pub async fn verify_resource(&self, path: &str) -> Option<ProbeSummary> {
        let summary = self.lookup(path).await;
        match &summary {
            Some(s) if s.api_code == Some(200) => {
                let name = s.data.as_ref()
                    .and_then(|d| d.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                info!(path = %path, name = %name, "Resource found");
            }
            Some(s) => warn!(path = %path, api_code = ?s.api_code, "Resource check did not confirm existence"),
            None => warn!(path = %path, "Resource check failed"),
        }
        summary
    }

    /// Report who the credential authenticates as. Informational only.
    pub async fn check_identity(&self, profile_path: &str) -> Option<String> {
        let summary = self.lookup(profile_path).await;
        match summary {
            Some(s) if s.api_code == Some(200) => {
                let username = s.data.as_ref()
                    .and_then(|d| d.get("username"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                info!(username = ?username, "Authenticated");
                username
            }
            Some(s) => {
                warn!(api_code = ?s.api_code, http_status = ?s.http_status, "Authentication may have issues");
                None
            }
            None => {
                warn!("Profile endpoint returned no JSON");
                None
            }
        }
    }
}
