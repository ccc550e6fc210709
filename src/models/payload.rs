use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::category::Category;
use crate::utils::truncation::truncate_preview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

/// Methods the random-endpoint property draws from.
pub const FUZZ_METHODS: [HttpMethod; 6] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Delete,
    HttpMethod::Patch,
    HttpMethod::Options,
];

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file submitted as a multipart upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Arc<Vec<u8>>,
}

/// The opaque value a payload carries.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    File(FileUpload),
}

impl RequestBody {
    /// Bounded preview for the ledger. `None` for an empty body.
    pub fn preview(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(v) => Some(truncate_preview(&v.to_string())),
            RequestBody::Text(t) => Some(truncate_preview(t)),
            RequestBody::File(f) => Some(format!("{} ({} bytes, {})", f.filename, f.bytes.len(), f.mime_type)),
        }
    }
}

/// How a payload treats the shared session credential.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// Send whatever the session currently holds.
    #[default]
    Inherit,
    /// Send no Authorization header.
    Remove,
    /// Substitute this value for the Authorization header.
    Replace(String),
}

/// One attack payload together with the operation that delivers it.
#[derive(Debug, Clone)]
pub struct Payload {
    pub test_name: String,
    pub category: Category,
    pub method: HttpMethod,
    /// Path relative to the base URL, already expanded.
    pub path: String,
    /// Query pairs, percent-encoded when the URL is built.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub credential: CredentialMode,
    /// Overrides the default JSON content type.
    pub content_type: Option<String>,
}

impl Payload {
    pub fn new(test_name: impl Into<String>, category: Category, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            category,
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            credential: CredentialMode::Inherit,
            content_type: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_credential(mut self, credential: CredentialMode) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Preview of what was submitted: the body, else the query values.
    pub fn preview(&self) -> Option<String> {
        self.body.preview().or_else(|| {
            if self.query.is_empty() {
                None
            } else {
                let joined = self.query.iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                Some(truncate_preview(&joined))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_serialization() {
        assert_eq!(serde_json::to_string(&HttpMethod::Delete).unwrap(), "\"DELETE\"");
        assert_eq!(HttpMethod::Options.as_str(), "OPTIONS");
    }

    #[test]
    fn test_json_preview_is_bounded() {
        let body = RequestBody::Json(json!({"name": "A".repeat(100_000)}));
        let preview = body.preview().unwrap();
        assert_eq!(preview.chars().count(), crate::utils::truncation::MAX_PREVIEW_LENGTH);
    }

    #[test]
    fn test_file_preview_names_file() {
        let body = RequestBody::File(FileUpload {
            filename: "pdf_01_empty.pdf".into(),
            mime_type: "application/pdf".into(),
            bytes: Arc::new(Vec::new()),
        });
        assert_eq!(body.preview().unwrap(), "pdf_01_empty.pdf (0 bytes, application/pdf)");
    }

    #[test]
    fn test_payload_preview_falls_back_to_query() {
        let payload = Payload::new("sqli_get_1", Category::SqlInjection, HttpMethod::Get, "/knowledge")
            .with_query("name", "' OR '1'='1");
        assert_eq!(payload.preview().unwrap(), "name=' OR '1'='1");
    }

    #[test]
    fn test_empty_payload_has_no_preview() {
        let payload = Payload::new("no_token", Category::Unauthorized, HttpMethod::Get, "/user/profile");
        assert!(payload.preview().is_none());
    }
}
