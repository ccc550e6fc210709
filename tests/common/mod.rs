#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path as UrlPath, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use kbfuzz::config::TargetConfig;

pub const GOOD_TOKEN: &str = "Bearer good-token";
pub const DATASET_ID: &str = "kb-1";

/// One request as the mock target saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub auth: Option<String>,
}

/// In-process knowledge-base service with a few planted faults:
/// names containing `UNION` crash create and search, and uploads carrying
/// a `%PXF` signature crash the document parser.
#[derive(Clone, Default)]
pub struct MockTarget {
    pub seen: Arc<Mutex<Vec<Seen>>>,
    created: Arc<AtomicUsize>,
}

impl MockTarget {
    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn deletes_of_created(&self) -> usize {
        self.requests().iter()
            .filter(|s| s.method == "DELETE" && s.path.contains("/knowledge/created-"))
            .count()
    }
}

fn envelope(code: i64, data: Value) -> Json<Value> {
    Json(json!({"code": code, "message": if code == 200 { "success" } else { "error" }, "data": data}))
}

async fn record(State(mock): State<MockTarget>, req: Request, next: Next) -> Response {
    let auth = req.headers().get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.seen.lock().unwrap().push(Seen {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        auth,
    });
    next.run(req).await
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(GOOD_TOKEN)
}

async fn profile(headers: HeaderMap) -> Json<Value> {
    if authorized(&headers) {
        envelope(200, json!({"username": "admin"}))
    } else {
        envelope(401, Value::Null)
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("name") {
        Some(name) if name.contains("UNION") => envelope(500, Value::Null),
        _ => envelope(200, json!([])),
    }
}

async fn create(State(mock): State<MockTarget>, body: Bytes) -> Json<Value> {
    let parsed: Option<Value> = serde_json::from_slice(&body).ok();
    match parsed.as_ref().and_then(|v| v.get("name")).and_then(Value::as_str) {
        Some(name) if name.contains("UNION") => envelope(500, Value::Null),
        Some(_) => {
            let n = mock.created.fetch_add(1, Ordering::SeqCst);
            envelope(200, json!({"id": format!("created-{}", n)}))
        }
        None => envelope(400, Value::Null),
    }
}

async fn knowledge_detail(UrlPath(id): UrlPath<String>) -> Json<Value> {
    envelope(200, json!({"id": id, "name": "fuzz target"}))
}

async fn knowledge_delete(UrlPath(_id): UrlPath<String>) -> Json<Value> {
    envelope(200, Value::Null)
}

async fn legacy_document() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, envelope(404, Value::Null))
}

async fn upload(body: Bytes) -> Json<Value> {
    if body.windows(4).any(|w| w == b"%PXF") {
        envelope(500, Value::Null)
    } else {
        envelope(200, json!([{"id": "doc-1"}]))
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, envelope(404, Value::Null))
}

pub async fn spawn_target() -> (MockTarget, SocketAddr) {
    let mock = MockTarget::default();
    let kb = "/admin/api/workspace/default/knowledge";
    let app = Router::new()
        .route("/admin/api/user/profile", get(profile))
        .route(kb, get(search).post(create))
        .route(&format!("{}/:id", kb), get(knowledge_detail).put(knowledge_detail).delete(knowledge_delete))
        .route(&format!("{}/:id/document", kb), post(legacy_document))
        .route(&format!("{}/:id/document/upload", kb), post(upload))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(mock.clone(), record))
        .layer(DefaultBodyLimit::disable())
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, addr)
}

/// Address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Address that accepts connections and never answers.
pub async fn silent_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// Fast configuration against `addr`, writing under `dir`.
pub fn target_config(addr: SocketAddr, dir: &Path) -> TargetConfig {
    let mut config = TargetConfig::new(&format!("http://{}", addr));
    config.token = Some(GOOD_TOKEN.to_string());
    config.resource_id = Some(DATASET_ID.to_string());
    config.results_dir = dir.join("results");
    config.corpus_dir = dir.join("corpus");
    config.pacing = Duration::ZERO;
    config.upload_pacing = Duration::ZERO;
    config.request_timeout = Duration::from_secs(10);
    config.upload_timeout = Duration::from_secs(20);
    config.probe_timeout = Duration::from_secs(5);
    config.oversized_bytes = 64 * 1024;
    config
}
