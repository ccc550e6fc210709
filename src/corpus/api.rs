use serde_json::{json, Value};

use crate::models::{Category, CredentialMode, HttpMethod, Payload, RequestBody};
use crate::probe::ApiLayout;
use super::strings::{
    invalid_credentials, invalid_ids, tamper_credential, BOUNDARY_LENGTHS, FOREIGN_WORKSPACES,
    SPECIAL_NAMES, SQL_INJECTION, XSS,
};

/// Everything a payload set depends on. Random identifiers are drawn once
/// here so [`generate`] stays pure.
#[derive(Debug, Clone)]
pub struct PayloadContext {
    pub layout: ApiLayout,
    pub resource_id: String,
    /// The real credential, used to derive a tampered variant.
    pub credential: Option<String>,
    pub random_resource_ids: Vec<String>,
    pub random_user_ids: Vec<String>,
    pub random_document_id: String,
}

impl PayloadContext {
    pub fn new(layout: ApiLayout, resource_id: &str, credential: Option<String>) -> Self {
        let draw = |n: usize| (0..n).map(|_| uuid::Uuid::new_v4().to_string()).collect::<Vec<_>>();
        Self {
            layout,
            resource_id: resource_id.to_string(),
            credential,
            random_resource_ids: draw(5),
            random_user_ids: draw(3),
            random_document_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

fn create_body(name: &str, desc: &str) -> Value {
    json!({"name": name, "desc": desc, "type": "0"})
}

fn short(text: &str) -> String {
    text.chars().take(20).collect()
}

/// The payload set for one API category, in issue order.
pub fn generate(category: Category, ctx: &PayloadContext) -> Vec<Payload> {
    match category {
        Category::SqlInjection => sql_injection(ctx),
        Category::Xss => xss(ctx),
        Category::Unauthorized => unauthorized(ctx),
        Category::Boundary => boundary(ctx),
        Category::Idor => idor(ctx),
        Category::MalformedFile | Category::PropertyTrial => Vec::new(),
    }
}

fn sql_injection(ctx: &PayloadContext) -> Vec<Payload> {
    let layout = &ctx.layout;
    let cat = Category::SqlInjection;
    let mut payloads = Vec::new();
    for (i, s) in SQL_INJECTION.iter().enumerate() {
        let n = i + 1;
        let searches = [
            (layout.knowledge_collection(), "name"),
            (layout.knowledge(&ctx.resource_id), "name"),
            (layout.documents(&ctx.resource_id), "search"),
        ];
        for (path, key) in searches {
            payloads.push(
                Payload::new(format!("sqli_get_{}", n), cat, HttpMethod::Get, path).with_query(key, s),
            );
        }
        payloads.push(
            Payload::new(format!("sqli_post_name_{}", n), cat, HttpMethod::Post, layout.knowledge_collection())
                .with_json(create_body(s, "test")),
        );
    }
    payloads
}

fn xss(ctx: &PayloadContext) -> Vec<Payload> {
    let path = ctx.layout.knowledge_collection();
    let cat = Category::Xss;
    let mut payloads = Vec::new();
    for (i, s) in XSS.iter().enumerate() {
        let n = i + 1;
        payloads.push(
            Payload::new(format!("xss_name_{}", n), cat, HttpMethod::Post, path.clone())
                .with_json(create_body(s, "xss test")),
        );
        payloads.push(
            Payload::new(format!("xss_desc_{}", n), cat, HttpMethod::Post, path.clone())
                .with_json(create_body(&format!("xss_test_{}", i), s)),
        );
    }
    payloads
}

fn unauthorized(ctx: &PayloadContext) -> Vec<Payload> {
    let layout = &ctx.layout;
    let ds = &ctx.resource_id;
    let cat = Category::Unauthorized;
    let protected = [
        (HttpMethod::Get, layout.knowledge_collection()),
        (HttpMethod::Get, layout.knowledge(ds)),
        (HttpMethod::Get, layout.documents(ds)),
        (HttpMethod::Post, layout.knowledge_collection()),
        (HttpMethod::Delete, layout.knowledge(ds)),
        (HttpMethod::Get, layout.user_profile()),
        (HttpMethod::Get, layout.api_path("user/list")),
        (HttpMethod::Get, layout.workspace_path(&layout.workspace, "application")),
        (HttpMethod::Get, layout.workspace_path(&layout.workspace, "model")),
    ];

    let mut payloads = Vec::new();
    for (method, path) in protected {
        let leaf = path.rsplit('/').next().unwrap_or_default().to_string();
        let mut payload = Payload::new(format!("no_token_{}_{}", method, leaf), cat, method, path)
            .with_credential(CredentialMode::Remove);
        if method == HttpMethod::Post {
            payload = payload.with_json(json!({"name": "unauth_test", "type": "0"}));
        }
        payloads.push(payload);
    }

    for credential in invalid_credentials() {
        payloads.push(
            Payload::new(format!("invalid_token_{}", short(&credential)), cat, HttpMethod::Get, layout.knowledge_collection())
                .with_credential(CredentialMode::Replace(credential)),
        );
    }

    if let Some(tampered) = ctx.credential.as_deref().and_then(tamper_credential) {
        payloads.push(
            Payload::new("tampered_token", cat, HttpMethod::Get, layout.knowledge_collection())
                .with_credential(CredentialMode::Replace(tampered)),
        );
    }
    payloads
}

fn boundary(ctx: &PayloadContext) -> Vec<Payload> {
    let layout = &ctx.layout;
    let ds = &ctx.resource_id;
    let collection = layout.knowledge_collection();
    let cat = Category::Boundary;
    let mut payloads = Vec::new();

    for length in BOUNDARY_LENGTHS {
        payloads.push(
            Payload::new(format!("long_name_{}", length), cat, HttpMethod::Post, collection.clone())
                .with_json(create_body(&"A".repeat(length), "boundary test")),
        );
    }

    for (i, name) in SPECIAL_NAMES.iter().enumerate() {
        payloads.push(
            Payload::new(format!("special_name_{}", i), cat, HttpMethod::Post, collection.clone())
                .with_json(create_body(name, "test")),
        );
    }

    let ids = invalid_ids(&ctx.random_document_id);
    for (i, bad_id) in ids.iter().enumerate() {
        payloads.push(Payload::new(
            format!("invalid_doc_id_{}_{}", i, short(bad_id)),
            cat,
            HttpMethod::Get,
            layout.document(ds, bad_id),
        ));
    }

    for (i, bad_id) in ids.iter().take(8).enumerate() {
        payloads.push(Payload::new(format!("invalid_kb_id_{}", i), cat, HttpMethod::Get, layout.knowledge(bad_id)));
        payloads.push(Payload::new(format!("delete_invalid_kb_{}", i), cat, HttpMethod::Delete, layout.knowledge(bad_id)));
    }

    payloads.push(
        Payload::new("empty_body", cat, HttpMethod::Post, collection.clone())
            .with_body(RequestBody::Text(String::new())),
    );
    payloads.push(Payload::new("array_body", cat, HttpMethod::Post, collection.clone()).with_json(json!([1, 2, 3])));
    payloads.push(Payload::new("number_body", cat, HttpMethod::Post, collection.clone()).with_json(json!(12345)));
    payloads.push(
        Payload::new("wrong_content_type", cat, HttpMethod::Post, collection)
            .with_body(RequestBody::Text("not json".into()))
            .with_content_type("text/plain"),
    );
    payloads
}

fn idor(ctx: &PayloadContext) -> Vec<Payload> {
    let layout = &ctx.layout;
    let cat = Category::Idor;
    let mut payloads = Vec::new();

    for (i, fake) in ctx.random_resource_ids.iter().enumerate() {
        payloads.push(Payload::new(format!("idor_fake_kb_{}", i), cat, HttpMethod::Get, layout.knowledge(fake)));
        payloads.push(Payload::new(format!("idor_fake_docs_{}", i), cat, HttpMethod::Get, layout.documents(fake)));
        payloads.push(
            Payload::new(format!("idor_update_fake_{}", i), cat, HttpMethod::Put, layout.knowledge(fake))
                .with_json(json!({"name": "hacked", "desc": "idor test"})),
        );
        payloads.push(Payload::new(format!("idor_delete_fake_{}", i), cat, HttpMethod::Delete, layout.knowledge(fake)));
    }

    for ws in FOREIGN_WORKSPACES {
        payloads.push(Payload::new(format!("idor_workspace_{}", short(ws)), cat, HttpMethod::Get, layout.workspace_path(ws, "knowledge")));
        payloads.push(Payload::new(format!("idor_workspace_app_{}", short(ws)), cat, HttpMethod::Get, layout.workspace_path(ws, "application")));
    }

    for (i, user) in ctx.random_user_ids.iter().enumerate() {
        payloads.push(Payload::new(format!("idor_user_{}", i), cat, HttpMethod::Get, layout.user(user)));
    }
    payloads
}
