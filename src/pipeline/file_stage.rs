use std::sync::Arc;

use tracing::info;

use crate::corpus::{prepare_corpus, CorpusOptions};
use crate::errors::KbFuzzError;
use crate::models::{CampaignReport, Category, FileUpload, HttpMethod, Payload, RequestBody};
use crate::probe::{expand_template, ClassifierConfig, EndpointResolver};
use crate::reporting::ReportContext;
use super::context::StageContext;
use super::state::{CampaignPhase, Stage};

const PROBE_FILENAME: &str = "test.txt";
const PROBE_CONTENT: &[u8] = b"fuzzing test content";

fn probe_upload() -> RequestBody {
    RequestBody::File(FileUpload {
        filename: PROBE_FILENAME.to_string(),
        mime_type: "text/plain".to_string(),
        bytes: Arc::new(PROBE_CONTENT.to_vec()),
    })
}

/// Upload every corpus file to the resolved document-upload endpoint.
pub async fn run_file_stage(ctx: &StageContext) -> Result<CampaignReport, KbFuzzError> {
    let config = &ctx.config;
    let token = config.require_token()?;
    let resource_id = config.require_resource_id()?;

    let templates = config.upload_candidates.clone()
        .unwrap_or_else(|| config.layout.default_upload_candidates());
    let candidates = templates.iter()
        .map(|t| expand_template(t, resource_id))
        .collect::<Result<Vec<_>, _>>()?;

    let corpus = prepare_corpus(
        &config.corpus_dir,
        &CorpusOptions { oversized_bytes: config.oversized_bytes },
    ).await?;
    info!(files = corpus.len(), dir = %config.corpus_dir.display(), "Corpus ready");

    let probe_executor = ctx.executor(Some(token), config.probe_timeout);
    let upload_executor = probe_executor.clone()
        .with_timeout(config.upload_timeout)
        .with_classifier(ClassifierConfig::default().with_slow_threshold(config.slow_threshold));
    let driver = ctx.driver(Stage::File, upload_executor, config.upload_pacing).await;

    driver.advance(CampaignPhase::Discovering).await?;
    let resolver = EndpointResolver::new(&probe_executor);
    resolver.verify_resource(&config.layout.knowledge(resource_id)).await;
    let endpoint = resolver.resolve(&candidates, &probe_upload()).await?;
    info!(endpoint = %endpoint.path, accepted = endpoint.accepted, "Upload endpoint resolved");

    let payloads: Vec<Payload> = corpus.into_iter()
        .map(|file| {
            Payload::new(file.filename.clone(), Category::MalformedFile, HttpMethod::Post, endpoint.path.clone())
                .with_body(RequestBody::File(file))
        })
        .collect();

    let outcome = driver.run_batch(Category::MalformedFile, payloads).await?;

    driver.conclude(&config.results_dir, ReportContext {
        target: config.base_url.clone(),
        resource_id: Some(resource_id.to_string()),
        resolved_endpoint: Some(endpoint.path),
        interrupted: outcome.interrupted,
        ..ReportContext::default()
    }).await
}
