use tracing::info;

use crate::corpus::{generate, PayloadContext};
use crate::errors::KbFuzzError;
use crate::models::{CampaignReport, API_CAMPAIGN_ORDER};
use crate::probe::EndpointResolver;
use crate::reporting::ReportContext;
use super::context::StageContext;
use super::state::{CampaignPhase, Stage};

/// Structured API campaign: every category in declared order.
pub async fn run_api_stage(ctx: &StageContext) -> Result<CampaignReport, KbFuzzError> {
    let config = &ctx.config;
    let token = config.require_token()?;
    let resource_id = config.require_resource_id()?;

    let executor = ctx.executor(Some(token), config.request_timeout);
    let driver = ctx.driver(Stage::Api, executor, config.pacing).await
        .with_max_concurrency(config.max_concurrency);

    driver.advance(CampaignPhase::Discovering).await?;
    EndpointResolver::new(driver.executor())
        .check_identity(&config.layout.user_profile())
        .await;

    let payload_ctx = PayloadContext::new(config.layout.clone(), resource_id, Some(token.to_string()));
    let mut interrupted = false;
    for category in API_CAMPAIGN_ORDER {
        if driver.is_cancelled() {
            interrupted = true;
            break;
        }
        let payloads = generate(category, &payload_ctx);
        let outcome = driver.run_batch(category, payloads).await?;
        info!(category = %category, executed = outcome.executed, bugs = outcome.bugs, "Category complete");
        if outcome.interrupted {
            interrupted = true;
            break;
        }
    }

    driver.conclude(&config.results_dir, ReportContext {
        target: config.base_url.clone(),
        resource_id: Some(resource_id.to_string()),
        interrupted,
        ..ReportContext::default()
    }).await
}
