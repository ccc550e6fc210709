use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::credentials::{mask_credential, resolve_credential};
use crate::config::target::slow_threshold_from_secs;
use crate::config::{parse_config, KbFuzzConfig, StageSelector, TargetConfig};
use crate::errors::KbFuzzError;
use crate::pipeline::{RunEvent, RunOrchestrator, RunSummary};
use crate::probe::HttpTransport;
use crate::reporting::formatter::{format_report_listing, format_stage_summary};
use super::commands::{RunArgs, DEFAULT_BASE_URL};
use super::progress::RunProgress;

/// Merge the optional config file with CLI flags. Flags win.
pub async fn resolve_target(args: &RunArgs) -> Result<TargetConfig, KbFuzzError> {
    let file = match &args.config {
        Some(path) => parse_config(&PathBuf::from(path)).await?,
        None => KbFuzzConfig::default(),
    };
    let base_url = args.base_url.clone()
        .or_else(|| file.target.as_ref().and_then(|t| t.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let mut config = TargetConfig::from_config(&file, Some(&base_url))?;
    apply_overrides(&mut config, args)?;
    Ok(config)
}

pub fn apply_overrides(config: &mut TargetConfig, args: &RunArgs) -> Result<(), KbFuzzError> {
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(KbFuzzError::Config(format!("base URL must be http(s): {}", config.base_url)));
    }
    if let Some(token) = &args.token {
        config.token = Some(resolve_credential(token));
    }
    if let Some(id) = &args.dataset_id {
        config.resource_id = Some(id.clone());
    }
    if let Some(dir) = &args.results_dir {
        config.results_dir = PathBuf::from(dir);
    }
    if let Some(n) = args.concurrency {
        if n == 0 {
            return Err(KbFuzzError::Config("--concurrency must be at least 1".into()));
        }
        config.max_concurrency = n;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = args.pacing_ms {
        config.pacing = Duration::from_millis(ms);
    }
    if let Some(secs) = args.slow_threshold {
        config.slow_threshold = slow_threshold_from_secs(secs)?;
    }
    if let Some(seed) = args.seed {
        config.property.seed = Some(seed);
    }
    if args.shrink {
        config.property.shrink = true;
    }
    if config.slow_threshold > config.upload_timeout {
        warn!(
            slow_threshold_secs = config.slow_threshold.as_secs_f64(),
            upload_timeout_secs = config.upload_timeout.as_secs(),
            "Slow threshold exceeds the upload timeout; slow uploads will surface as hard timeouts"
        );
    }
    Ok(())
}

pub async fn handle_run(args: RunArgs) -> Result<(), KbFuzzError> {
    let selector = StageSelector::parse(&args.only)
        .ok_or_else(|| KbFuzzError::Config(format!("unknown stage selector '{}'", args.only)))?;
    let config = resolve_target(&args).await?;

    println!("Target:   {}", config.base_url);
    println!("Mode:     {}", selector);
    if let Some(token) = &config.token {
        println!("Token:    {}", mask_credential(token));
    }
    if let Some(id) = &config.resource_id {
        println!("Dataset:  {}", id);
    }
    println!("Results:  {}", config.results_dir.display());

    let transport = Arc::new(HttpTransport::new()?);
    let cancel_token = CancellationToken::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunEvent>();

    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current test");
            signal_token.cancel();
        }
    });

    let event_task = tokio::spawn(async move {
        let mut progress = RunProgress::new();
        while let Some(event) = event_rx.recv().await {
            progress.handle_event(&event);
        }
        progress.finish();
    });

    let started = std::time::Instant::now();
    let orchestrator = RunOrchestrator::new(config, transport, selector)
        .with_cancel_token(cancel_token)
        .with_event_channel(event_tx);
    let summary = orchestrator.run().await;
    drop(orchestrator);
    let _ = event_task.await;

    print_summary(&summary);
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Done");
    println!("Elapsed: {}", crate::utils::format_duration(started.elapsed().as_millis() as u64));

    if summary.failed() {
        return Err(KbFuzzError::Internal("one or more stages failed to write their report".into()));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for report in summary.reports() {
        print!("{}", format_stage_summary(report));
    }
    for outcome in &summary.outcomes {
        if let crate::pipeline::StageStatus::Skipped(reason) = &outcome.status {
            println!("[!] {} skipped: {}", outcome.stage.display_name(), reason);
        }
    }
    if summary.interrupted {
        println!("Run interrupted; partial reports were written.");
    }
    print!("{}", format_report_listing(&summary.reports));
}
