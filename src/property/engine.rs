use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PropertySettings;
use crate::errors::KbFuzzError;
use crate::models::{BugType, CampaignReport, Category, HttpMethod, MinimizedCase, Payload, RequestBody};
use crate::pipeline::context::StageContext;
use crate::pipeline::driver::CampaignDriver;
use crate::pipeline::events::RunEvent;
use crate::pipeline::state::{CampaignPhase, Stage};
use crate::probe::{ApiLayout, EndpointResolver};
use crate::reporting::ReportContext;
use super::generators::TrialGenerator;
use super::properties::{Property, TrialInput};
use super::shrink::{minimize, total_length};

const SUCCESS_CODE: i64 = 200;

/// A trial that classified as a bug, kept for the minimisation pass.
#[derive(Debug, Clone)]
struct Failure {
    property: Property,
    test_name: String,
    input: TrialInput,
    bug_type: BugType,
}

/// Draws, executes and records property trials through a campaign driver.
pub struct PropertyEngine<'a> {
    driver: &'a CampaignDriver,
    layout: &'a ApiLayout,
    settings: &'a PropertySettings,
    seed: u64,
}

#[derive(Debug, Default)]
pub struct PropertyRun {
    pub interrupted: bool,
    pub minimized: Vec<MinimizedCase>,
}

impl<'a> PropertyEngine<'a> {
    pub fn new(driver: &'a CampaignDriver, layout: &'a ApiLayout, settings: &'a PropertySettings, seed: u64) -> Self {
        Self { driver, layout, settings, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run every property in declared order, then minimise failures if
    /// enabled.
    pub async fn run(&self, properties: &[Property]) -> Result<PropertyRun, KbFuzzError> {
        let mut generator = TrialGenerator::new(self.seed);
        let mut failures = Vec::new();
        let mut run = PropertyRun::default();

        for property in properties {
            if self.driver.is_cancelled() {
                run.interrupted = true;
                break;
            }
            let (interrupted, found) = self.run_property(*property, &mut generator).await?;
            failures.extend(found);
            if interrupted {
                run.interrupted = true;
                break;
            }
        }

        if self.settings.shrink && !run.interrupted {
            for failure in &failures {
                if self.driver.is_cancelled() {
                    run.interrupted = true;
                    break;
                }
                if let Some(case) = self.minimize_failure(failure).await {
                    run.minimized.push(case);
                }
            }
            if self.driver.is_cancelled() {
                run.interrupted = true;
            }
        }
        Ok(run)
    }

    async fn run_property(&self, property: Property, generator: &mut TrialGenerator) -> Result<(bool, Vec<Failure>), KbFuzzError> {
        self.driver.advance(CampaignPhase::Executing(Category::PropertyTrial)).await?;
        let trials = property.trials(&self.settings.trials);
        info!(property = %property, trials, "{}", property.description());
        self.driver.emit(RunEvent::BatchStarted { label: property.name().to_string(), total: trials });

        let mut failures = Vec::new();
        let mut executed = 0;
        let mut bugs = 0;
        let mut interrupted = false;

        for index in 0..trials {
            if self.driver.is_cancelled() || (index > 0 && !self.driver.pace().await) {
                interrupted = true;
                break;
            }
            let input = property.draw(generator);
            let test_name = format!("{}_{:03}", property.name(), index);
            let payload = input.to_payload(&test_name, self.layout);

            let creates = creates_resource(&payload, self.layout);
            let (mut record, body) = self.driver.run_capturing(payload).await;
            record.property = Some(property.name().to_string());
            record.payload_preview = Some(input.preview());

            if creates {
                self.cleanup(record.api_code, body.as_ref()).await;
            }

            executed += 1;
            if record.is_bug {
                bugs += 1;
                warn!(property = %property, test = %test_name, bug_type = %record.bug_type, "Property violated");
                if input.text_fields().is_some() {
                    failures.push(Failure {
                        property,
                        test_name: test_name.clone(),
                        input,
                        bug_type: record.bug_type,
                    });
                }
            }
            self.driver.commit(record).await;
        }

        info!(property = %property, executed, bugs, "Property complete");
        self.driver.emit(RunEvent::CategoryCompleted { category: Category::PropertyTrial, total: executed, bugs });
        Ok((interrupted, failures))
    }

    /// Delete a resource the trial created. Failures are logged only.
    async fn cleanup(&self, api_code: Option<i64>, body: Option<&Value>) {
        if api_code != Some(SUCCESS_CODE) {
            return;
        }
        let Some(id) = body.and_then(created_id) else {
            return;
        };
        let path = self.layout.knowledge(&id);
        match self.driver.executor().send_raw(HttpMethod::Delete, &path, RequestBody::Empty).await {
            Ok(raw) if raw.api_code() == Some(SUCCESS_CODE) => debug!(id = %id, "Cleaned up created resource"),
            Ok(raw) => warn!(id = %id, status = ?raw.status(), api_code = ?raw.api_code(), "Cleanup delete was rejected"),
            Err(e) => warn!(id = %id, error = %e, "Cleanup delete failed"),
        }
    }

    async fn minimize_failure(&self, failure: &Failure) -> Option<MinimizedCase> {
        let fields = failure.input.text_fields()?;
        let original_length = total_length(&fields);
        let property = failure.property;
        let input = &failure.input;
        let target = failure.bug_type;

        let result = minimize(
            fields,
            property.min_field_length(),
            self.settings.max_shrink_attempts,
            || self.driver.is_cancelled(),
            |candidate| async move {
                // Replays are paced like trials; a cancelled wait is not a reproduction.
                if self.driver.is_cancelled() || !self.driver.pace().await {
                    return false;
                }
                let shrunk = input.with_text_fields(&candidate);
                let payload = shrunk.to_payload(&failure.test_name, self.layout);
                let creates = creates_resource(&payload, self.layout);
                let (record, body) = self.driver.run_capturing(payload).await;
                if creates {
                    self.cleanup(record.api_code, body.as_ref()).await;
                }
                record.is_bug && record.bug_type == target
            },
        ).await;

        if result.stopped || self.driver.is_cancelled() {
            info!(test = %failure.test_name, attempts = result.attempts, "Minimisation interrupted");
            return None;
        }

        let minimized = input.with_text_fields(&result.fields);
        info!(
            test = %failure.test_name,
            original_length,
            minimized_length = total_length(&result.fields),
            attempts = result.attempts,
            "Minimised failing input"
        );
        Some(MinimizedCase {
            property: property.name().to_string(),
            test_name: failure.test_name.clone(),
            bug_type: target,
            original_length,
            minimized_length: total_length(&result.fields),
            minimized_preview: minimized.preview(),
            attempts: result.attempts,
        })
    }
}

/// Whether a request targets the knowledge create endpoint, so a success
/// leaves a resource behind.
fn creates_resource(payload: &Payload, layout: &ApiLayout) -> bool {
    payload.method == HttpMethod::Post && payload.path == layout.knowledge_collection()
}

/// `data.id` of a successful create envelope, as a string.
fn created_id(body: &Value) -> Option<String> {
    match body.get("data")?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Property-trial stage. Needs a credential; the resource id is not used.
pub async fn run_property_stage(ctx: &StageContext) -> Result<CampaignReport, KbFuzzError> {
    let config = &ctx.config;
    let token = config.require_token()?;
    let seed = config.property.seed.unwrap_or_else(rand::random);
    info!(seed, "Property trials seeded");

    let executor = ctx.executor(Some(token), config.request_timeout);
    let driver = ctx.driver(Stage::Property, executor, config.pacing).await;

    driver.advance(CampaignPhase::Discovering).await?;
    EndpointResolver::new(driver.executor())
        .check_identity(&config.layout.user_profile())
        .await;

    let engine = PropertyEngine::new(&driver, &config.layout, &config.property, seed);
    let run = engine.run(&Property::ALL).await?;

    driver.conclude(&config.results_dir, ReportContext {
        target: config.base_url.clone(),
        resource_id: config.resource_id.clone(),
        seed: Some(seed),
        interrupted: run.interrupted,
        minimized: run.minimized,
        ..ReportContext::default()
    }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::config::TrialCounts;
    use crate::pipeline::ledger::Ledger;
    use crate::probe::executor::tests::ScriptedTransport;
    use crate::probe::{Executor, SessionCredential};

    fn driver(transport: Arc<ScriptedTransport>) -> CampaignDriver {
        let session = Arc::new(SessionCredential::new(Some("Bearer real".into())));
        let executor = Executor::new(transport, "http://kb.local", session, Duration::from_secs(5));
        CampaignDriver::new(Stage::Property, executor, Arc::new(Ledger::in_memory()))
    }

    fn settings(create: usize) -> PropertySettings {
        PropertySettings {
            trials: TrialCounts { create_knowledge: create, search_knowledge: 0, random_endpoint: 0, malformed_json: 0 },
            ..PropertySettings::default()
        }
    }

    #[test]
    fn test_created_id_extraction() {
        assert_eq!(created_id(&json!({"data": {"id": "abc"}})), Some("abc".into()));
        assert_eq!(created_id(&json!({"data": {"id": 42}})), Some("42".into()));
        assert_eq!(created_id(&json!({"data": null})), None);
        assert_eq!(created_id(&json!({"data": {"id": ""}})), None);
    }

    #[tokio::test]
    async fn test_all_clean_trials_yield_no_bugs() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let driver = driver(transport);
        let layout = ApiLayout::default();
        let settings = settings(50);
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        PropertyEngine::new(&driver, &layout, &settings, 1).run(&[Property::CreateKnowledge]).await.unwrap();

        let records = driver.ledger().snapshot().await;
        assert_eq!(records.len(), 50);
        assert!(records.iter().all(|r| !r.is_bug));
        assert!(records.iter().all(|r| r.property.as_deref() == Some("create_knowledge")));
    }

    #[tokio::test]
    async fn test_single_server_fault_recorded_with_bounded_preview() {
        // Envelope without data.id, so no cleanup calls are interleaved.
        let mut replies: Vec<_> = (0..50).map(|_| ScriptedTransport::ok(200, json!({"code": 400}))).collect();
        replies[17] = ScriptedTransport::ok(500, json!({"code": 500, "message": "boom"}));
        let transport = Arc::new(ScriptedTransport::new(replies));
        let driver = driver(transport);
        let layout = ApiLayout::default();
        let settings = settings(50);
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        PropertyEngine::new(&driver, &layout, &settings, 9).run(&[Property::CreateKnowledge]).await.unwrap();

        let records = driver.ledger().snapshot().await;
        let bugs: Vec<_> = records.iter().filter(|r| r.is_bug).collect();
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].test_name, "create_knowledge_017");
        assert!(bugs[0].payload_preview.as_ref().unwrap().chars().count() <= 100);
    }

    #[tokio::test]
    async fn test_successful_create_is_cleaned_up() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(200, json!({"code": 200, "data": {"id": "kb-new"}})),
        ]));
        let driver = driver(transport.clone());
        let layout = ApiLayout::default();
        let settings = settings(1);
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        PropertyEngine::new(&driver, &layout, &settings, 2).run(&[Property::CreateKnowledge]).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].method, HttpMethod::Delete);
        assert!(seen[1].url.path().ends_with("/knowledge/kb-new"));
        assert_eq!(driver.ledger().len().await, 1);
    }

    #[tokio::test]
    async fn test_same_seed_draws_same_inputs() {
        let layout = ApiLayout::default();
        let settings = PropertySettings::default();
        let mut previews = Vec::new();
        for _ in 0..2 {
            let driver = driver(Arc::new(ScriptedTransport::new(vec![])));
            driver.advance(CampaignPhase::Discovering).await.unwrap();
            PropertyEngine::new(&driver, &layout, &settings, 1234).run(&Property::ALL).await.unwrap();
            let records = driver.ledger().snapshot().await;
            previews.push(records.into_iter().map(|r| r.payload_preview).collect::<Vec<_>>());
        }
        assert_eq!(previews[0].len(), 140);
        assert_eq!(previews[0], previews[1]);
    }

    #[tokio::test]
    async fn test_shrink_records_minimized_case() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(500, json!({"code": 500})),
        ]));
        let driver = driver(transport);
        let layout = ApiLayout::default();
        let settings = PropertySettings {
            trials: TrialCounts { create_knowledge: 0, search_knowledge: 1, random_endpoint: 0, malformed_json: 0 },
            shrink: true,
            max_shrink_attempts: 8,
            ..PropertySettings::default()
        };
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        let run = PropertyEngine::new(&driver, &layout, &settings, 3).run(&[Property::SearchKnowledge]).await.unwrap();

        // Replays hit the scripted default (code 200), so nothing smaller reproduces.
        assert_eq!(driver.ledger().len().await, 1);
        assert!(driver.ledger().snapshot().await[0].is_bug);
        assert_eq!(run.minimized.len(), 1);
        let case = &run.minimized[0];
        assert_eq!(case.property, "search_knowledge");
        assert_eq!(case.bug_type, BugType::ServerError);
        assert_eq!(case.minimized_length, case.original_length);
        assert!(case.attempts <= 8);
    }

    /// Faults on the first request, cancels the run on the second.
    struct CancelOnReplay {
        calls: std::sync::atomic::AtomicUsize,
        token: tokio_util::sync::CancellationToken,
    }

    #[async_trait::async_trait]
    impl crate::probe::Transport for CancelOnReplay {
        async fn send(&self, _request: &crate::probe::ProbeRequest) -> Result<crate::probe::RawResult, KbFuzzError> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                return ScriptedTransport::ok(200, json!({"code": 500}));
            }
            self.token.cancel();
            ScriptedTransport::ok(200, json!({"code": 200}))
        }
    }

    #[tokio::test]
    async fn test_cancel_during_minimisation_stops_replays() {
        let token = tokio_util::sync::CancellationToken::new();
        let transport = Arc::new(CancelOnReplay { calls: Default::default(), token: token.clone() });
        let session = Arc::new(SessionCredential::new(Some("Bearer real".into())));
        let executor = Executor::new(transport.clone(), "http://kb.local", session, Duration::from_secs(5));
        let driver = CampaignDriver::new(Stage::Property, executor, Arc::new(Ledger::in_memory()))
            .with_cancel_token(token.clone());
        let layout = ApiLayout::default();
        let settings = PropertySettings {
            trials: TrialCounts { create_knowledge: 0, search_knowledge: 1, random_endpoint: 0, malformed_json: 0 },
            shrink: true,
            max_shrink_attempts: 32,
            ..PropertySettings::default()
        };
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        let run = PropertyEngine::new(&driver, &layout, &settings, 3).run(&[Property::SearchKnowledge]).await.unwrap();

        assert!(token.is_cancelled());
        assert!(run.interrupted);
        assert!(run.minimized.is_empty());
        // The trial itself plus the one replay that observed the cancel.
        assert_eq!(transport.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(driver.ledger().len().await, 1);
    }

    #[test]
    fn test_create_endpoint_detection() {
        let layout = ApiLayout::default();
        let json_post = TrialInput::Json(json!({"name": "x"})).to_payload("malformed_json_000", &layout);
        let search = TrialInput::Search { query: "x".into() }.to_payload("search_knowledge_000", &layout);
        assert!(creates_resource(&json_post, &layout));
        assert!(!creates_resource(&search, &layout));
    }

    #[tokio::test]
    async fn test_malformed_json_create_is_cleaned_up() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(200, json!({"code": 200, "data": {"id": 77}})),
        ]));
        let driver = driver(transport.clone());
        let layout = ApiLayout::default();
        let settings = PropertySettings {
            trials: TrialCounts { create_knowledge: 0, search_knowledge: 0, random_endpoint: 0, malformed_json: 1 },
            ..PropertySettings::default()
        };
        driver.advance(CampaignPhase::Discovering).await.unwrap();
        PropertyEngine::new(&driver, &layout, &settings, 5).run(&[Property::MalformedJson]).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].method, HttpMethod::Delete);
        assert!(seen[1].url.path().ends_with("/knowledge/77"));
    }
}

