use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_pipeline::AgentPipeline;
use analysis_core::{
    AnalysisError, AnalysisFlags, AnalysisRequest, CallOutcome, CashFlowAssessment,
    CompletionModel, FeedbackRecord, FeedbackStore, FeedbackType, FinancialInputs, Judgment,
    MemoryFeedbackStore, MemoryRecordStore, MetricsSink, NewsItem, NewsProvider, NoNewsProvider,
    NullMetricsSink, Outlook, RecordStore, StageName, TrendClass, TrendDirection,
};
use async_trait::async_trait;
use chrono::Utc;

/// Completion fake keyed on the prompt's leading "Task: <name>" line.
/// Listed tasks fail as if the call had timed out; everything else returns
/// a fixed judgment.
struct ScriptedModel {
    fail_tasks: Vec<&'static str>,
    responses: HashMap<&'static str, (u8, u8)>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            fail_tasks: Vec::new(),
            responses: HashMap::new(),
        }
    }

    fn with_response(mut self, task: &'static str, score: u8, confidence: u8) -> Self {
        self.responses.insert(task, (score, confidence));
        self
    }

    fn failing(mut self, task: &'static str) -> Self {
        self.fail_tasks.push(task);
        self
    }

    fn task_of(prompt: &str) -> &str {
        prompt
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("Task: "))
            .unwrap_or("")
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        let task = Self::task_of(prompt);
        if self.fail_tasks.contains(&task) {
            return Err(AnalysisError::ModelError("simulated timeout".to_string()));
        }
        if task == "conclusion" {
            return Ok("The company maintains a balanced integrity profile.".to_string());
        }
        let (score, confidence) = self.responses.get(task).copied().unwrap_or((70, 80));
        Ok(format!(
            "{{\"score\": {score}, \"confidence\": {confidence}, \"rationale\": \"scripted\"}}"
        ))
    }
}

struct StaticNews {
    items: Vec<NewsItem>,
}

#[async_trait]
impl NewsProvider for StaticNews {
    async fn fetch(
        &self,
        _company: &str,
        _day_window: u32,
        max_articles: usize,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        Ok(self.items.iter().take(max_articles).cloned().collect())
    }
}

struct FailingNews;

#[async_trait]
impl NewsProvider for FailingNews {
    async fn fetch(
        &self,
        _company: &str,
        _day_window: u32,
        _max_articles: usize,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        Err(AnalysisError::NewsError("feed unreachable".to_string()))
    }
}

#[derive(Default)]
struct CountingMetrics {
    llm_calls: AtomicUsize,
    news_fetches: AtomicUsize,
}

impl MetricsSink for CountingMetrics {
    fn record_llm_call(&self, _task: &str, _outcome: CallOutcome, _duration: Duration) {
        self.llm_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn record_news_fetch(&self, _outcome: CallOutcome) {
        self.news_fetches.fetch_add(1, Ordering::SeqCst);
    }

    fn record_stage_duration(&self, _stage: StageName, _duration: Duration) {}
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn pipeline_with(
    model: Arc<dyn CompletionModel>,
    news: Arc<dyn NewsProvider>,
    store: Arc<dyn RecordStore>,
    feedback: Arc<dyn FeedbackStore>,
    metrics: Arc<dyn MetricsSink>,
) -> AgentPipeline {
    AgentPipeline::new(model, news, store, feedback, metrics)
}

fn default_pipeline(store: Arc<MemoryRecordStore>) -> AgentPipeline {
    pipeline_with(
        Arc::new(ScriptedModel::new()),
        Arc::new(NoNewsProvider),
        store,
        Arc::new(MemoryFeedbackStore::new()),
        Arc::new(NullMetricsSink),
    )
}

fn request(company: &str, financials: Option<FinancialInputs>, flags: AnalysisFlags) -> AnalysisRequest {
    AnalysisRequest {
        company: company.to_string(),
        exchange: Some("PSX".to_string()),
        document: "The company reported steady growth and a modest profit.".to_string(),
        financials,
        effective_year: Some(2026),
        flags,
    }
}

/// Oscillating series with a mild upward drift: enough texture for a
/// mid-range RSI and a price near its long average.
fn long_price_series() -> Vec<f64> {
    (0..250)
        .map(|i| 100.0 + i as f64 * 0.05 + if i % 2 == 0 { 1.0 } else { 0.0 })
        .collect()
}

#[tokio::test]
async fn scenario_short_series_degrades_to_neutral_technicals() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    let pipeline = default_pipeline(store);

    let financials = FinancialInputs {
        stock_prices: vec![100.0, 101.0, 100.5, 102.0, 101.5, 103.0, 102.5, 104.0],
        ..Default::default()
    };
    let record = pipeline
        .run(request("Short Series Co", Some(financials), AnalysisFlags::default()))
        .await
        .unwrap();

    assert!(!record.technical.rsi_sufficient);
    assert!(!record.technical.ma_sufficient);
    assert!(record.technical.rsi_14.is_none());
    assert!(record.technical.ma_200.is_none());
    assert_eq!(record.technical.score, 50);
    assert_eq!(record.technical.confidence, 0);

    assert!(record.trend.is_none());
    let integrity = record.integrity.expect("index always computed");
    assert!(integrity.cii <= 100);

    // Ratios absent entirely, so cash flow reports insufficient data rather
    // than a fabricated zero-based assessment.
    assert_eq!(
        record.operational.cash_flow.value,
        Judgment::Known(CashFlowAssessment::InsufficientData)
    );
}

#[tokio::test]
async fn scenario_rich_history_produces_positive_trend_and_outlook() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    let model = Arc::new(
        ScriptedModel::new()
            .with_response("tone", 80, 85)
            .with_response("ethics", 90, 90)
            .with_response("risk", 20, 90)
            .with_response("source-authenticity", 85, 90),
    );
    let pipeline = pipeline_with(
        model,
        Arc::new(NoNewsProvider),
        store.clone(),
        Arc::new(MemoryFeedbackStore::new()),
        Arc::new(NullMetricsSink),
    );

    let financials = FinancialInputs {
        total_debt: Some(100.0),
        total_equity: Some(200.0),
        current_assets: Some(300.0),
        current_liabilities: Some(200.0),
        stock_prices: long_price_series(),
        revenue_history: vec![400.0, 420.0, 450.0, 480.0],
        cost_history: vec![240.0, 246.0, 255.0, 262.0],
    };
    let req = request("Trend Co", Some(financials), AnalysisFlags::default());

    let first = pipeline.run(req.clone()).await.unwrap();
    assert!(first.trend.is_none());
    assert!(first.technical.rsi_sufficient);
    assert!(first.technical.ma_sufficient);
    let first_cii = first.integrity.as_ref().unwrap().cii;

    // Seed the previous period four points below the current result, then
    // rerun: the trend must be exactly +4 and the outlook must improve.
    let mut previous = first.clone();
    previous.integrity.as_mut().unwrap().cii = first_cii - 4;
    store.upsert(&previous).await.unwrap();

    let second = pipeline.run(req).await.unwrap();
    let trend = second.trend.expect("baseline exists");
    assert_eq!(trend.tit, 4);
    assert_eq!(trend.previous_cii, first_cii - 4);
    assert_eq!(trend.class, TrendClass::Improving);
    assert_eq!(trend.direction, TrendDirection::Up);

    let outlook = second.outlook.expect("outlook always computed");
    assert_eq!(outlook.outlook, Outlook::Improving);

    assert_eq!(
        second.operational.cash_flow.value,
        Judgment::Known(CashFlowAssessment::Positive)
    );
    // Two reference pairs existed: tone vs lexicon, risk vs ratio baseline.
    assert_eq!(second.hallucination.unwrap().compared_pairs, 2);
}

#[tokio::test]
async fn scenario_ethics_timeout_degrades_one_field_only() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    let model = Arc::new(ScriptedModel::new().failing("ethics"));
    let metrics = Arc::new(CountingMetrics::default());
    let pipeline = pipeline_with(
        model,
        Arc::new(NoNewsProvider),
        store,
        Arc::new(MemoryFeedbackStore::new()),
        metrics.clone(),
    );

    let record = pipeline
        .run(request("Timeout Co", None, AnalysisFlags::default()))
        .await
        .unwrap();

    assert_eq!(record.ethical_flag.value, Judgment::NotAvailable);
    assert_eq!(record.ethical_flag.confidence, 0);
    assert_eq!(record.ethical_flag.score, 50);
    // The siblings still landed.
    assert!(record.tone.is_available());
    assert!(record.risk_level.is_available());
    assert!(record.integrity.is_some());
    // All four qualitative attempts were metered, failure included.
    assert_eq!(metrics.llm_calls.load(Ordering::SeqCst), 4);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["ethical_flag"]["value"], "not available");
    assert_eq!(json["ethical_flag"]["confidence"], 0);
}

#[tokio::test]
async fn news_failure_degrades_to_empty_context() {
    let store = Arc::new(MemoryRecordStore::new());
    let pipeline = pipeline_with(
        Arc::new(ScriptedModel::new()),
        Arc::new(FailingNews),
        store,
        Arc::new(MemoryFeedbackStore::new()),
        Arc::new(NullMetricsSink),
    );

    let flags = AnalysisFlags {
        include_news: true,
        ..Default::default()
    };
    let record = pipeline.run(request("News Co", None, flags)).await.unwrap();
    assert!(record.news_fetch_failed);
    assert_eq!(record.news_articles_used, 0);
    assert!(record.integrity.is_some());
}

#[tokio::test]
async fn news_context_is_bounded_and_counted() {
    let store = Arc::new(MemoryRecordStore::new());
    let items: Vec<NewsItem> = (0..3)
        .map(|i| NewsItem {
            title: format!("Headline {i}"),
            summary: "record profit reported".to_string(),
            published_at: Utc::now(),
        })
        .collect();
    let metrics = Arc::new(CountingMetrics::default());
    let pipeline = pipeline_with(
        Arc::new(ScriptedModel::new()),
        Arc::new(StaticNews { items }),
        store,
        Arc::new(MemoryFeedbackStore::new()),
        metrics.clone(),
    );

    let flags = AnalysisFlags {
        include_news: true,
        ..Default::default()
    };
    let record = pipeline.run(request("News Co", None, flags)).await.unwrap();
    assert!(!record.news_fetch_failed);
    assert_eq!(record.news_articles_used, 3);
    assert_eq!(metrics.news_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unanalyzable_request_fails_at_the_planner() {
    let store = Arc::new(MemoryRecordStore::new());
    let pipeline = default_pipeline(store);

    let mut req = request("Empty Co", None, AnalysisFlags::default());
    req.document = "   ".to_string();
    let err = pipeline.run(req).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StageName::Planner));

    let mut no_company = request("x", None, AnalysisFlags::default());
    no_company.company = "".to_string();
    let err = pipeline.run(no_company).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StageName::Planner));
}

#[tokio::test]
async fn conclusion_is_generated_and_degrades_on_failure() {
    let store = Arc::new(MemoryRecordStore::new());
    let flags = AnalysisFlags {
        include_conclusion: true,
        ..Default::default()
    };

    let pipeline = default_pipeline(store.clone());
    let record = pipeline
        .run(request("Conclusion Co", None, flags))
        .await
        .unwrap();
    assert!(!record.conclusion.is_empty());

    let failing = pipeline_with(
        Arc::new(ScriptedModel::new().failing("conclusion")),
        Arc::new(NoNewsProvider),
        Arc::new(MemoryRecordStore::new()),
        Arc::new(MemoryFeedbackStore::new()),
        Arc::new(NullMetricsSink),
    );
    let record = failing
        .run(request("Conclusion Co", None, flags))
        .await
        .unwrap();
    assert!(record.conclusion.is_empty());
    assert!(record.integrity.is_some());
}

#[tokio::test]
async fn feedback_joins_on_the_previous_analysis_id() {
    let store = Arc::new(MemoryRecordStore::new());
    let feedback = Arc::new(MemoryFeedbackStore::new());
    let pipeline = pipeline_with(
        Arc::new(ScriptedModel::new()),
        Arc::new(NoNewsProvider),
        store.clone(),
        feedback.clone(),
        Arc::new(NullMetricsSink),
    );

    let flags = AnalysisFlags {
        include_feedback: true,
        ..Default::default()
    };
    let req = request("Feedback Co", None, flags);

    let first = pipeline.run(req.clone()).await.unwrap();
    assert!(first.feedback.is_none());

    feedback
        .append(
            first.analysis_id,
            FeedbackRecord {
                feedback_type: FeedbackType::Accuracy,
                score: 95,
                notes: "matched the restatement finding".to_string(),
                submitted_by: "reviewer-1".to_string(),
                submitted_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let second = pipeline.run(req).await.unwrap();
    let adjustment = second.feedback.expect("feedback blended");
    assert_eq!(adjustment.source_analysis_id, first.analysis_id);
    assert_eq!(adjustment.entries, 1);
    assert!(adjustment.confidence_shift.abs() <= 3);
}

#[tokio::test]
async fn analysis_ids_are_unique_and_stable_per_request() {
    let store = Arc::new(MemoryRecordStore::new());
    let pipeline = default_pipeline(store);
    let req = request("Id Co", None, AnalysisFlags::default());
    let first = pipeline.run(req.clone()).await.unwrap();
    let second = pipeline.run(req).await.unwrap();
    assert_ne!(first.analysis_id, second.analysis_id);
    assert_eq!(first.company, second.company);
}

#[tokio::test]
async fn report_serialization_keeps_the_field_surface() {
    let store = Arc::new(MemoryRecordStore::new());
    let pipeline = default_pipeline(store);
    let record = pipeline
        .run(request("Surface Co", None, AnalysisFlags::default()))
        .await
        .unwrap();

    let json = serde_json::to_value(&record).unwrap();
    for field in [
        "analysis_id",
        "company",
        "exchange",
        "timestamp",
        "latency_ms",
        "tone",
        "ethical_flag",
        "risk_level",
        "source_authenticity",
        "summary",
        "technical",
        "cycle",
        "operational",
        "integrity",
        "trend",
        "outlook",
        "hallucination",
        "conclusion",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(json["trend"], serde_json::Value::Null);
    assert!(json["integrity"]["band"].is_string());
    assert!(json["outlook"]["outlook"].is_string());
}
