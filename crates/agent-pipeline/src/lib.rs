use std::sync::Arc;
use std::time::Instant;

use analysis_core::{
    AnalysisError, AnalysisRecord, AnalysisRequest, CompletionModel, FeedbackStore, MetricsSink,
    NewsProvider, RecordStore, StageName,
};

pub mod executor;
pub mod judge;
pub mod planner;
pub mod verifier;

pub use executor::Executor;
pub use judge::Judge;
pub use planner::{AnalysisTask, Planner};
pub use verifier::Verifier;

/// Runs the four stages in strict order on one analysis record.
///
/// The record is created here, owned here, and passed by value through
/// Planner → Executor → Verifier → Judge; each stage returns the enriched
/// version. A stage that cannot produce a well-formed record aborts the run
/// with an error tagged by stage name; a partial record is never returned
/// as success. After the Judge the record is frozen: the optional conclusion
/// and the sink hand-offs are best-effort and can only degrade, not fail,
/// the request.
pub struct AgentPipeline {
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
    judge: Judge,
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn RecordStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl AgentPipeline {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        news: Arc<dyn NewsProvider>,
        store: Arc<dyn RecordStore>,
        feedback: Arc<dyn FeedbackStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            planner: Planner,
            executor: Executor::new(model.clone(), news, metrics.clone()),
            verifier: Verifier::new(store.clone()),
            judge: Judge::new(feedback),
            model,
            store,
            metrics,
        }
    }

    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisRecord, AnalysisError> {
        let started = Instant::now();

        if request.company.trim().is_empty() {
            return Err(
                AnalysisError::InvalidRequest("company identifier is empty".to_string())
                    .at_stage(StageName::Planner),
            );
        }
        let no_financials = request
            .financials
            .as_ref()
            .map_or(true, |f| f.is_empty());
        if request.document.trim().is_empty() && no_financials {
            return Err(AnalysisError::InvalidRequest(
                "request carries no analyzable content".to_string(),
            )
            .at_stage(StageName::Planner));
        }

        let mut record = AnalysisRecord::new(&request);
        tracing::info!(
            company = %record.company,
            analysis_id = %record.analysis_id,
            "starting integrity analysis"
        );

        let stage_start = Instant::now();
        let plan = self.planner.plan(&request);
        self.metrics
            .record_stage_duration(StageName::Planner, stage_start.elapsed());
        tracing::debug!(tasks = plan.len(), "plan ready");

        let stage_start = Instant::now();
        record = self
            .executor
            .run(&request, &plan, record)
            .await
            .map_err(|e| e.at_stage(StageName::Executor))?;
        self.metrics
            .record_stage_duration(StageName::Executor, stage_start.elapsed());

        let stage_start = Instant::now();
        record = self
            .verifier
            .run(record)
            .await
            .map_err(|e| e.at_stage(StageName::Verifier))?;
        self.metrics
            .record_stage_duration(StageName::Verifier, stage_start.elapsed());

        let stage_start = Instant::now();
        record = self
            .judge
            .run(&request, record)
            .await
            .map_err(|e| e.at_stage(StageName::Judge))?;
        self.metrics
            .record_stage_duration(StageName::Judge, stage_start.elapsed());

        if request.flags.include_conclusion {
            record.conclusion = self.conclusion(&record).await;
        }
        record.latency_ms = started.elapsed().as_millis() as u64;

        // The record is final; storage is best-effort and never surfaces.
        if let Err(e) = self.store.upsert(&record).await {
            tracing::warn!(error = %e, company = %record.company, "record upsert failed");
        }

        tracing::info!(
            company = %record.company,
            analysis_id = %record.analysis_id,
            cii = record.integrity.as_ref().map(|i| i.cii),
            latency_ms = record.latency_ms,
            "integrity analysis complete"
        );
        Ok(record)
    }

    /// One extra completion summarizing the finalized record. Any failure
    /// degrades to an empty conclusion string.
    async fn conclusion(&self, record: &AnalysisRecord) -> String {
        let serialized = match serde_json::to_string_pretty(record) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::warn!(error = %e, "record serialization for conclusion failed");
                return String::new();
            }
        };
        let prompt = format!(
            "Task: conclusion\nWrite a short plain-text conclusion for the following \
             integrity analysis: summarize the key findings, the main risks, and the \
             forward outlook in at most four sentences.\n\n=== ANALYSIS ===\n{serialized}\n"
        );
        match self.model.complete(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "conclusion generation failed, returning empty");
                String::new()
            }
        }
    }
}
