use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    AnalysisError, AnalysisRecord, FeedbackAggregate, FeedbackRecord, FeedbackType, NewsItem,
    StageName,
};

/// Outcome label for collaborator call metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
        }
    }
}

/// Capability seam for the language model.
///
/// The model is non-deterministic and fallible; implementations must enforce
/// their own per-call timeout, and every failure mode (timeout, non-2xx,
/// unparseable body) folds into `Err`. Tests substitute a fixed-response fake
/// here without touching the rest of the pipeline.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// News collaborator: article summaries bounded by a day window and count.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(
        &self,
        company: &str,
        day_window: u32,
        max_articles: usize,
    ) -> Result<Vec<NewsItem>, AnalysisError>;
}

/// Persistent store for finalized analyses, keyed by company id.
/// Writes are best-effort upserts; reads never block an analysis.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_previous(&self, company: &str) -> Result<Option<AnalysisRecord>, AnalysisError>;
    async fn upsert(&self, record: &AnalysisRecord) -> Result<(), AnalysisError>;
}

/// Append-only human feedback store keyed by analysis id. Aggregation is a
/// per-type mean computed on read.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn append(
        &self,
        analysis_id: Uuid,
        feedback: FeedbackRecord,
    ) -> Result<(), AnalysisError>;

    async fn aggregate(
        &self,
        analysis_id: Uuid,
    ) -> Result<HashMap<FeedbackType, FeedbackAggregate>, AnalysisError>;
}

/// Fire-and-forget metrics counters/histograms. Implementations must never
/// fail the caller.
pub trait MetricsSink: Send + Sync {
    fn record_llm_call(&self, task: &str, outcome: CallOutcome, duration: Duration);
    fn record_news_fetch(&self, outcome: CallOutcome);
    fn record_stage_duration(&self, stage: StageName, duration: Duration);
}
