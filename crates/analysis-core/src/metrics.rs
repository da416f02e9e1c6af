use std::time::Duration;

use crate::{CallOutcome, MetricsSink, StageName};

/// Metrics sink that reports through `tracing` structured events under the
/// `integrity_iq::metrics` target, so a subscriber layer can aggregate or
/// export them without the pipeline knowing about the backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_llm_call(&self, task: &str, outcome: CallOutcome, duration: Duration) {
        tracing::info!(
            target: "integrity_iq::metrics",
            metric = "llm_call",
            task,
            outcome = outcome.as_str(),
            duration_ms = duration.as_millis() as u64,
        );
    }

    fn record_news_fetch(&self, outcome: CallOutcome) {
        tracing::info!(
            target: "integrity_iq::metrics",
            metric = "news_fetch",
            outcome = outcome.as_str(),
        );
    }

    fn record_stage_duration(&self, stage: StageName, duration: Duration) {
        tracing::info!(
            target: "integrity_iq::metrics",
            metric = "stage_duration",
            stage = %stage,
            duration_ms = duration.as_millis() as u64,
        );
    }
}

/// Discards every metric. For tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record_llm_call(&self, _task: &str, _outcome: CallOutcome, _duration: Duration) {}
    fn record_news_fetch(&self, _outcome: CallOutcome) {}
    fn record_stage_duration(&self, _stage: StageName, _duration: Duration) {}
}
