use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage names, used to tag non-recoverable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Planner,
    Executor,
    Verifier,
    Judge,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::Planner => "planner",
            StageName::Executor => "executor",
            StageName::Verifier => "verifier",
            StageName::Judge => "judge",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("News fetch error: {0}")]
    NewsError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Stage {stage} failed: {reason}")]
    StageFailed { stage: StageName, reason: String },
}

impl AnalysisError {
    /// Tag an error with the stage it aborted, preserving an existing tag.
    pub fn at_stage(self, stage: StageName) -> Self {
        match self {
            AnalysisError::StageFailed { .. } => self,
            other => AnalysisError::StageFailed {
                stage,
                reason: other.to_string(),
            },
        }
    }

    /// The stage a non-recoverable failure was tagged with, if any.
    pub fn failed_stage(&self) -> Option<StageName> {
        match self {
            AnalysisError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
