use analysis_core::AnalysisRequest;
use serde::{Deserialize, Serialize};

/// Identifier of one analysis task the Executor knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisTask {
    Tone,
    Ethics,
    Risk,
    SourceAuthenticity,
    Technical,
    MacroCycle,
    Operational,
    News,
    Feedback,
}

impl AnalysisTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTask::Tone => "tone",
            AnalysisTask::Ethics => "ethics",
            AnalysisTask::Risk => "risk",
            AnalysisTask::SourceAuthenticity => "source-authenticity",
            AnalysisTask::Technical => "technical",
            AnalysisTask::MacroCycle => "macro-cycle",
            AnalysisTask::Operational => "operational",
            AnalysisTask::News => "news",
            AnalysisTask::Feedback => "feedback",
        }
    }
}

/// Plans the ordered task list for a request.
///
/// Pure and infallible: the seven core tasks always run in a fixed order,
/// and the flag-gated enrichments are appended when requested. A flag
/// combination the planner does not recognize simply omits the
/// corresponding task.
#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    pub fn plan(&self, request: &AnalysisRequest) -> Vec<AnalysisTask> {
        let mut tasks = vec![
            AnalysisTask::Tone,
            AnalysisTask::Ethics,
            AnalysisTask::Risk,
            AnalysisTask::SourceAuthenticity,
            AnalysisTask::Technical,
            AnalysisTask::MacroCycle,
            AnalysisTask::Operational,
        ];
        if request.flags.include_news {
            tasks.push(AnalysisTask::News);
        }
        if request.flags.include_feedback {
            tasks.push(AnalysisTask::Feedback);
        }
        tasks
    }
}
