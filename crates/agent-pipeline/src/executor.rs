use std::sync::Arc;
use std::time::Instant;

use analysis_core::{
    AnalysisError, AnalysisRecord, AnalysisRequest, CallOutcome, CompletionModel, CycleContext,
    EthicalFlag, FinancialInputs, FromScore, GradedSignal, MetricsSink, NewsProvider, RiskLevel,
    SourceAuthenticity, Tone,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::planner::AnalysisTask;

/// Bounds on the news enrichment fetch.
const NEWS_DAY_WINDOW: u32 = 14;
const NEWS_MAX_ARTICLES: usize = 10;

/// Cap on document text embedded in one prompt.
const PROMPT_DOCUMENT_LIMIT: usize = 8_000;

/// Parsed shape of a qualitative model reply.
#[derive(Debug, Deserialize)]
struct RawJudgment {
    score: i64,
    confidence: i64,
}

/// Gathers the raw signals for a record: qualitative judgments from the
/// completion model, quantitative indicators from the reference calculators,
/// and news context from the external feed.
///
/// Per-field policy: a failed or malformed model reply converts that one
/// signal to the zero-confidence sentinel and the pipeline continues; a news
/// fetch failure degrades to an empty context. Nothing here aborts the run.
pub struct Executor {
    model: Arc<dyn CompletionModel>,
    news: Arc<dyn NewsProvider>,
    metrics: Arc<dyn MetricsSink>,
}

impl Executor {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        news: Arc<dyn NewsProvider>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            model,
            news,
            metrics,
        }
    }

    pub async fn run(
        &self,
        request: &AnalysisRequest,
        plan: &[AnalysisTask],
        mut record: AnalysisRecord,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let news_items = if plan.contains(&AnalysisTask::News) {
            match self
                .news
                .fetch(&request.company, NEWS_DAY_WINDOW, NEWS_MAX_ARTICLES)
                .await
            {
                Ok(items) => {
                    self.metrics.record_news_fetch(CallOutcome::Success);
                    items
                }
                Err(e) => {
                    tracing::warn!(error = %e, company = %request.company, "news fetch failed, continuing without context");
                    self.metrics.record_news_fetch(CallOutcome::Failure);
                    record.news_fetch_failed = true;
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        record.news_articles_used = news_items.len();

        let headlines: Vec<String> = news_items
            .iter()
            .map(|item| {
                if item.summary.is_empty() {
                    item.title.clone()
                } else {
                    format!("{}: {}", item.title, item.summary)
                }
            })
            .collect();

        // The four qualitative judgments are mutually independent, so they
        // run concurrently; each carries its own timeout inside the model
        // client, and one timing out never cancels the siblings.
        let (tone, ethics, risk, authenticity) = tokio::join!(
            self.qualitative::<Tone>(AnalysisTask::Tone, request, &headlines),
            self.qualitative::<EthicalFlag>(AnalysisTask::Ethics, request, &headlines),
            self.qualitative::<RiskLevel>(AnalysisTask::Risk, request, &headlines),
            self.qualitative::<SourceAuthenticity>(
                AnalysisTask::SourceAuthenticity,
                request,
                &headlines
            ),
        );
        record.tone = tone;
        record.ethical_flag = ethics;
        record.risk_level = risk;
        record.source_authenticity = authenticity;

        let default_financials = FinancialInputs::default();
        let financials = request.financials.as_ref().unwrap_or(&default_financials);
        let prices = financials.stock_prices.as_slice();

        if plan.contains(&AnalysisTask::Technical) {
            record.technical = technical_analysis::snapshot(prices);
        }

        if plan.contains(&AnalysisTask::MacroCycle) {
            let year = request.effective_year.unwrap_or_else(|| Utc::now().year());
            let band = macro_cycle::phase_for_year(year);
            let cas = macro_cycle::cycle_alignment(macro_cycle::cas_inputs_from_market(
                prices,
                record.technical.rsi_14,
                band.phase,
            ));
            record.cycle = Some(CycleContext {
                phase: band.phase,
                projected: band.projected,
                band_start: band.start,
                band_end: band.end,
                alignment_score: cas.score,
                confidence: cas.confidence,
            });
        }

        if plan.contains(&AnalysisTask::Operational) {
            record.operational = fundamental_analysis::operational_metrics(financials);
        }

        Ok(record)
    }

    async fn qualitative<T: FromScore>(
        &self,
        task: AnalysisTask,
        request: &AnalysisRequest,
        headlines: &[String],
    ) -> GradedSignal<T> {
        let prompt = build_prompt(task, request, headlines);
        let started = Instant::now();
        let outcome = match self.model.complete(&prompt).await {
            Ok(raw) => parse_judgment(&raw),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(judgment) => {
                self.metrics
                    .record_llm_call(task.as_str(), CallOutcome::Success, started.elapsed());
                GradedSignal::known(
                    T::from_score(judgment.score as u8),
                    judgment.score as u8,
                    judgment.confidence as u8,
                )
            }
            Err(e) => {
                tracing::warn!(task = task.as_str(), error = %e, "qualitative signal unavailable");
                self.metrics
                    .record_llm_call(task.as_str(), CallOutcome::Failure, started.elapsed());
                GradedSignal::not_available()
            }
        }
    }
}

fn task_instruction(task: AnalysisTask) -> &'static str {
    match task {
        AnalysisTask::Tone => {
            "Assess the overall tone of the company's disclosures. \
             Score 100 for strongly positive language, 0 for strongly negative."
        }
        AnalysisTask::Ethics => {
            "Assess the governance and ethical integrity signalled by the document \
             (audit opinions, related-party dealings, regulatory findings). \
             Score 100 for clean governance, 0 for serious misconduct."
        }
        AnalysisTask::Risk => {
            "Assess the financial and reputational risk exposure. \
             The score is a severity: 100 means severe risk, 0 means minimal risk."
        }
        AnalysisTask::SourceAuthenticity => {
            "Assess how authentic and verifiable the analyzed material appears. \
             Score 100 for audited primary sources, 0 for unsubstantiated rumour."
        }
        _ => "",
    }
}

fn build_prompt(task: AnalysisTask, request: &AnalysisRequest, headlines: &[String]) -> String {
    let mut document = request.document.as_str();
    if document.len() > PROMPT_DOCUMENT_LIMIT {
        let mut end = PROMPT_DOCUMENT_LIMIT;
        while !document.is_char_boundary(end) {
            end -= 1;
        }
        document = &document[..end];
    }

    let mut prompt = format!(
        "Task: {}\nCompany: {}\n{}\n\nRespond with a single JSON object: \
         {{\"score\": <0-100>, \"confidence\": <0-100>, \"rationale\": \"<one sentence>\"}}. \
         If the material does not support a judgment, set confidence to 0.\n\n\
         === DOCUMENT ===\n{}\n",
        task.as_str(),
        request.company,
        task_instruction(task),
        document,
    );

    if !headlines.is_empty() {
        prompt.push_str("\n=== RECENT HEADLINES ===\n");
        for headline in headlines {
            prompt.push_str("- ");
            prompt.push_str(headline);
            prompt.push('\n');
        }
    }
    prompt
}

/// Parse a model reply into a judgment, tolerating fenced code blocks.
/// Anything else (wrong shape, out-of-range numbers) is malformed and
/// becomes the unavailable sentinel at the call site.
fn parse_judgment(raw: &str) -> Result<RawJudgment, AnalysisError> {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let judgment: RawJudgment = serde_json::from_str(trimmed)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    if !(0..=100).contains(&judgment.score) || !(0..=100).contains(&judgment.confidence) {
        return Err(AnalysisError::MalformedResponse(format!(
            "score {} / confidence {} out of range",
            judgment.score, judgment.confidence
        )));
    }
    Ok(judgment)
}
