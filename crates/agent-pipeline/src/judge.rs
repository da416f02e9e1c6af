use std::sync::Arc;

use analysis_core::{
    AnalysisError, AnalysisRecord, AnalysisRequest, FeedbackAdjustment, FeedbackStore,
    FeedbackType, FinancialInputs, ForwardOutlook, GradedSignal, HallucinationMetrics, Outlook,
    RiskLevel, NEUTRAL_SCORE,
};

/// Hallucination Score when no model/reference pairs exist to compare.
const HS_NEUTRAL: u8 = 50;

/// Weight of the spread (standard deviation) term in the HS penalty:
/// HS = 100 − (|bias| + 0.5·√variance), clamped to [0, 100].
const HS_SPREAD_WEIGHT: f64 = 0.5;

/// Difference variance above this reports a skewed distribution shape.
const HS_SKEW_VARIANCE: f64 = 4.0;

/// Future Performance Perspective weights over CII, the trend component,
/// and the Cycle Alignment Score.
const FPP_W_CII: f64 = 0.5;
const FPP_W_TREND: f64 = 0.3;
const FPP_W_CYCLE: f64 = 0.2;

/// The temporal trend maps to its own 0-100 component at five points per
/// index point around 50; a null trend contributes the neutral 50.
const FPP_TREND_SLOPE: f64 = 5.0;

const FPP_IMPROVING_FLOOR: f64 = 65.0;
const FPP_STABLE_FLOOR: f64 = 45.0;

/// Confidence penalty when no historical baseline exists for the trend.
const FPP_NO_BASELINE_PENALTY: u8 = 15;

/// Bounds of the feedback confidence nudge: one submission can move a
/// confidence by at most three points, and no amount of feedback moves it
/// by more than ten.
const FEEDBACK_SHIFT_CAP_PER_ENTRY: i16 = 3;
const FEEDBACK_SHIFT_CAP_TOTAL: i16 = 10;

/// Confidence-gap points per shift point when blending feedback.
const FEEDBACK_GAP_DIVISOR: f64 = 5.0;

/// One model-versus-reference comparison over the same concept.
struct ComparisonPair {
    concept: &'static str,
    model: f64,
    reference: f64,
}

/// Scores the reliability of the model-derived signals against the
/// deterministic reference calculators, derives the forward outlook, and
/// optionally blends aggregated human feedback into the confidences.
pub struct Judge {
    feedback: Arc<dyn FeedbackStore>,
}

impl Judge {
    pub fn new(feedback: Arc<dyn FeedbackStore>) -> Self {
        Self { feedback }
    }

    pub async fn run(
        &self,
        request: &AnalysisRequest,
        mut record: AnalysisRecord,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let pairs = comparison_pairs(request, &record);
        record.hallucination = Some(hallucination_metrics(&pairs));
        record.outlook = Some(future_perspective(&record));

        if request.flags.include_feedback {
            self.blend_feedback(&mut record).await;
        }

        Ok(record)
    }

    /// Nudge the qualitative confidences toward the accuracy reported by
    /// human reviewers of the previous analysis of this company. Raw scores
    /// and labels never move, only how much the report trusts them.
    async fn blend_feedback(&self, record: &mut AnalysisRecord) {
        let source_id = match &record.trend {
            Some(trend) => trend.previous_analysis_id,
            None => {
                tracing::debug!(company = %record.company, "no prior analysis, feedback blending skipped");
                return;
            }
        };

        let aggregated = match self.feedback.aggregate(source_id).await {
            Ok(aggregated) => aggregated,
            Err(e) => {
                tracing::warn!(error = %e, "feedback aggregation failed, blending skipped");
                return;
            }
        };
        let accuracy = match aggregated.get(&FeedbackType::Accuracy) {
            Some(accuracy) if accuracy.count > 0 => *accuracy,
            _ => return,
        };

        let confidences: Vec<u8> = [
            &record.tone.confidence,
            &record.ethical_flag.confidence,
            &record.risk_level.confidence,
            &record.source_authenticity.confidence,
        ]
        .into_iter()
        .copied()
        .filter(|c| *c > 0)
        .collect();
        if confidences.is_empty() {
            return;
        }
        let mean_confidence =
            confidences.iter().map(|c| *c as f64).sum::<f64>() / confidences.len() as f64;

        let cap = FEEDBACK_SHIFT_CAP_PER_ENTRY
            .saturating_mul(accuracy.count.min(100) as i16)
            .min(FEEDBACK_SHIFT_CAP_TOTAL);
        let raw = ((accuracy.mean_score - mean_confidence) / FEEDBACK_GAP_DIVISOR).round() as i16;
        let shift = raw.clamp(-cap, cap);

        nudge(&mut record.tone, shift);
        nudge(&mut record.ethical_flag, shift);
        nudge(&mut record.risk_level, shift);
        nudge(&mut record.source_authenticity, shift);

        record.feedback = Some(FeedbackAdjustment {
            source_analysis_id: source_id,
            entries: accuracy.count,
            accuracy_mean: accuracy.mean_score,
            confidence_shift: shift,
        });
    }
}

/// Shift an available signal's confidence, keeping it in [1, 100] so the
/// nudge can never turn an available signal into the unavailable sentinel.
fn nudge<T>(signal: &mut GradedSignal<T>, shift: i16) {
    if !signal.is_available() {
        return;
    }
    signal.confidence = (signal.confidence as i16 + shift).clamp(1, 100) as u8;
}

/// Assemble the comparable model/reference pairs that exist for this record:
/// the model's tone score against the lexicon score of the same document,
/// and the model's risk severity against the ratio-based baseline.
fn comparison_pairs(request: &AnalysisRequest, record: &AnalysisRecord) -> Vec<ComparisonPair> {
    let mut pairs = Vec::new();

    if record.tone.is_available() {
        if let Some(lexicon) = sentiment_lexicon::tone_score(&request.document, &[]) {
            pairs.push(ComparisonPair {
                concept: "tone",
                model: record.tone.score as f64,
                reference: lexicon.score,
            });
        }
    }

    if record.risk_level.is_available() {
        let default_financials = FinancialInputs::default();
        let financials = request.financials.as_ref().unwrap_or(&default_financials);
        if let Some(baseline) = fundamental_analysis::risk_baseline(financials) {
            pairs.push(ComparisonPair {
                concept: "risk",
                model: record.risk_level.score as f64,
                reference: baseline,
            });
        }
    }

    pairs
}

fn hallucination_metrics(pairs: &[ComparisonPair]) -> HallucinationMetrics {
    if pairs.is_empty() {
        return HallucinationMetrics {
            bias: 0.0,
            variance: 0.0,
            score: HS_NEUTRAL,
            confidence: 0,
            compared_pairs: 0,
            distribution_shape: "near-normal".to_string(),
            interpretation: "No comparable model/reference pairs; reliability unassessed."
                .to_string(),
        };
    }

    let diffs: Vec<f64> = pairs.iter().map(|p| p.model - p.reference).collect();
    let bias = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let variance =
        diffs.iter().map(|d| (d - bias).powi(2)).sum::<f64>() / diffs.len() as f64;

    let score = (100.0 - (bias.abs() + HS_SPREAD_WEIGHT * variance.sqrt()))
        .clamp(0.0, 100.0)
        .round() as u8;

    for pair in pairs {
        tracing::debug!(
            concept = pair.concept,
            model = pair.model,
            reference = pair.reference,
            "hallucination comparison"
        );
    }

    HallucinationMetrics {
        bias: round2(bias),
        variance: round2(variance),
        score,
        confidence: match pairs.len() {
            1 => 60,
            2 => 75,
            _ => 85,
        },
        compared_pairs: pairs.len(),
        distribution_shape: if variance > HS_SKEW_VARIANCE {
            "skewed".to_string()
        } else {
            "near-normal".to_string()
        },
        interpretation: interpret_hs(score).to_string(),
    }
}

fn interpret_hs(score: u8) -> &'static str {
    match score {
        s if s >= 80 => "Low bias and variance; model output is consistently grounded.",
        s if s >= 60 => "Minor factual drift; mostly stable grounding.",
        s if s >= 40 => "Moderate hallucination risk; cross-verify the model output.",
        _ => "High divergence between model output and independent calculation.",
    }
}

fn future_perspective(record: &AnalysisRecord) -> ForwardOutlook {
    let cii = record
        .integrity
        .as_ref()
        .map(|i| i.cii)
        .unwrap_or(NEUTRAL_SCORE) as f64;
    let cycle = record
        .cycle
        .as_ref()
        .map(|c| c.alignment_score)
        .unwrap_or(NEUTRAL_SCORE) as f64;
    let trend = record.trend.as_ref().map(|t| t.tit as f64);

    let trend_component = trend
        .map(|tit| (NEUTRAL_SCORE as f64 + FPP_TREND_SLOPE * tit).clamp(0.0, 100.0))
        .unwrap_or(NEUTRAL_SCORE as f64);

    let weighted = FPP_W_CII * cii + FPP_W_TREND * trend_component + FPP_W_CYCLE * cycle;

    let (outlook, forward_risk, mut confidence) = if weighted >= FPP_IMPROVING_FLOOR {
        (Outlook::Improving, RiskLevel::Low, 90u8)
    } else if weighted >= FPP_STABLE_FLOOR {
        (Outlook::Stable, RiskLevel::Moderate, 75u8)
    } else {
        (Outlook::Deteriorating, RiskLevel::High, 60u8)
    };
    if trend.is_none() {
        confidence = confidence.saturating_sub(FPP_NO_BASELINE_PENALTY);
    }

    let outlook_label = match outlook {
        Outlook::Improving => "improving",
        Outlook::Stable => "stable",
        Outlook::Deteriorating => "deteriorating",
    };

    ForwardOutlook {
        outlook,
        forward_risk,
        confidence,
        drivers: outlook_drivers(record),
        interpretation: format!(
            "Outlook is {} with {} forward risk at {}% confidence.",
            outlook_label,
            forward_risk.to_label(),
            confidence
        ),
    }
}

fn outlook_drivers(record: &AnalysisRecord) -> Vec<String> {
    let mut drivers = Vec::new();
    if record.ethical_flag.is_available() {
        if record.ethical_flag.score >= 70 {
            drivers.push("governance strength".to_string());
        } else if record.ethical_flag.score <= 40 {
            drivers.push("governance pressure".to_string());
        }
    }
    if record.risk_level.is_available() && record.risk_level.score >= 70 {
        drivers.push("elevated risk exposure".to_string());
    }
    if let Some(cycle) = &record.cycle {
        if cycle.alignment_score >= 70 {
            drivers.push("macro-cycle tailwind".to_string());
        } else if cycle.alignment_score <= 30 {
            drivers.push("macro-cycle headwind".to_string());
        }
    }
    if let Some(trend) = &record.trend {
        if trend.tit > 2 {
            drivers.push("improving integrity trend".to_string());
        } else if trend.tit < -2 {
            drivers.push("eroding integrity trend".to_string());
        }
    }
    if drivers.is_empty() {
        drivers.push("stable fundamentals".to_string());
    }
    drivers
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
