use std::sync::Arc;

use analysis_core::{
    AnalysisError, AnalysisRecord, IntegrityBand, IntegrityIndex, IntegrityTrend, RecordStore,
    TrendClass, TrendDirection, NEUTRAL_SCORE, NOT_AVAILABLE,
};

/// Composite Integrity Index weights:
/// CII = 0.35·Ethics + 0.25·(100 − Risk) + 0.20·Technical + 0.20·CycleAlign.
///
/// Ethics and Technical are quality scores (higher is better); Risk is a
/// severity, not a confidence, so it enters inverted: higher severity pulls
/// the index down.
const W_ETHICS: f64 = 0.35;
const W_RISK: f64 = 0.25;
const W_TECHNICAL: f64 = 0.20;
const W_CYCLE: f64 = 0.20;

/// A temporal trend within ±2 index points counts as stable.
const TREND_STABLE_BAND: i16 = 2;

/// Cross-checks the executed record, derives the composite index, and
/// computes the temporal trend against the previous period.
///
/// The consistency pass is idempotent: any signal whose confidence is zero
/// is forced to the explicit "not available" sentinel, so a free-text value
/// is never trusted past a zero confidence.
pub struct Verifier {
    store: Arc<dyn RecordStore>,
}

impl Verifier {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, mut record: AnalysisRecord) -> Result<AnalysisRecord, AnalysisError> {
        self.consistency_pass(&mut record);

        let (score, confidence) = technical_analysis::proximity_score(&record.technical);
        record.technical.score = score;
        record.technical.confidence = confidence;

        let cii = self.composite_index(&record);
        let band = IntegrityBand::from_cii(cii);
        record.integrity = Some(IntegrityIndex {
            cii,
            band,
            interpretation: interpret_cii(band).to_string(),
        });
        record.summary = summary_line(&record, band);

        // A store failure only costs the trend, never the request: with no
        // readable baseline the trend is null, which is exactly what it
        // means.
        let previous = match self.store.get_previous(&record.company).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(error = %e, company = %record.company, "previous-record lookup failed, trend unavailable");
                None
            }
        };

        record.trend = previous.and_then(|prev| {
            prev.integrity.as_ref().map(|prev_integrity| {
                let tit = cii as i16 - prev_integrity.cii as i16;
                IntegrityTrend {
                    previous_analysis_id: prev.analysis_id,
                    previous_cii: prev_integrity.cii,
                    tit,
                    class: trend_class(tit),
                    direction: trend_direction(tit),
                }
            })
        });

        Ok(record)
    }

    /// Force every zero-confidence signal to the sentinel. Returns true when
    /// anything changed; a second application never changes the record again.
    pub fn consistency_pass(&self, record: &mut AnalysisRecord) -> bool {
        let mut changed = false;
        changed |= record.tone.normalize();
        changed |= record.ethical_flag.normalize();
        changed |= record.risk_level.normalize();
        changed |= record.source_authenticity.normalize();
        changed |= record.operational.cash_flow.normalize();
        changed |= record.operational.gross_margin.normalize();
        changed
    }

    fn composite_index(&self, record: &AnalysisRecord) -> u8 {
        let ethics = record.ethical_flag.score as f64;
        let risk = record.risk_level.score as f64;
        let technical = record.technical.score as f64;
        let cycle = record
            .cycle
            .as_ref()
            .map(|c| c.alignment_score)
            .unwrap_or(NEUTRAL_SCORE) as f64;

        let cii = W_ETHICS * ethics
            + W_RISK * (100.0 - risk)
            + W_TECHNICAL * technical
            + W_CYCLE * cycle;
        cii.round().clamp(0.0, 100.0) as u8
    }
}

fn trend_class(tit: i16) -> TrendClass {
    if tit > TREND_STABLE_BAND {
        TrendClass::Improving
    } else if tit < -TREND_STABLE_BAND {
        TrendClass::Declining
    } else {
        TrendClass::Stable
    }
}

fn trend_direction(tit: i16) -> TrendDirection {
    if tit > TREND_STABLE_BAND {
        TrendDirection::Up
    } else if tit < -TREND_STABLE_BAND {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

fn interpret_cii(band: IntegrityBand) -> &'static str {
    match band {
        IntegrityBand::Strong => "Company demonstrates strong ethical-financial integrity.",
        IntegrityBand::Moderate => {
            "Company maintains a reasonable governance balance with some risk."
        }
        IntegrityBand::Weak => "Company integrity is under strain; governance issues visible.",
        IntegrityBand::Critical => "Severe governance or ethical distress detected.",
    }
}

fn summary_line(record: &AnalysisRecord, band: IntegrityBand) -> String {
    let ethics = record
        .ethical_flag
        .value
        .known()
        .map(|e| e.to_label())
        .unwrap_or(NOT_AVAILABLE);
    let risk = record
        .risk_level
        .value
        .known()
        .map(|r| r.to_label())
        .unwrap_or(NOT_AVAILABLE);
    format!(
        "{} integrity profile: {} governance posture, {} risk exposure.",
        band.to_label(),
        ethics,
        risk
    )
}
