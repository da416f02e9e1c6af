use analysis_core::{CyclePhase, NEUTRAL_SCORE};
use serde::{Deserialize, Serialize};

/// One band of the macro business cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleBand {
    pub start: i32,
    pub end: i32,
    pub phase: CyclePhase,
    /// The most recent band is a forward projection, not observed history.
    pub projected: bool,
}

/// Pakistan's macro cycle in ten-year alternating phases. Bands are
/// contiguous and ordered; lookups outside the table clamp to the nearest
/// band instead of failing.
pub const CYCLE_BANDS: &[CycleBand] = &[
    CycleBand { start: 1947, end: 1957, phase: CyclePhase::Bearish, projected: false },
    CycleBand { start: 1958, end: 1968, phase: CyclePhase::Bullish, projected: false },
    CycleBand { start: 1969, end: 1979, phase: CyclePhase::Bearish, projected: false },
    CycleBand { start: 1980, end: 1990, phase: CyclePhase::Bullish, projected: false },
    CycleBand { start: 1991, end: 2001, phase: CyclePhase::Bearish, projected: false },
    CycleBand { start: 2002, end: 2012, phase: CyclePhase::Bullish, projected: false },
    CycleBand { start: 2013, end: 2023, phase: CyclePhase::Bearish, projected: false },
    CycleBand { start: 2024, end: 2034, phase: CyclePhase::Bullish, projected: true },
];

/// Band containing `year`, clamped to the first/last band for years outside
/// the table.
pub fn phase_for_year(year: i32) -> CycleBand {
    for band in CYCLE_BANDS {
        if year >= band.start && year <= band.end {
            return *band;
        }
    }
    if year < CYCLE_BANDS[0].start {
        CYCLE_BANDS[0]
    } else {
        CYCLE_BANDS[CYCLE_BANDS.len() - 1]
    }
}

/// Weights of the Cycle Alignment Score sub-terms.
const W_FINANCIAL_TREND: f64 = 0.35;
const W_MARKET_MOMENTUM: f64 = 0.25;
const W_SECTOR_CORRELATION: f64 = 0.25;
const W_MACRO_COHERENCE: f64 = 0.15;

/// Confidence when all four sub-terms are present; scaled down by the
/// fraction of missing sub-terms.
const CAS_FULL_CONFIDENCE: f64 = 90.0;

/// How many price points the financial-trend window looks back over.
const TREND_WINDOW: usize = 30;

/// Score points per percent of price change in the trend window.
const TREND_SLOPE: f64 = 2.5;

/// Sub-terms of the Cycle Alignment Score, each already normalized to
/// [0, 100]. A missing sub-term contributes the neutral 50 and lowers the
/// confidence of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CasInputs {
    pub financial_trend: Option<f64>,
    pub market_momentum: Option<f64>,
    pub sector_correlation: Option<f64>,
    pub macro_coherence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasResult {
    pub score: u8,
    pub confidence: u8,
}

/// CAS = 0.35·FinancialTrend + 0.25·MarketMomentum + 0.25·SectorCorrelation
///     + 0.15·MacroCoherence.
pub fn cycle_alignment(inputs: CasInputs) -> CasResult {
    let terms = [
        (inputs.financial_trend, W_FINANCIAL_TREND),
        (inputs.market_momentum, W_MARKET_MOMENTUM),
        (inputs.sector_correlation, W_SECTOR_CORRELATION),
        (inputs.macro_coherence, W_MACRO_COHERENCE),
    ];

    let mut weighted = 0.0;
    let mut present = 0usize;
    for (term, weight) in terms {
        let value = match term {
            Some(v) => {
                present += 1;
                v.clamp(0.0, 100.0)
            }
            None => NEUTRAL_SCORE as f64,
        };
        weighted += weight * value;
    }

    let confidence = (CAS_FULL_CONFIDENCE * present as f64 / terms.len() as f64).round();
    CasResult {
        score: weighted.round().clamp(0.0, 100.0) as u8,
        confidence: confidence as u8,
    }
}

/// Derive the CAS sub-terms that are computable from market data alone.
///
/// - Financial trend: percent change over the trailing `TREND_WINDOW` prices,
///   mapped around 50 at `TREND_SLOPE` points per percent.
/// - Market momentum: the RSI reading, already a 0-100 momentum measure.
/// - Sector correlation: requires a sector series that is not part of the
///   request, so it stays absent here.
/// - Macro coherence: agreement between the cycle phase and the price trend:
///   a rising series in a bullish band is coherent, the same series in a
///   bearish band is not.
pub fn cas_inputs_from_market(
    prices: &[f64],
    rsi_14: Option<f64>,
    phase: CyclePhase,
) -> CasInputs {
    let financial_trend = trend_score(prices);

    let macro_coherence = financial_trend.map(|trend| match phase {
        CyclePhase::Bullish => trend,
        CyclePhase::Bearish => 100.0 - trend,
    });

    CasInputs {
        financial_trend,
        market_momentum: rsi_14,
        sector_correlation: None,
        macro_coherence,
    }
}

fn trend_score(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }
    let window = if prices.len() > TREND_WINDOW {
        &prices[prices.len() - TREND_WINDOW..]
    } else {
        prices
    };
    let first = window[0];
    if first == 0.0 {
        return None;
    }
    let pct_change = (window[window.len() - 1] - first) / first * 100.0;
    Some((NEUTRAL_SCORE as f64 + TREND_SLOPE * pct_change).clamp(0.0, 100.0))
}
