use analysis_core::{TechnicalContext, NEUTRAL_SCORE};

use crate::indicators::{moving_average, rsi, MA_PERIOD, RSI_PERIOD};

/// Confidence attached to the proximity score when both indicators computed.
const FULL_CONFIDENCE: u8 = 90;

/// Confidence when only one of RSI/MA had enough data.
const PARTIAL_CONFIDENCE: u8 = 55;

/// Penalty slope for price deviation from the long moving average: each
/// percent of deviation costs five score points.
const MA_DEVIATION_SLOPE: f64 = 5.0;

/// Compute the raw RSI(14)/MA(200) snapshot for an ordered price series.
///
/// Sufficiency flags record whether each window was actually met; the score
/// and confidence stay at their neutral defaults here; deriving them is the
/// verification stage's job.
pub fn snapshot(prices: &[f64]) -> TechnicalContext {
    let rsi_14 = rsi(prices, RSI_PERIOD);
    let ma_200 = moving_average(prices, MA_PERIOD);
    TechnicalContext {
        rsi_14,
        ma_200,
        rsi_sufficient: rsi_14.is_some(),
        ma_sufficient: ma_200.is_some(),
        last_price: prices.last().copied(),
        score: NEUTRAL_SCORE,
        confidence: 0,
    }
}

/// Proximity-to-neutral score over the snapshot, 0-100.
///
/// An RSI at 50 and a price sitting on its MA(200) are the calmest possible
/// technical picture and score 100; deep overbought/oversold readings or a
/// price far from its long average pull the score toward 0. The score is the
/// mean of the available components; with neither indicator available it
/// stays at the neutral default with zero confidence.
pub fn proximity_score(context: &TechnicalContext) -> (u8, u8) {
    let rsi_component = context.rsi_14.map(|value| 100.0 - 2.0 * (value - 50.0).abs());

    let ma_component = match (context.last_price, context.ma_200) {
        (Some(price), Some(ma)) if ma > 0.0 => {
            let deviation_pct = ((price / ma) - 1.0).abs() * 100.0;
            Some((100.0 - deviation_pct * MA_DEVIATION_SLOPE).clamp(0.0, 100.0))
        }
        _ => None,
    };

    let components: Vec<f64> = [rsi_component, ma_component]
        .into_iter()
        .flatten()
        .collect();

    match components.len() {
        0 => (NEUTRAL_SCORE, 0),
        n => {
            let mean = components.iter().sum::<f64>() / n as f64;
            let confidence = if n == 2 { FULL_CONFIDENCE } else { PARTIAL_CONFIDENCE };
            (mean.round().clamp(0.0, 100.0) as u8, confidence)
        }
    }
}
