use analysis_core::{
    CashFlowAssessment, FinancialInputs, GradedSignal, MarginEffect, OperationalContext,
    NEUTRAL_SCORE,
};

/// Current-ratio floor for a comfortably funded operation.
const CURRENT_RATIO_HEALTHY: f64 = 1.2;

/// Below this the company cannot cover near-term liabilities.
const CURRENT_RATIO_STRAINED: f64 = 1.0;

/// Debt-to-equity ceiling before leverage dominates the assessment.
const DEBT_EQUITY_HEALTHY: f64 = 2.0;

/// Above this leverage alone flags the cash-flow position negative.
const DEBT_EQUITY_STRESSED: f64 = 3.0;

/// Confidence tiers for the cash-flow assessment.
const OCF_FULL_CONFIDENCE: u8 = 85;
const OCF_NEGATIVE_CONFIDENCE: u8 = 80;
const OCF_MIXED_CONFIDENCE: u8 = 55;
const OCF_INSUFFICIENT_CONFIDENCE: u8 = 35;

/// Gross-margin slope (in margin fraction per period window) beyond which
/// the trajectory counts as expanding/contracting.
const MARGIN_TREND_THRESHOLD: f64 = 0.02;

const GME_LONG_CONFIDENCE: u8 = 75;
const GME_SHORT_CONFIDENCE: u8 = 55;

/// Weights of the ratio-based risk baseline.
const ALPHA_CREDIT: f64 = 0.40;
const BETA_LIQUIDITY: f64 = 0.35;
const GAMMA_VOLATILITY: f64 = 0.25;

/// Volatility window for the risk baseline (periods of the price series).
const VOLATILITY_WINDOW: usize = 30;

/// Debt/equity ratio; `None` when either side is absent or equity is zero.
/// Absence must stay explicit; a defaulted zero would fabricate a riskless
/// balance sheet.
pub fn debt_to_equity(inputs: &FinancialInputs) -> Option<f64> {
    match (inputs.total_debt, inputs.total_equity) {
        (Some(debt), Some(equity)) if equity != 0.0 => Some(debt / equity),
        _ => None,
    }
}

/// Current assets over current liabilities; `None` when unavailable.
pub fn current_ratio(inputs: &FinancialInputs) -> Option<f64> {
    match (inputs.current_assets, inputs.current_liabilities) {
        (Some(assets), Some(liabilities)) if liabilities != 0.0 => Some(assets / liabilities),
        _ => None,
    }
}

/// Operational metrics derived from the structured financial inputs:
/// cash-flow sufficiency from the liquidity/leverage ratios and the
/// gross-margin trajectory from the revenue/cost history.
pub fn operational_metrics(inputs: &FinancialInputs) -> OperationalContext {
    let dte = debt_to_equity(inputs);
    let cr = current_ratio(inputs);

    OperationalContext {
        cash_flow: cash_flow_assessment(cr, dte),
        gross_margin: gross_margin_effect(&inputs.revenue_history, &inputs.cost_history),
        debt_to_equity: dte,
        current_ratio: cr,
    }
}

fn cash_flow_assessment(
    cr: Option<f64>,
    dte: Option<f64>,
) -> GradedSignal<CashFlowAssessment> {
    if cr.is_none() && dte.is_none() {
        // We know the data is missing, which is itself an assessment,
        // distinct from the zero-confidence sentinel of a failed signal.
        return GradedSignal::known(
            CashFlowAssessment::InsufficientData,
            NEUTRAL_SCORE,
            OCF_INSUFFICIENT_CONFIDENCE,
        );
    }

    let strained = cr.is_some_and(|v| v < CURRENT_RATIO_STRAINED)
        || dte.is_some_and(|v| v > DEBT_EQUITY_STRESSED);
    let healthy = cr.map_or(true, |v| v >= CURRENT_RATIO_HEALTHY)
        && dte.map_or(true, |v| v <= DEBT_EQUITY_HEALTHY);
    let both_present = cr.is_some() && dte.is_some();

    let score = cash_flow_score(cr, dte);
    if strained {
        GradedSignal::known(CashFlowAssessment::Negative, score, OCF_NEGATIVE_CONFIDENCE)
    } else if healthy && both_present {
        GradedSignal::known(CashFlowAssessment::Positive, score, OCF_FULL_CONFIDENCE)
    } else {
        GradedSignal::known(CashFlowAssessment::Positive, score, OCF_MIXED_CONFIDENCE)
    }
}

/// Continuous 0-100 backing score for the cash-flow assessment. Centered on
/// 50; liquidity above/below the strained threshold and leverage around the
/// healthy ceiling move it in opposite directions.
fn cash_flow_score(cr: Option<f64>, dte: Option<f64>) -> u8 {
    let mut score = NEUTRAL_SCORE as f64;
    if let Some(cr) = cr {
        score += ((cr - CURRENT_RATIO_STRAINED) * 40.0).clamp(-25.0, 25.0);
    }
    if let Some(dte) = dte {
        score -= ((dte - DEBT_EQUITY_HEALTHY) * 10.0).clamp(-15.0, 20.0);
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Gross-margin trajectory from aligned revenue/cost histories. With fewer
/// than two usable periods the signal is unavailable.
fn gross_margin_effect(revenue: &[f64], cost: &[f64]) -> GradedSignal<MarginEffect> {
    let periods = revenue.len().min(cost.len());
    if periods < 2 {
        return GradedSignal::not_available();
    }

    let margins: Vec<f64> = revenue[..periods]
        .iter()
        .zip(&cost[..periods])
        .filter(|(rev, _)| **rev != 0.0)
        .map(|(rev, cost)| (rev - cost) / rev)
        .collect();
    if margins.len() < 2 {
        return GradedSignal::not_available();
    }

    let slope = margins[margins.len() - 1] - margins[0];
    let effect = if slope > MARGIN_TREND_THRESHOLD {
        MarginEffect::Expanding
    } else if slope < -MARGIN_TREND_THRESHOLD {
        MarginEffect::Contracting
    } else {
        MarginEffect::Stable
    };

    let score = (NEUTRAL_SCORE as f64 + slope * 500.0).round().clamp(0.0, 100.0) as u8;
    let confidence = if margins.len() >= 4 {
        GME_LONG_CONFIDENCE
    } else {
        GME_SHORT_CONFIDENCE
    };
    GradedSignal::known(effect, score, confidence)
}

/// Ratio-weighted risk severity on the 0-100 scale (higher = riskier),
/// independent of any model output; the reference side of the Judge's risk
/// comparison.
///
/// Sub-scores, each normalized to [0, 100] before weighting:
/// - credit: debt/equity of 0 scores 0, 4.0 or more scores 100;
/// - liquidity: current ratio of 2.0 or more scores 0, 0.5 or less 100;
/// - volatility: stdev of percent returns over the trailing 30 periods,
///   0% scoring 0 and 5% or more scoring 100.
///
/// Weights are renormalized over the available sub-scores; `None` when no
/// sub-score is computable.
pub fn risk_baseline(inputs: &FinancialInputs) -> Option<f64> {
    let credit = debt_to_equity(inputs).map(|dte| (dte / 4.0 * 100.0).clamp(0.0, 100.0));
    let liquidity = current_ratio(inputs).map(|cr| ((2.0 - cr) / 1.5 * 100.0).clamp(0.0, 100.0));
    let volatility =
        return_volatility(&inputs.stock_prices).map(|vol| (vol / 5.0 * 100.0).clamp(0.0, 100.0));

    let terms = [
        (credit, ALPHA_CREDIT),
        (liquidity, BETA_LIQUIDITY),
        (volatility, GAMMA_VOLATILITY),
    ];

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (term, weight) in terms {
        if let Some(value) = term {
            weighted += weight * value;
            weight_sum += weight;
        }
    }
    if weight_sum == 0.0 {
        return None;
    }
    Some(weighted / weight_sum)
}

/// Population standard deviation of percent returns over the trailing
/// window, in percent. `None` with fewer than three prices.
fn return_volatility(prices: &[f64]) -> Option<f64> {
    if prices.len() < 3 {
        return None;
    }
    let window = if prices.len() > VOLATILITY_WINDOW {
        &prices[prices.len() - VOLATILITY_WINDOW..]
    } else {
        prices
    };
    let returns: Vec<f64> = window
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0] * 100.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    Some(variance.sqrt())
}
