#[cfg(test)]
mod tests {
    use super::super::analyzer::{proximity_score, snapshot};
    use super::super::indicators::*;
    use analysis_core::NEUTRAL_SCORE;

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    #[test]
    fn rsi_insufficient_data_returns_none() {
        let prices: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(rsi(&prices, RSI_PERIOD).is_none());
    }

    #[test]
    fn rsi_exactly_at_threshold_computes() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let value = rsi(&prices, RSI_PERIOD).unwrap();
        // Monotonic uptrend has no losses at all.
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_stays_in_range_on_real_prices() {
        let value = rsi(&sample_prices(), RSI_PERIOD).unwrap();
        assert!(value >= 0.0 && value <= 100.0);
    }

    #[test]
    fn rsi_monotonic_downtrend_is_zero() {
        let prices: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        let value = rsi(&prices, RSI_PERIOD).unwrap();
        assert!(value < 1e-9);
    }

    #[test]
    fn moving_average_insufficient_data_returns_none() {
        let prices: Vec<f64> = (0..199).map(|i| i as f64).collect();
        assert!(moving_average(&prices, MA_PERIOD).is_none());
    }

    #[test]
    fn moving_average_uses_trailing_window() {
        let mut prices = vec![0.0; 100];
        prices.extend(vec![10.0; 200]);
        let value = moving_average(&prices, MA_PERIOD).unwrap();
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn moving_average_within_price_bounds() {
        let prices: Vec<f64> = (0..250).map(|i| 50.0 + (i % 7) as f64).collect();
        let value = moving_average(&prices, MA_PERIOD).unwrap();
        let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(value >= min && value <= max);
    }

    #[test]
    fn snapshot_flags_short_series_as_insufficient() {
        let context = snapshot(&[101.0, 102.0, 100.5, 101.5, 102.5, 103.0, 102.0, 101.0]);
        assert!(!context.rsi_sufficient);
        assert!(!context.ma_sufficient);
        assert!(context.rsi_14.is_none());
        assert!(context.ma_200.is_none());
        assert_eq!(context.last_price, Some(101.0));
    }

    #[test]
    fn proximity_score_neutral_without_indicators() {
        let context = snapshot(&[100.0, 101.0]);
        let (score, confidence) = proximity_score(&context);
        assert_eq!(score, NEUTRAL_SCORE);
        assert_eq!(confidence, 0);
    }

    #[test]
    fn proximity_score_flat_series_splits_components() {
        // Flat series: RSI undefined-loss branch pins to 100, price == MA.
        let prices = vec![100.0; 250];
        let context = snapshot(&prices);
        let (score, confidence) = proximity_score(&context);
        // RSI of a flat series is 100 under the no-loss rule, so the RSI
        // component contributes 0 and the MA component contributes 100.
        assert_eq!(confidence, 90);
        assert_eq!(score, 50);
    }

    #[test]
    fn proximity_score_partial_data_reduces_confidence() {
        let context = snapshot(&sample_prices());
        assert!(context.rsi_sufficient);
        assert!(!context.ma_sufficient);
        let (_, confidence) = proximity_score(&context);
        assert_eq!(confidence, 55);
    }
}
