/// Window for the relative-strength index.
pub const RSI_PERIOD: usize = 14;

/// Window for the long moving average.
pub const MA_PERIOD: usize = 200;

/// Latest Wilder-smoothed RSI over `period`.
///
/// Seeds the averages with the simple mean of the first `period`
/// gains/losses, then applies the recursive
/// `(prev * (period - 1) + current) / period` smoothing. Returns `None` when
/// fewer than `period + 1` prices are supplied; a shorter series has no
/// complete change window and must surface as data-insufficient, never as a
/// fabricated value.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::with_capacity(prices.len() - 1);
    let mut losses = Vec::with_capacity(prices.len() - 1);
    for window in prices.windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// Arithmetic mean of the trailing `period` prices, or `None` when the
/// series is shorter than the window.
pub fn moving_average(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}
