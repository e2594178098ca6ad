/// Relative strength index over a rolling simple mean of gains and losses.
///
/// Entry `i` is `None` until `period` price changes ending at `i` exist, so
/// the first defined value sits at index `period`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return values;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..closes.len() {
        // deltas[k] is the change ending at closes[k + 1]
        let window = &deltas[i - period..i];
        let avg_gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
        values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    values
}

/// Zero average loss is an infinite gain/loss ratio: RSI saturates at 100.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
