use crate::indicators::IndicatorBar;
use crate::models::Divergence;

/// Compares the latest bar with the first bar of the trailing `lookback`
/// window. Fewer than `lookback` rows is never an error, just no divergence.
pub fn detect_divergence(rows: &[IndicatorBar], lookback: usize) -> Divergence {
    if lookback < 2 || rows.len() < lookback {
        return Divergence::None;
    }

    let window = &rows[rows.len() - lookback..];
    let (prior, latest) = (&window[0], &window[lookback - 1]);

    if latest.bar.close < prior.bar.close && latest.rsi > prior.rsi {
        Divergence::Bullish
    } else if latest.bar.close > prior.bar.close && latest.rsi < prior.rsi {
        Divergence::Bearish
    } else {
        Divergence::None
    }
}
