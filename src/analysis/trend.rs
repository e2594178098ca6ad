use crate::indicators::IndicatorBar;
use crate::models::TrendLabel;

const RSI_MIDLINE: f64 = 50.0;

pub fn classify_trend(row: &IndicatorBar) -> TrendLabel {
    let close = row.bar.close;
    if close > row.ema && row.rsi > RSI_MIDLINE {
        TrendLabel::Bullish
    } else if close < row.ema && row.rsi < RSI_MIDLINE {
        TrendLabel::Bearish
    } else {
        TrendLabel::Neutral
    }
}

/// Bullish or bearish only when both labels agree on that direction.
pub fn alignment(d1: TrendLabel, h4: TrendLabel) -> TrendLabel {
    match (d1, h4) {
        (TrendLabel::Bullish, TrendLabel::Bullish) => TrendLabel::Bullish,
        (TrendLabel::Bearish, TrendLabel::Bearish) => TrendLabel::Bearish,
        _ => TrendLabel::Neutral,
    }
}
