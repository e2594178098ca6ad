// src/error.rs
use crate::models::Timeframe;
use thiserror::Error;

/// Failures of the analytical core.
///
/// Degenerate divisions (zero average loss in RSI, zero mean price in the
/// volatility ratio) are not represented here: they are resolved with
/// saturation values where they happen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Insufficient data for {timeframe}: {usable} usable bars, {required} required")]
    InsufficientData {
        timeframe: Timeframe,
        usable: usize,
        required: usize,
    },

    #[error("Incomplete cycle: missing timeframes {missing:?}")]
    IncompleteCycle { missing: Vec<Timeframe> },

    #[error("Invalid series for {timeframe}: {reason}")]
    InvalidSeries { timeframe: Timeframe, reason: String },

    #[error("Invalid bar: {0}")]
    InvalidBar(String),
}
