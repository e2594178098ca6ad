pub mod ema;
pub mod pivots;
pub mod rsi;

pub use pivots::{PivotPoints, Swings};

use crate::error::AnalysisError;
use crate::models::{Bar, Timeframe};
use serde::{Deserialize, Serialize};

/// A bar whose RSI and EMA are both defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBar {
    pub bar: Bar,
    pub rsi: f64,
    pub ema: f64,
}

/// Bars of one timeframe with their indicator columns. Indicator values stay
/// `None` until their window is filled.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    timeframe: Timeframe,
    bars: Vec<Bar>,
    rsi: Vec<Option<f64>>,
    ema: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Validates ordering and prices, then computes RSI and EMA.
    pub fn compute(
        timeframe: Timeframe,
        bars: Vec<Bar>,
        rsi_period: usize,
        ema_span: usize,
    ) -> Result<Self, AnalysisError> {
        validate_series(timeframe, &bars)?;

        let required = rsi_period + 1;
        if bars.len() < required {
            return Err(AnalysisError::InsufficientData {
                timeframe,
                usable: bars.len(),
                required,
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let rsi = rsi::rsi(&closes, rsi_period);
        let ema = ema::ema(&closes, ema_span);

        Ok(Self {
            timeframe,
            bars,
            rsi,
            ema,
        })
    }

    /// Drops warm-up rows. Fails when fewer than `min_usable` rows remain.
    pub fn warmed(&self, min_usable: usize) -> Result<Vec<IndicatorBar>, AnalysisError> {
        let rows: Vec<IndicatorBar> = self
            .bars
            .iter()
            .zip(self.rsi.iter().zip(self.ema.iter()))
            .filter_map(|(bar, (rsi, ema))| match (rsi, ema) {
                (Some(rsi), Some(ema)) => Some(IndicatorBar {
                    bar: *bar,
                    rsi: *rsi,
                    ema: *ema,
                }),
                _ => None,
            })
            .collect();

        if rows.len() < min_usable {
            return Err(AnalysisError::InsufficientData {
                timeframe: self.timeframe,
                usable: rows.len(),
                required: min_usable,
            });
        }

        Ok(rows)
    }
}

fn validate_series(timeframe: Timeframe, bars: &[Bar]) -> Result<(), AnalysisError> {
    for bar in bars {
        bar.validate().map_err(|e| AnalysisError::InvalidSeries {
            timeframe,
            reason: e.to_string(),
        })?;
    }

    if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(AnalysisError::InvalidSeries {
            timeframe,
            reason: format!(
                "timestamps not strictly increasing at {}",
                pair[1].timestamp.to_rfc3339()
            ),
        });
    }

    Ok(())
}
