//! Per-timeframe pipeline: indicators, swing points, zone ladders, patterns,
//! trend and (on M15 only) divergence.

pub mod divergence;
pub mod patterns;
pub mod trend;
pub mod zones;

pub use patterns::PatternSet;

use crate::error::AnalysisError;
use crate::indicators::{IndicatorBar, IndicatorSeries, PivotPoints};
use crate::models::{Bar, Divergence, SwingPoint, Timeframe, TrendLabel};
use crate::strategy::StrategyConfig;
use log::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Everything the decision engine needs from one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeAnalysis {
    pub timeframe: Timeframe,
    pub latest: IndicatorBar,
    pub trend: TrendLabel,
    /// Filtered support ladder, oldest first.
    pub supports: Vec<SwingPoint>,
    /// Filtered resistance ladder, oldest first.
    pub resistances: Vec<SwingPoint>,
    pub patterns: PatternSet,
    pub divergence: Divergence,
}

impl TimeframeAnalysis {
    pub fn latest_support(&self) -> Option<&SwingPoint> {
        self.supports.last()
    }

    pub fn latest_resistance(&self) -> Option<&SwingPoint> {
        self.resistances.last()
    }
}

pub fn analyze_timeframe(
    timeframe: Timeframe,
    bars: Vec<Bar>,
    config: &StrategyConfig,
) -> Result<TimeframeAnalysis, AnalysisError> {
    let series = IndicatorSeries::compute(timeframe, bars, config.rsi_period, config.ema_span)?;
    let rows = series.warmed(config.min_usable_bars)?;

    let latest = match rows.last() {
        Some(row) => *row,
        None => {
            return Err(AnalysisError::InsufficientData {
                timeframe,
                usable: 0,
                required: config.min_usable_bars,
            })
        }
    };

    let bars: Vec<Bar> = rows.iter().map(|r| r.bar).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let swings = PivotPoints::new(config.swing_window).identify_pivots(&bars);
    let supports = zones::filter_zones(&swings.supports, config.zone_min_distance, config.zone_min_price_delta);
    let resistances = zones::filter_zones(&swings.resistances, config.zone_min_distance, config.zone_min_price_delta);

    let patterns = patterns::detect_patterns(timeframe, &closes, &supports, &resistances, config);

    let divergence = if timeframe == Timeframe::M15 {
        divergence::detect_divergence(&rows, config.divergence_lookback)
    } else {
        Divergence::None
    };

    let trend = trend::classify_trend(&latest);

    debug!(
        "{}: {} rows, trend {}, {} supports, {} resistances, patterns {:?}",
        timeframe,
        rows.len(),
        trend,
        supports.len(),
        resistances.len(),
        patterns.iter().map(|p| p.kind).collect::<Vec<_>>()
    );

    Ok(TimeframeAnalysis {
        timeframe,
        latest,
        trend,
        supports,
        resistances,
        patterns,
        divergence,
    })
}

/// Runs every timeframe pipeline in parallel and joins the results.
/// Failed timeframes are kept as errors so the caller can decide whether
/// they matter.
pub fn analyze_all(
    inputs: BTreeMap<Timeframe, Vec<Bar>>,
    config: &StrategyConfig,
) -> BTreeMap<Timeframe, Result<TimeframeAnalysis, AnalysisError>> {
    inputs
        .into_par_iter()
        .map(|(timeframe, bars)| {
            let result = analyze_timeframe(timeframe, bars, config);
            if let Err(e) = &result {
                if timeframe.is_required() {
                    warn!("Excluding {} from this cycle: {}", timeframe, e);
                } else {
                    info!("Skipping {} this cycle: {}", timeframe, e);
                }
            }
            (timeframe, result)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
