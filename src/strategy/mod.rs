use std::collections::BTreeMap;

use itertools::Itertools;
use log::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, trend, TimeframeAnalysis};
use crate::error::AnalysisError;
use crate::models::{
    Bar, Classification, Confidence, Divergence, PatternKind, SignalResult, Timeframe, TrendLabel,
};

/// How the engine turns aggregated timeframe outputs into a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Alignment, structural pattern, distance to zone, then momentum.
    Structural,
    /// Alignment and momentum only, for sources without usable structure.
    AlignmentOnly,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub rsi_period: usize,
    pub ema_span: usize,
    pub min_usable_bars: usize,
    pub swing_window: usize,
    pub zone_min_distance: usize,
    pub zone_min_price_delta: f64,
    pub pattern_min_separation: usize,
    pub volatility_gate: f64,
    pub high_confidence_volatility: f64,
    pub max_zone_distance: f64,
    pub buy_rsi_floor: f64,
    pub sell_rsi_ceiling: f64,
    pub long_stop_factor: f64,
    pub short_stop_factor: f64,
    pub divergence_lookback: usize,
    pub mode: DecisionMode,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_span: 21,
            min_usable_bars: 15,
            swing_window: 3,
            zone_min_distance: 3,
            zone_min_price_delta: 0.001,
            pattern_min_separation: 5,
            volatility_gate: 0.015,
            high_confidence_volatility: 0.01,
            max_zone_distance: 0.008,
            buy_rsi_floor: 40.0,
            sell_rsi_ceiling: 60.0,
            long_stop_factor: 0.995,
            short_stop_factor: 1.005,
            divergence_lookback: 5,
            mode: DecisionMode::Structural,
        }
    }
}

/// The directional half of a decision. Bullish and bearish paths are
/// mirror images that differ only in these parameters.
#[derive(Debug, Clone, Copy)]
enum Side {
    Long,
    Short,
}

impl Side {
    fn pattern(self) -> PatternKind {
        match self {
            Side::Long => PatternKind::WBase,
            Side::Short => PatternKind::MBase,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Side::Long => "bullish",
            Side::Short => "bearish",
        }
    }

    fn zone_name(self) -> &'static str {
        match self {
            Side::Long => "support",
            Side::Short => "resistance",
        }
    }

    fn entry(self) -> Classification {
        match self {
            Side::Long => Classification::Buy,
            Side::Short => Classification::Sell,
        }
    }

    fn divergence(self) -> Divergence {
        match self {
            Side::Long => Divergence::Bullish,
            Side::Short => Divergence::Bearish,
        }
    }
}

struct Decision {
    classification: Classification,
    rationale: String,
    stop_loss: Option<f64>,
    zone_kind: Option<PatternKind>,
    confidence: Option<Confidence>,
}

/// Aggregates per-timeframe analyses into one signal per cycle.
///
/// The engine is stateless: every call is a pure function of the bars or
/// analyses handed to it.
#[derive(Debug, Clone, Default)]
pub struct SignalEngine {
    config: StrategyConfig,
}

impl SignalEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Full cycle: parallel per-timeframe analysis, then the decision.
    pub fn evaluate(&self, inputs: BTreeMap<Timeframe, Vec<Bar>>) -> Result<SignalResult, AnalysisError> {
        let analyses: BTreeMap<Timeframe, TimeframeAnalysis> = analysis::analyze_all(inputs, &self.config)
            .into_iter()
            .filter_map(|(timeframe, result)| result.ok().map(|a| (timeframe, a)))
            .collect();

        self.decide(&analyses)
    }

    pub fn decide(&self, analyses: &BTreeMap<Timeframe, TimeframeAnalysis>) -> Result<SignalResult, AnalysisError> {
        let missing: Vec<Timeframe> = Timeframe::REQUIRED
            .iter()
            .filter(|tf| !analyses.contains_key(*tf))
            .copied()
            .collect();

        let (d1, h4, m15) = match (
            analyses.get(&Timeframe::D1),
            analyses.get(&Timeframe::H4),
            analyses.get(&Timeframe::M15),
        ) {
            (Some(d1), Some(h4), Some(m15)) => (d1, h4, m15),
            _ => return Err(AnalysisError::IncompleteCycle { missing }),
        };

        let alignment = trend::alignment(d1.trend, h4.trend);
        let rsi_m15 = m15.latest.rsi;

        let decision = match (self.config.mode, alignment) {
            (DecisionMode::Structural, TrendLabel::Bullish) => self.structural(Side::Long, analyses, h4, m15),
            (DecisionMode::Structural, TrendLabel::Bearish) => self.structural(Side::Short, analyses, h4, m15),
            (DecisionMode::AlignmentOnly, TrendLabel::Bullish) => Some(self.momentum_only(Side::Long, m15)),
            (DecisionMode::AlignmentOnly, TrendLabel::Bearish) => Some(self.momentum_only(Side::Short, m15)),
            _ => None,
        };

        let decision = decision.unwrap_or_else(|| Decision {
            classification: Classification::Wait,
            rationale: format!(
                "structure not confirmed (D1 {}, H4 {})",
                d1.trend, h4.trend
            ),
            stop_loss: None,
            zone_kind: None,
            confidence: None,
        });

        let trends = analyses.iter().map(|(tf, a)| (*tf, a.trend)).collect();

        info!(
            "Decision {} at {:.2}: {}",
            decision.classification, m15.latest.bar.close, decision.rationale
        );

        Ok(SignalResult {
            classification: decision.classification,
            rationale: decision.rationale,
            price: m15.latest.bar.close,
            stop_loss: decision.stop_loss,
            zone_kind: decision.zone_kind,
            confidence: decision.confidence,
            as_of: m15.latest.bar.timestamp,
            alignment,
            trends,
            rsi_m15,
            divergence: m15.divergence,
        })
    }

    /// `None` when no mandatory timeframe produced the side's pattern.
    fn structural(
        &self,
        side: Side,
        analyses: &BTreeMap<Timeframe, TimeframeAnalysis>,
        h4: &TimeframeAnalysis,
        m15: &TimeframeAnalysis,
    ) -> Option<Decision> {
        let kind = side.pattern();
        let patterns: Vec<_> = Timeframe::REQUIRED
            .iter()
            .filter_map(|tf| analyses.get(tf))
            .filter_map(|a| a.patterns.get(kind))
            .collect();

        let confidence = patterns.iter().map(|p| p.confidence).max()?;
        let sources = patterns
            .iter()
            .map(|p| format!("{} {} ({})", kind, p.timeframe, p.confidence))
            .join(", ");

        let zone = match side {
            Side::Long => h4.latest_support(),
            Side::Short => h4.latest_resistance(),
        };
        let price = m15.latest.bar.close;
        let distance = zone_distance(price, zone.map(|z| z.price));
        let zone_text = match zone {
            Some(z) => format!("{:.2}% from H4 {} {:.2}", distance * 100.0, side.zone_name(), z.price),
            None => format!("no H4 {}", side.zone_name()),
        };

        let rsi = m15.latest.rsi;
        let mut decision = Decision {
            classification: Classification::Wait,
            rationale: String::new(),
            stop_loss: None,
            zone_kind: Some(kind),
            confidence: Some(confidence),
        };

        if distance >= self.config.max_zone_distance {
            decision.rationale = format!(
                "{} aligned, {}; price away from structural {}: {}",
                side.label(),
                sources,
                side.zone_name(),
                zone_text
            );
        } else if self.momentum_ok(side, rsi) {
            decision.classification = side.entry();
            decision.stop_loss = Some(self.stop_loss(side, &m15.latest.bar));
            decision.rationale = format!(
                "{} aligned, {}; price {}, RSI M15 {:.1}",
                side.label(),
                sources,
                zone_text,
                rsi
            );
            if m15.divergence == side.divergence() {
                decision.rationale.push_str(&format!(" + {}", side.divergence()));
            }
        } else {
            decision.classification = Classification::Reject;
            decision.rationale = format!(
                "{} aligned, {}; momentum too weak (RSI M15 {:.1})",
                side.label(),
                sources,
                rsi
            );
        }

        Some(decision)
    }

    fn momentum_only(&self, side: Side, m15: &TimeframeAnalysis) -> Decision {
        let rsi = m15.latest.rsi;
        if self.momentum_ok(side, rsi) {
            let mut rationale = format!("{} trend confirmed on D1/H4, RSI M15 {:.1}", side.label(), rsi);
            if m15.divergence == side.divergence() {
                rationale.push_str(&format!(" + {}", side.divergence()));
            }
            Decision {
                classification: side.entry(),
                rationale,
                stop_loss: Some(self.stop_loss(side, &m15.latest.bar)),
                zone_kind: None,
                confidence: Some(Confidence::Media),
            }
        } else {
            Decision {
                classification: Classification::Reject,
                rationale: format!(
                    "{} trend confirmed on D1/H4 but momentum too weak (RSI M15 {:.1})",
                    side.label(),
                    rsi
                ),
                stop_loss: None,
                zone_kind: None,
                confidence: None,
            }
        }
    }

    fn momentum_ok(&self, side: Side, rsi: f64) -> bool {
        match side {
            Side::Long => rsi >= self.config.buy_rsi_floor,
            Side::Short => rsi <= self.config.sell_rsi_ceiling,
        }
    }

    fn stop_loss(&self, side: Side, bar: &Bar) -> f64 {
        match side {
            Side::Long => bar.low * self.config.long_stop_factor,
            Side::Short => bar.high * self.config.short_stop_factor,
        }
    }
}

/// Relative distance from price to a zone; 1.0 when there is no usable zone.
pub fn zone_distance(price: f64, zone: Option<f64>) -> f64 {
    match zone {
        Some(level) if level > 0.0 => (price - level).abs() / level,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_distance() {
        assert!((zone_distance(1809.0, Some(1800.0)) - 0.005).abs() < 1e-12);
        assert!((zone_distance(1791.0, Some(1800.0)) - 0.005).abs() < 1e-12);
        assert_eq!(zone_distance(1800.0, None), 1.0);
        assert_eq!(zone_distance(1800.0, Some(0.0)), 1.0);
    }

    #[test]
    fn test_config_defaults_from_partial_toml() {
        let config: StrategyConfig = toml::from_str("max_zone_distance = 0.01\nmode = \"alignment_only\"").unwrap();
        assert_eq!(config.max_zone_distance, 0.01);
        assert_eq!(config.mode, DecisionMode::AlignmentOnly);
        assert_eq!(config.volatility_gate, 0.015);
        assert_eq!(config.rsi_period, 14);
    }
}
