use crate::models::{Confidence, Pattern, PatternKind, SwingPoint, Timeframe};
use crate::strategy::StrategyConfig;
use log::*;
use statrs::statistics::Statistics;

/// At most one accumulation and one distribution pattern per timeframe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatternSet {
    pub accumulation: Option<Pattern>,
    pub distribution: Option<Pattern>,
}

impl PatternSet {
    pub fn get(&self, kind: PatternKind) -> Option<&Pattern> {
        match kind {
            PatternKind::WBase => self.accumulation.as_ref(),
            PatternKind::MBase => self.distribution.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.accumulation.iter().chain(self.distribution.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.accumulation.is_none() && self.distribution.is_none()
    }
}

/// Looks for a W base on the support ladder and an M base on the resistance
/// ladder. `closes` must be the series the zone indices point into.
pub fn detect_patterns(
    timeframe: Timeframe,
    closes: &[f64],
    supports: &[SwingPoint],
    resistances: &[SwingPoint],
    config: &StrategyConfig,
) -> PatternSet {
    PatternSet {
        accumulation: base_pattern(PatternKind::WBase, timeframe, closes, supports, config),
        distribution: base_pattern(PatternKind::MBase, timeframe, closes, resistances, config),
    }
}

fn base_pattern(
    kind: PatternKind,
    timeframe: Timeframe,
    closes: &[f64],
    zones: &[SwingPoint],
    config: &StrategyConfig,
) -> Option<Pattern> {
    let [prev, last] = match zones {
        [.., prev, last] => [prev, last],
        _ => return None,
    };

    let structural = match kind {
        PatternKind::WBase => last.price > prev.price,
        PatternKind::MBase => last.price < prev.price,
    };
    if !structural || last.index <= prev.index + config.pattern_min_separation {
        return None;
    }

    let window = closes.get(prev.index..last.index)?;
    let volatility = close_volatility(window);
    if volatility.is_nan() || volatility >= config.volatility_gate {
        debug!(
            "{} {} rejected on {}: volatility {:.4} >= {:.4}",
            timeframe, kind, last.timestamp, volatility, config.volatility_gate
        );
        return None;
    }

    let confidence = if volatility < config.high_confidence_volatility {
        Confidence::Alta
    } else {
        Confidence::Media
    };

    Some(Pattern {
        kind,
        price: last.price,
        confidence,
        start: prev.timestamp,
        end: last.timestamp,
        timeframe,
        volatility,
    })
}

/// Sample standard deviation over mean. A non-positive or undefined mean
/// yields infinity, which no volatility gate accepts.
pub fn close_volatility(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return f64::INFINITY;
    }
    let mean = closes.iter().mean();
    if mean.is_nan() || mean <= 0.0 {
        return f64::INFINITY;
    }
    closes.iter().std_dev() / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SwingKind;
    use chrono::{Duration, TimeZone, Utc};

    fn zone(kind: SwingKind, index: usize, price: f64) -> SwingPoint {
        SwingPoint {
            index,
            price,
            kind,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() + Duration::hours(4 * index as i64),
        }
    }

    /// Closes oscillating `amplitude` around `center`.
    fn closes(len: usize, center: f64, amplitude: f64) -> Vec<f64> {
        (0..len)
            .map(|i| if i % 2 == 0 { center - amplitude } else { center + amplitude })
            .collect()
    }

    #[test]
    fn test_w_base_with_high_confidence() {
        let config = StrategyConfig::default();
        let supports = [zone(SwingKind::Support, 2, 1800.0), zone(SwingKind::Support, 10, 1820.0)];
        let closes = closes(14, 1815.0, 5.0);

        let patterns = detect_patterns(Timeframe::H4, &closes, &supports, &[], &config);

        let w = patterns.accumulation.expect("W base expected");
        assert_eq!(w.kind, PatternKind::WBase);
        assert_eq!(w.confidence, Confidence::Alta);
        assert_eq!(w.price, 1820.0);
        assert_eq!(w.start, supports[0].timestamp);
        assert_eq!(w.end, supports[1].timestamp);
        assert!(w.volatility < 0.01);
        assert!(patterns.distribution.is_none());
    }

    #[test]
    fn test_medium_confidence_band() {
        let config = StrategyConfig::default();
        // Alternating +-22 around 1800 over 8 closes: about 0.013
        let closes = closes(12, 1800.0, 22.0);
        let vol = close_volatility(&closes[2..10]);
        assert!(vol >= 0.01 && vol < 0.015, "volatility was {}", vol);

        let resistances = [zone(SwingKind::Resistance, 2, 1850.0), zone(SwingKind::Resistance, 10, 1830.0)];
        let patterns = detect_patterns(Timeframe::D1, &closes, &[], &resistances, &config);
        let m = patterns.distribution.expect("M base expected");
        assert_eq!(m.confidence, Confidence::Media);
    }

    #[test]
    fn test_confidence_near_band_edge() {
        let config = StrategyConfig::default();
        let supports = [zone(SwingKind::Support, 2, 1800.0), zone(SwingKind::Support, 10, 1820.0)];

        // std over 8 alternating closes is amplitude * sqrt(8/7)
        for (amplitude, low, high, expected) in [
            (13.5, 0.0075, 0.0085, Confidence::Alta),
            (16.5, 0.0095, 0.01, Confidence::Alta),
            (17.5, 0.01, 0.0105, Confidence::Media),
        ] {
            let closes = closes(12, 1810.0, amplitude);
            let vol = close_volatility(&closes[2..10]);
            assert!(vol >= low && vol < high, "amplitude {} volatility {}", amplitude, vol);

            let w = detect_patterns(Timeframe::H4, &closes, &supports, &[], &config)
                .accumulation
                .expect("W base expected");
            assert_eq!(w.confidence, expected, "amplitude {}", amplitude);
            assert!((w.volatility - vol).abs() < 1e-12);
        }
    }

    #[test]
    fn test_volatility_gate_blocks_pattern() {
        let config = StrategyConfig::default();
        let closes = closes(12, 1800.0, 40.0);
        assert!(close_volatility(&closes[2..10]) >= 0.015);
        let supports = [zone(SwingKind::Support, 2, 1760.0), zone(SwingKind::Support, 10, 1770.0)];
        assert!(detect_patterns(Timeframe::H4, &closes, &supports, &[], &config).is_empty());
    }

    #[test]
    fn test_needs_higher_low_and_separation() {
        let config = StrategyConfig::default();
        let closes = closes(20, 1815.0, 2.0);

        let lower_low = [zone(SwingKind::Support, 2, 1820.0), zone(SwingKind::Support, 10, 1800.0)];
        assert!(detect_patterns(Timeframe::H4, &closes, &lower_low, &[], &config).is_empty());

        // Exactly five bars apart is not enough
        let too_close = [zone(SwingKind::Support, 2, 1800.0), zone(SwingKind::Support, 7, 1820.0)];
        assert!(detect_patterns(Timeframe::H4, &closes, &too_close, &[], &config).is_empty());

        let single = [zone(SwingKind::Support, 2, 1800.0)];
        assert!(detect_patterns(Timeframe::H4, &closes, &single, &[], &config).is_empty());
    }

    #[test]
    fn test_uses_two_most_recent_zones() {
        let config = StrategyConfig::default();
        let closes = closes(30, 1815.0, 2.0);
        let supports = [
            zone(SwingKind::Support, 1, 1790.0),
            zone(SwingKind::Support, 9, 1830.0),
            zone(SwingKind::Support, 20, 1810.0),
        ];
        // 1810 is below 1830, so no higher low even though it is above 1790
        assert!(detect_patterns(Timeframe::H4, &closes, &supports, &[], &config).accumulation.is_none());
    }

    #[test]
    fn test_degenerate_mean_is_rejected() {
        assert!(close_volatility(&[0.0, 0.0, 0.0]).is_infinite());
        assert!(close_volatility(&[5.0]).is_infinite());
    }
}
