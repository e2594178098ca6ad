// tests/pipeline_test.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use structure_signals::analysis::{patterns, trend, zones};
use structure_signals::indicators::{rsi, IndicatorSeries, PivotPoints};
use structure_signals::models::{
    Bar, Classification, Confidence, Divergence, PatternKind, SwingKind, SwingPoint, Timeframe, TrendLabel,
};
use structure_signals::{AnalysisError, SignalEngine, StrategyConfig};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(start() + Duration::minutes(15 * i as i64), open, high, low, close).unwrap()
}

fn market(count: usize, step: Duration, phase: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 2300.0 + x * 0.6 + ((x + phase) * 0.35).sin() * 9.0;
            Bar {
                timestamp: start() + step * i as i32,
                open: close - 0.5,
                high: close + 2.5,
                low: close - 2.5,
                close,
            }
        })
        .collect()
}

fn from_closes(closes: &[f64], step: Duration) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar::new(start() + step * i as i32, close, close + 1.0, close - 1.0, close).unwrap())
        .collect()
}

/// Rally, pullback to a low at 2295, second leg, higher low at 2305, then
/// a steady climb. Warm-up drops the first 20 bars.
fn h4_higher_low() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..32).map(|k| 2250.0 + 2.0 * k as f64).collect();
    closes.extend([2308.0, 2304.0, 2300.0, 2296.0]);
    closes.extend((1..=8).map(|j| 2296.0 + 4.0 * j as f64));
    closes.extend([2324.0, 2318.0, 2312.0, 2306.0]);
    closes.extend((1..=12).map(|j| 2306.0 + 3.0 * j as f64));
    closes
}

/// Flat, a sharp drop, chop, then a lower close on recovering RSI.
fn m15_pullback() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..42).map(|k| if k % 2 == 0 { 2330.0 } else { 2329.0 }).collect();
    let deltas = [
        -5.0, -5.0, -5.0, -5.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 3.0, -1.0, 3.0, -6.0,
    ];
    for delta in deltas {
        let last = closes[closes.len() - 1];
        closes.push(last + delta);
    }
    closes
}

fn all_timeframes() -> BTreeMap<Timeframe, Vec<Bar>> {
    let mut inputs = BTreeMap::new();
    inputs.insert(Timeframe::W1, market(60, Duration::weeks(1), 0.0));
    inputs.insert(Timeframe::D1, market(80, Duration::days(1), 1.0));
    inputs.insert(Timeframe::H4, market(100, Duration::hours(4), 2.0));
    inputs.insert(Timeframe::M15, market(120, Duration::minutes(15), 3.0));
    inputs
}

#[test]
fn test_reference_swing_scenario() {
    let raw = [
        (10.0, 12.0, 9.0, 11.0),
        (11.0, 13.0, 10.0, 12.0),
        (9.0, 11.0, 8.0, 10.0),
        (12.0, 14.0, 11.0, 13.0),
        (13.0, 15.0, 12.0, 14.0),
        (11.0, 13.0, 10.0, 12.0),
        (14.0, 16.0, 13.0, 15.0),
    ];
    let bars: Vec<Bar> = raw
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| bar(i, o, h, l, c))
        .collect();

    let swings = PivotPoints::new(2).identify_pivots(&bars);

    assert!(swings.supports.iter().any(|p| p.index == 2 && p.price == 8.0));
    assert!(swings.resistances.iter().any(|p| p.index == 4 && p.price == 15.0));
    assert!(swings.supports.iter().all(|p| p.kind == SwingKind::Support));
}

#[test]
fn test_zone_ladder_is_well_separated() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = 0;
    let points: Vec<SwingPoint> = (0..400)
        .map(|_| {
            index += rng.gen_range(1..5);
            SwingPoint {
                index,
                price: 1800.0 + rng.gen_range(-5.0..5.0),
                kind: SwingKind::Support,
                timestamp: start() + Duration::hours(index as i64),
            }
        })
        .collect();

    let ladder = zones::filter_zones(&points, 3, 0.001);

    assert!(!ladder.is_empty());
    for pair in ladder.windows(2) {
        assert!(pair[1].index - pair[0].index >= 3);
        assert!((pair[1].price - pair[0].price).abs() > 0.001 * pair[0].price);
    }
}

#[test]
fn test_no_pattern_above_volatility_gate() {
    let config = StrategyConfig::default();
    let supports = [
        SwingPoint { index: 2, price: 1800.0, kind: SwingKind::Support, timestamp: start() },
        SwingPoint {
            index: 12,
            price: 1820.0,
            kind: SwingKind::Support,
            timestamp: start() + Duration::hours(40),
        },
    ];

    for amplitude in [0.0, 2.0, 10.0, 20.0, 40.0, 120.0, 400.0] {
        let closes: Vec<f64> = (0..20).map(|i| 1810.0 + amplitude * (i as f64).sin()).collect();
        let set = patterns::detect_patterns(Timeframe::H4, &closes, &supports, &[], &config);

        if let Some(p) = set.accumulation {
            assert!(p.volatility < config.volatility_gate, "amplitude {}", amplitude);
        }
        if amplitude >= 120.0 {
            assert!(set.is_empty(), "amplitude {}", amplitude);
        }
    }
}

#[test]
fn test_rsi_stays_in_bounds() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut price = 2000.0;
    let closes: Vec<f64> = (0..500)
        .map(|_| {
            price += rng.gen_range(-15.0..15.0);
            price
        })
        .collect();

    let values = rsi::rsi(&closes, 14);

    assert!(values[..14].iter().all(Option::is_none));
    for value in values[14..].iter() {
        let v = value.expect("warm value");
        assert!((0.0..=100.0).contains(&v));
    }
}

#[test]
fn test_rsi_saturates_after_fourteen_gains() {
    let mut closes: Vec<f64> = vec![100.0, 90.0, 95.0, 85.0];
    closes.extend((1..=14).map(|i| 85.0 + i as f64));

    let values = rsi::rsi(&closes, 14);
    assert_eq!(values.last().copied().flatten(), Some(100.0));
}

#[test]
fn test_trend_labels_follow_indicators() {
    let bars = market(120, Duration::hours(4), 0.0);
    let series = IndicatorSeries::compute(Timeframe::H4, bars, 14, 21).unwrap();

    for row in series.warmed(15).unwrap() {
        match trend::classify_trend(&row) {
            TrendLabel::Bullish => assert!(row.bar.close > row.ema && row.rsi > 50.0),
            TrendLabel::Bearish => assert!(row.bar.close < row.ema && row.rsi < 50.0),
            TrendLabel::Neutral => assert!(
                !(row.bar.close > row.ema && row.rsi > 50.0) && !(row.bar.close < row.ema && row.rsi < 50.0)
            ),
        }
    }
}

#[test]
fn test_pipeline_is_idempotent() {
    let engine = SignalEngine::default();

    let first = engine.evaluate(all_timeframes()).unwrap();
    let second = engine.evaluate(all_timeframes()).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.trends.len(), 4);
}

#[test]
fn test_missing_h4_fails_whole_cycle() {
    let mut inputs = all_timeframes();
    inputs.remove(&Timeframe::H4);

    match SignalEngine::default().evaluate(inputs) {
        Err(AnalysisError::IncompleteCycle { missing }) => assert_eq!(missing, vec![Timeframe::H4]),
        other => panic!("expected incomplete cycle, got {:?}", other),
    }
}

#[test]
fn test_short_h4_fails_whole_cycle() {
    let mut inputs = all_timeframes();
    inputs.insert(Timeframe::H4, market(20, Duration::hours(4), 0.0));

    assert!(matches!(
        SignalEngine::default().evaluate(inputs),
        Err(AnalysisError::IncompleteCycle { .. })
    ));
}

#[test]
fn test_short_weekly_is_tolerated() {
    let mut inputs = all_timeframes();
    inputs.insert(Timeframe::W1, market(10, Duration::weeks(1), 0.0));

    let result = SignalEngine::default().evaluate(inputs).unwrap();
    assert!(!result.trends.contains_key(&Timeframe::W1));
}

#[test]
fn test_buy_from_bars_at_h4_higher_low() {
    let mut inputs = BTreeMap::new();
    let weekly: Vec<f64> = (0..60).map(|k| 1900.0 + 5.0 * k as f64).collect();
    let daily: Vec<f64> = (0..60).map(|k| 2100.0 + 4.0 * k as f64).collect();
    inputs.insert(Timeframe::W1, from_closes(&weekly, Duration::weeks(1)));
    inputs.insert(Timeframe::D1, from_closes(&daily, Duration::days(1)));
    inputs.insert(Timeframe::H4, from_closes(&h4_higher_low(), Duration::hours(4)));
    inputs.insert(Timeframe::M15, from_closes(&m15_pullback(), Duration::minutes(15)));

    let result = SignalEngine::default().evaluate(inputs).unwrap();

    assert_eq!(result.trends.get(&Timeframe::D1), Some(&TrendLabel::Bullish));
    assert_eq!(result.trends.get(&Timeframe::H4), Some(&TrendLabel::Bullish));
    assert_eq!(result.alignment, TrendLabel::Bullish);

    assert_eq!(result.classification, Classification::Buy, "{}", result.rationale);
    assert_eq!(result.zone_kind, Some(PatternKind::WBase));
    assert_eq!(result.confidence, Some(Confidence::Alta));
    assert!(result.rationale.contains("W_base H4"), "{}", result.rationale);
    assert!(result.rationale.contains("H4 support 2305.00"), "{}", result.rationale);

    // 2308 is 0.13% above the 2305 support
    assert_eq!(result.price, 2308.0);
    assert!(result.rsi_m15 >= 40.0 && result.rsi_m15 < 50.0, "rsi {}", result.rsi_m15);
    assert_eq!(result.divergence, Divergence::Bullish);
    assert!(result.rationale.ends_with("+ bullish divergence"), "{}", result.rationale);
    assert!((result.stop_loss.unwrap() - 2307.0 * 0.995).abs() < 1e-9);
}
