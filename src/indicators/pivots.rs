use crate::models::{Bar, SwingKind, SwingPoint};

/// Swing lows and highs found in one series, each ordered by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Swings {
    pub supports: Vec<SwingPoint>,
    pub resistances: Vec<SwingPoint>,
}

/// Finds local extrema over a window around each bar.
///
/// The window for bar `i` is `[i - lookback, i + lookback)`. Bars closer than
/// `lookback` to either end of the series are never candidates.
#[derive(Debug, Clone, Copy)]
pub struct PivotPoints {
    lookback: usize,
}

impl PivotPoints {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    pub fn identify_pivots(&self, bars: &[Bar]) -> Swings {
        let mut swings = Swings::default();
        if self.lookback == 0 || bars.len() < self.lookback * 2 {
            return swings;
        }

        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        for i in self.lookback..bars.len() - self.lookback {
            let range = i - self.lookback..i + self.lookback;

            if is_min_in_window(lows[i], &lows[range.clone()]) {
                swings.supports.push(SwingPoint {
                    index: i,
                    price: lows[i],
                    kind: SwingKind::Support,
                    timestamp: bars[i].timestamp,
                });
            }

            if is_max_in_window(highs[i], &highs[range]) {
                swings.resistances.push(SwingPoint {
                    index: i,
                    price: highs[i],
                    kind: SwingKind::Resistance,
                    timestamp: bars[i].timestamp,
                });
            }
        }

        swings
    }
}

fn is_max_in_window(center_value: f64, window: &[f64]) -> bool {
    window.iter().all(|&value| value <= center_value)
}

fn is_min_in_window(center_value: f64, window: &[f64]) -> bool {
    window.iter().all(|&value| value >= center_value)
}
