// src/models/mod.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::AnalysisError;

/// Timeframes analysed each cycle, ordered slowest to fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    W1,
    D1,
    H4,
    M15,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [Timeframe::W1, Timeframe::D1, Timeframe::H4, Timeframe::M15];

    /// Timeframes the decision engine cannot run without.
    pub const REQUIRED: [Timeframe; 3] = [Timeframe::D1, Timeframe::H4, Timeframe::M15];

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::W1 => write!(f, "W1"),
            Timeframe::D1 => write!(f, "D1"),
            Timeframe::H4 => write!(f, "H4"),
            Timeframe::M15 => write!(f, "M15"),
        }
    }
}

/// Deserialized bars go through [`Bar::new`], so stored or wire input gets
/// the same checks as bars built in code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBar")]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBar {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl TryFrom<RawBar> for Bar {
    type Error = AnalysisError;

    fn try_from(raw: RawBar) -> Result<Self, Self::Error> {
        Bar::new(raw.timestamp, raw.open, raw.high, raw.low, raw.close)
    }
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, AnalysisError> {
        let bar = Self {
            timestamp,
            open,
            high,
            low,
            close,
        };
        bar.validate()?;
        Ok(bar)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(AnalysisError::InvalidBar(format!(
                "non-finite price at {}",
                self.timestamp.to_rfc3339()
            )));
        }
        if self.high < self.low {
            return Err(AnalysisError::InvalidBar(format!(
                "high {} below low {} at {}",
                self.high,
                self.low,
                self.timestamp.to_rfc3339()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    Support,
    Resistance,
}

impl fmt::Display for SwingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwingKind::Support => write!(f, "support"),
            SwingKind::Resistance => write!(f, "resistance"),
        }
    }
}

/// A local extremum. `index` is the position in the series it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// Accumulation: a higher low between two support zones.
    #[serde(rename = "W_base")]
    WBase,
    /// Distribution: a lower high between two resistance zones.
    #[serde(rename = "M_base")]
    MBase,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::WBase => write!(f, "W_base"),
            PatternKind::MBase => write!(f, "M_base"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "média")]
    Media,
    #[serde(rename = "alta")]
    Alta,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Alta => write!(f, "alta"),
            Confidence::Media => write!(f, "média"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub price: f64,
    pub confidence: Confidence,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendLabel::Bullish => write!(f, "bullish"),
            TrendLabel::Bearish => write!(f, "bearish"),
            TrendLabel::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Divergence {
    Bullish,
    Bearish,
    None,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::Bullish => write!(f, "bullish divergence"),
            Divergence::Bearish => write!(f, "bearish divergence"),
            Divergence::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Buy,
    Sell,
    Wait,
    Reject,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Buy => write!(f, "BUY"),
            Classification::Sell => write!(f, "SELL"),
            Classification::Wait => write!(f, "WAIT"),
            Classification::Reject => write!(f, "REJECT"),
        }
    }
}

/// The single outcome of one analysis cycle.
///
/// Everything in here is derived from the bars of the cycle, so two runs
/// over identical bars produce identical results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub classification: Classification,
    pub rationale: String,
    pub price: f64,
    pub stop_loss: Option<f64>,
    pub zone_kind: Option<PatternKind>,
    pub confidence: Option<Confidence>,
    /// Timestamp of the latest M15 bar.
    pub as_of: DateTime<Utc>,
    pub alignment: TrendLabel,
    pub trends: BTreeMap<Timeframe, TrendLabel>,
    pub rsi_m15: f64,
    pub divergence: Divergence,
}

impl SignalResult {
    pub fn is_actionable(&self) -> bool {
        matches!(self.classification, Classification::Buy | Classification::Sell)
    }
}
