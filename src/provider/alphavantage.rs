use super::{DataProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::models::{Bar, Timeframe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use itertools::Itertools;
use log::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// H4 is not offered by the API; it is built from 60min bars.
const H4_HOURS: i64 = 4;

/// Points returned for `outputsize=compact`.
const COMPACT_POINTS: usize = 100;

#[derive(Debug, Deserialize)]
struct FxPoint {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Debug, Clone)]
pub struct AlphaVantageProvider {
    config: ProviderConfig,
    client: Client,
}

impl AlphaVantageProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        if config.h4_output_size == "compact" {
            warn!(
                "H4 output size is compact: {} hourly points aggregate to about {} H4 bars, \
                 which is not enough to warm up the indicators",
                COMPACT_POINTS,
                COMPACT_POINTS / H4_HOURS as usize
            );
        }

        Ok(Self { config, client })
    }

    fn query_params(&self, timeframe: Timeframe) -> Vec<(&'static str, String)> {
        let (function, interval) = match timeframe {
            Timeframe::W1 => ("FX_WEEKLY", None),
            Timeframe::D1 => ("FX_DAILY", None),
            Timeframe::H4 => ("FX_INTRADAY", Some("60min")),
            Timeframe::M15 => ("FX_INTRADAY", Some("15min")),
        };

        let output_size = match timeframe {
            Timeframe::H4 => &self.config.h4_output_size,
            _ => &self.config.output_size,
        };

        let mut params = vec![
            ("function", function.to_string()),
            ("from_symbol", self.config.from_symbol.clone()),
            ("to_symbol", self.config.to_symbol.clone()),
            ("outputsize", output_size.clone()),
            ("apikey", self.config.api_key.clone()),
        ];
        if let Some(interval) = interval {
            params.push(("interval", interval.to_string()));
        }
        params
    }
}

#[async_trait]
impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    async fn fetch_bars(&self, timeframe: Timeframe) -> Result<Vec<Bar>, ProviderError> {
        debug!("Fetching {} bars for {}/{}", timeframe, self.config.from_symbol, self.config.to_symbol);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.query_params(timeframe))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await?;
        let bars = parse_time_series(&body)?;
        let bars = match timeframe {
            Timeframe::H4 => aggregate_bars(&bars, H4_HOURS),
            _ => bars,
        };

        info!("Fetched {} {} bars", bars.len(), timeframe);
        Ok(bars)
    }
}

/// Extracts the `Time Series FX (...)` object of a response into bars
/// sorted oldest first.
pub fn parse_time_series(body: &Value) -> Result<Vec<Bar>, ProviderError> {
    let object = body
        .as_object()
        .ok_or_else(|| ProviderError::ParseError("response is not a JSON object".to_string()))?;

    let series = match object.iter().find(|(key, _)| key.starts_with("Time Series")) {
        Some((_, series)) => series,
        None => {
            let message = ["Error Message", "Note", "Information"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .unwrap_or("time series not available");
            return Err(ProviderError::ApiError(message.to_string()));
        }
    };

    let points: BTreeMap<String, FxPoint> = serde_json::from_value(series.clone())
        .map_err(|e| ProviderError::ParseError(format!("malformed time series: {}", e)))?;

    let mut bars = Vec::with_capacity(points.len());
    for (key, point) in points {
        let bar = Bar::new(
            parse_timestamp(&key)?,
            parse_price(&point.open)?,
            parse_price(&point.high)?,
            parse_price(&point.low)?,
            parse_price(&point.close)?,
        )
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ProviderError::ParseError(format!("invalid timestamp '{}'", raw)))
}

fn parse_price(raw: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ProviderError::ParseError(format!("invalid price '{}'", raw)))
}

/// Merges consecutive bars into `hours`-wide buckets aligned to UTC
/// midnight. Input must be sorted oldest first.
pub fn aggregate_bars(bars: &[Bar], hours: i64) -> Vec<Bar> {
    let bucket_secs = hours * 3600;
    let groups = bars
        .iter()
        .group_by(|b| b.timestamp.timestamp().div_euclid(bucket_secs));

    let mut aggregated = Vec::new();
    for (bucket, group) in &groups {
        let group: Vec<&Bar> = group.collect();
        let (first, last) = match (group.first(), group.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        let timestamp = match Utc.timestamp_opt(bucket * bucket_secs, 0).single() {
            Some(ts) => ts,
            None => continue,
        };

        aggregated.push(Bar {
            timestamp,
            open: first.open,
            high: group.iter().map(|b| b.high).fold(f64::MIN, f64::max),
            low: group.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            close: last.close,
        });
    }
    aggregated
}
