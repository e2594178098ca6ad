// src/signals/signal_log.rs
use crate::models::SignalResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use log::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const NOT_AVAILABLE: &str = "N/A";

/// One row of the signal log. Every column is pre-formatted text so the
/// file reads the same regardless of who wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: String,
    pub symbol: String,
    pub price: String,
    pub classification: String,
    pub trend: String,
    pub rsi_m15: String,
    pub stop_loss: String,
    pub zone_kind: String,
    pub confidence: String,
}

impl SignalRecord {
    pub fn from_result(symbol: &str, result: &SignalResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            timestamp: recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            symbol: symbol.to_string(),
            price: format!("{:.2}", result.price),
            classification: result.classification.to_string(),
            trend: result.alignment.to_string(),
            rsi_m15: format!("{:.2}", result.rsi_m15),
            stop_loss: result
                .stop_loss
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            zone_kind: result
                .zone_kind
                .map(|z| z.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            confidence: result
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// Append-only CSV history of emitted signals.
#[derive(Debug)]
pub struct SignalLog {
    path: PathBuf,
}

impl SignalLog {
    /// Opens the log at `path`, creating the file with its header row if it
    /// does not exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create signal log directory")?;
            }
        }

        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if needs_header {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_path(&path)
                .with_context(|| format!("Failed to create signal log {}", path.display()))?;
            writer.write_record([
                "timestamp",
                "symbol",
                "price",
                "classification",
                "trend",
                "rsi_m15",
                "stop_loss",
                "zone_kind",
                "confidence",
            ])?;
            writer.flush()?;
            info!("Created signal log at {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &SignalRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open signal log {}", self.path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(record).context("Failed to write signal record")?;
        writer.flush()?;

        debug!("Recorded {} signal for {}", record.classification, record.symbol);
        Ok(())
    }

    /// Most recent row, or `None` when only the header has been written.
    pub fn last_record(&self) -> Result<Option<SignalRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to read signal log {}", self.path.display()))?;

        let mut last = None;
        for record in reader.deserialize::<SignalRecord>() {
            last = Some(record.context("Malformed signal log row")?);
        }
        Ok(last)
    }
}
