// src/runner/mod.rs
use chrono::Utc;
use futures::future::join_all;
use itertools::Itertools;
use log::*;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, RetryConfig};
use crate::error::AnalysisError;
use crate::models::{Bar, SignalResult, Timeframe};
use crate::notifier::{render_message, Notifier};
use crate::provider::DataProvider;
use crate::signals::{SignalLog, SignalRecord};
use crate::strategy::SignalEngine;

/// Drives fetch, evaluate, notify and persist for one instrument.
pub struct SignalRunner {
    symbol: String,
    provider: Arc<dyn DataProvider>,
    notifier: Arc<dyn Notifier>,
    log: Arc<SignalLog>,
    engine: SignalEngine,
    retry: RetryConfig,
    interval: Duration,
}

impl SignalRunner {
    pub fn new(
        config: &Config,
        provider: Arc<dyn DataProvider>,
        notifier: Arc<dyn Notifier>,
        log: Arc<SignalLog>,
    ) -> Self {
        Self {
            symbol: config.general.symbol.clone(),
            provider,
            notifier,
            log,
            engine: SignalEngine::new(config.strategy.clone()),
            retry: config.retry.clone(),
            interval: Duration::from_secs(config.general.check_interval_secs.max(1)),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// One complete cycle. Delivery and persistence failures are logged and
    /// do not fail the cycle.
    pub async fn run_cycle(&self) -> Result<SignalResult, AnalysisError> {
        let span = tracing::info_span!("cycle", id = %Uuid::new_v4());
        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> Result<SignalResult, AnalysisError> {
        info!("Starting analysis cycle for {} via {}", self.symbol, self.provider.name());

        let inputs = self.fetch_all().await;
        let result = self.engine.evaluate(inputs)?;

        if result.is_actionable() {
            info!(
                "{} {} at {:.2}, stop {:.2}: {}",
                self.symbol,
                result.classification,
                result.price,
                result.stop_loss.unwrap_or_default(),
                result.rationale
            );
        } else {
            info!("{} {}: {}", self.symbol, result.classification, result.rationale);
        }

        let message = render_message(&self.symbol, &result, Utc::now());
        if let Err(e) = self.notifier.send(&message).await {
            warn!("Failed to deliver signal via {}: {:#}", self.notifier.name(), e);
        }

        let record = SignalRecord::from_result(&self.symbol, &result, Utc::now());
        if let Err(e) = self.log.append(&record) {
            error!("Failed to persist signal: {:#}", e);
        }

        Ok(result)
    }

    /// Fetches every timeframe concurrently. A timeframe that cannot be
    /// fetched is handed to the engine empty.
    async fn fetch_all(&self) -> BTreeMap<Timeframe, Vec<Bar>> {
        let fetches = Timeframe::ALL.iter().map(|&timeframe| async move {
            (timeframe, self.fetch_with_retry(timeframe).await)
        });

        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_with_retry(&self, timeframe: Timeframe) -> Vec<Bar> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.provider.fetch_bars(timeframe).await {
                Ok(bars) => return bars,
                Err(e) => {
                    warn!("Fetching {} failed (attempt {}/{}): {}", timeframe, attempt, max_attempts, e);
                    if attempt < max_attempts {
                        time::sleep(backoff_delay(&self.retry, attempt)).await;
                    }
                }
            }
        }

        error!("Giving up on {} after {} attempts", timeframe, max_attempts);
        Vec::new()
    }

    /// Sends the startup notice, then runs cycles on the configured interval
    /// until the process stops.
    pub async fn run_forever(&self) {
        info!(
            "Monitoring {} every {} minutes",
            self.symbol,
            self.interval.as_secs() / 60
        );
        let startup = format!("🟢 Structure signal monitor started for <b>{}</b>", self.symbol);
        if let Err(e) = self.notifier.send(&startup).await {
            warn!("Failed to send startup message: {:#}", e);
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(_) => {}
                Err(AnalysisError::IncompleteCycle { missing }) => {
                    info!("No signal this cycle, missing {}", missing.iter().join(", "));
                }
                Err(e) => error!("Cycle failed: {}", e),
            }
            debug!("Next check in {} seconds", self.interval.as_secs());
        }
    }
}

/// Exponential backoff capped at `max_delay_ms`, plus random jitter of up to
/// `jitter_ratio` of the capped delay. `attempt` starts at 1.
pub fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base_ms = retry
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(retry.max_delay_ms);

    let jitter_cap = ((base_ms as f64) * retry.jitter_ratio.max(0.0)).round() as u64;
    let jitter_ms = if jitter_cap > 0 {
        rand::thread_rng().gen_range(0..=jitter_cap)
    } else {
        0
    };

    Duration::from_millis(base_ms.saturating_add(jitter_ms))
}
