use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;

use crate::models::{Classification, SignalResult, Timeframe};

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Delivers rendered signal text somewhere a human will read it.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<()>;
}

/// Used when no delivery channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<()> {
        info!("Telegram disabled, message not delivered:\n{}", message);
        Ok(())
    }
}

fn marker(classification: Classification) -> &'static str {
    match classification {
        Classification::Buy => "🟢",
        Classification::Sell => "🔴",
        Classification::Wait => "⚪",
        Classification::Reject => "🟡",
    }
}

/// HTML message for one signal.
pub fn render_message(symbol: &str, result: &SignalResult, generated_at: DateTime<Utc>) -> String {
    let mut msg = format!("🪙 <b>{}</b> | Structural analysis\n", symbol);
    msg += &format!("{}\n", "=".repeat(40));

    for timeframe in Timeframe::ALL {
        if let Some(trend) = result.trends.get(&timeframe) {
            msg += &format!("• {}: {}\n", timeframe, trend);
        }
    }
    msg += &format!("• RSI M15: {:.1}\n", result.rsi_m15);

    msg += &format!(
        "\n{} <b>{}: {}</b>\n",
        marker(result.classification),
        result.classification,
        result.rationale
    );
    msg += &format!("💰 Price: <b>{:.2}</b>\n", result.price);
    if let Some(stop) = result.stop_loss {
        msg += &format!("🛑 Stop loss: {:.2}\n", stop);
    }
    if let Some(zone) = result.zone_kind {
        msg += &format!("📐 Zone: {}", zone);
        if let Some(confidence) = result.confidence {
            msg += &format!(" (confidence {})", confidence);
        }
        msg.push('\n');
    }
    msg += &format!("⏱️ {}", generated_at.format("%H:%M %d/%m"));
    msg
}
