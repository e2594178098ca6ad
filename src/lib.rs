pub mod analysis;
pub mod config;
pub mod error;
pub mod indicators;
pub mod models;
pub mod notifier;
pub mod provider;
pub mod runner;
pub mod signals;
pub mod status;
pub mod strategy;

// Re-export commonly used types
pub use crate::analysis::{analyze_all, analyze_timeframe, TimeframeAnalysis};
pub use crate::config::Config;
pub use crate::error::AnalysisError;
pub use crate::models::{
    Bar, Classification, Confidence, Divergence, Pattern, PatternKind, SignalResult, SwingKind,
    SwingPoint, Timeframe, TrendLabel,
};
pub use crate::notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use crate::provider::{AlphaVantageProvider, DataProvider, ProviderError};
pub use crate::runner::SignalRunner;
pub use crate::signals::{SignalLog, SignalRecord};
pub use crate::strategy::{DecisionMode, SignalEngine, StrategyConfig};

use log::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
pub fn setup_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},structure_signals=debug", level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Logging initialized");
}
