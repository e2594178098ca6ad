//! Liveness endpoint for hosting platforms that ping the monitor.

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::signals::SignalLog;

const WAITING: &str = "waiting for signal";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub last_signal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

pub fn create_router(log: Arc<SignalLog>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .with_state(log)
}

/// GET / - plain banner
pub async fn index() -> Html<&'static str> {
    Html("<h1>Structure signal monitor</h1><p>Running. See <a href=\"/status\">/status</a>.</p>")
}

/// GET /status - last recorded signal
pub async fn status(State(log): State<Arc<SignalLog>>) -> Json<StatusResponse> {
    let last = match log.last_record() {
        Ok(last) => last,
        Err(e) => {
            warn!("Could not read signal log: {:#}", e);
            None
        }
    };

    let response = match last {
        Some(record) => StatusResponse {
            status: "running",
            last_signal: record.classification,
            price: Some(record.price),
            timestamp: Some(record.timestamp),
        },
        None => StatusResponse {
            status: "running",
            last_signal: WAITING.to_string(),
            price: None,
            timestamp: None,
        },
    };
    Json(response)
}

/// Start the status server
pub async fn start_server(bind: &str, log: Arc<SignalLog>) -> anyhow::Result<()> {
    let app = create_router(log);

    tracing::info!("Status endpoint listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
