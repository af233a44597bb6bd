use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;

use crate::middleware::trace::http_trace_layer;
use crate::service::FundingOrchestrator;

pub fn build_app(orchestrator: Arc<FundingOrchestrator>) -> Router {
    Router::new()
        .route("/health", get(|| async move { StatusCode::OK }))
        .route("/status", get(funding_status))
        .layer(http_trace_layer())
        .with_state(orchestrator)
}

/// Last terminal funding result per wallet, keyed by wallet address.
async fn funding_status(
    State(orchestrator): State<Arc<FundingOrchestrator>>,
) -> Json<serde_json::Value> {
    let results: serde_json::Map<String, serde_json::Value> = orchestrator
        .last_results()
        .into_iter()
        .map(|(wallet, result)| {
            (
                wallet.to_string(),
                serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
            )
        })
        .collect();

    Json(serde_json::Value::Object(results))
}
