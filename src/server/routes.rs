//! HTTP read/create surface beside the websocket.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::warn;

use crate::core::alert::NewAlertRule;
use crate::core::asset::AssetId;
use crate::server::ServerState;

/// Last cached price for one asset, or `no-data` when the cache holds no
/// fresh entry for it.
pub async fn get_price(
    Path(asset): Path<String>,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    let id = AssetId::new(&asset);
    let ids: BTreeSet<AssetId> = [id.clone()].into();
    let snapshot = state.cache.get(&ids).await;

    match snapshot.price(&id) {
        Some(price) => (
            StatusCode::OK,
            Json(json!({
                "asset": id,
                "price": price,
                "captured_at": snapshot.captured_at,
            })),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "no-data" }))),
    }
}

pub async fn create_alert(
    State(state): State<ServerState>,
    Json(new_rule): Json<NewAlertRule>,
) -> impl IntoResponse {
    match state.store.create_rule(new_rule).await {
        Ok(rule) => (StatusCode::OK, Json(json!(rule))),
        Err(e) => {
            warn!(error = %e, "failed to create rule");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

pub async fn list_alerts(
    Path(owner): Path<String>,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    match state.store.list_enabled_rules(Some(&owner)).await {
        Ok(rules) => (StatusCode::OK, Json(json!(rules))),
        Err(e) => {
            warn!(%owner, error = %e, "failed to list rules");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
