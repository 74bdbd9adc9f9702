//! Subscriber-facing surface: websocket channel plus a small REST API.

pub mod broadcast;
pub mod routes;
pub mod ws;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::core::cache::PriceCache;
use crate::core::store::RuleStore;

pub use broadcast::{Broadcaster, OutboundEvent};
pub use ws::ClientCommand;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn RuleStore>,
    pub cache: Arc<dyn PriceCache>,
    pub broadcaster: Arc<Broadcaster>,
}

pub fn router(state: ServerState) -> Router {
    // Browser dashboards connect from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/price/{asset}", get(routes::get_price))
        .route("/alerts", post(routes::create_alert))
        .route("/alerts/{owner}", get(routes::list_alerts))
        .layer(cors)
        .with_state(state)
}
