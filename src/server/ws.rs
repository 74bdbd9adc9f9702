//! WebSocket subscriber channel.
//!
//! Each connection identifies its owner via the `owner` query parameter.
//! On connect the client receives the last broadcast snapshot (if any) and
//! its enabled rules; afterwards every published event is forwarded until
//! the client disconnects. Inbound `submit_rule` commands write through to
//! the rule store and re-send the owner's rule list to this connection only.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::alert::{AlertKind, NewAlertRule};
use crate::core::asset::AssetId;
use crate::server::ServerState;
use crate::server::broadcast::OutboundEvent;

/// Client-to-server commands, JSON-tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    SubmitRule {
        asset: AssetId,
        kind: AlertKind,
        threshold: f64,
    },
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default = "default_owner")]
    owner: String,
}

fn default_owner() -> String {
    "guest".to_string()
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query.owner))
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &OutboundEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

/// Send the owner's current enabled rules to this connection. A store
/// failure is logged and tolerated; the connection stays up.
async fn send_initial_rules(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &ServerState,
    owner: &str,
) -> Result<(), axum::Error> {
    match state.store.list_enabled_rules(Some(owner)).await {
        Ok(rules) => send_event(sender, &OutboundEvent::InitialRules { rules }).await,
        Err(e) => {
            warn!(%owner, error = %e, "failed to load rules for subscriber");
            Ok(())
        }
    }
}

async fn handle_connection(socket: WebSocket, state: ServerState, owner: String) {
    info!(%owner, subscribers = state.broadcaster.subscriber_count() + 1, "subscriber connected");

    let mut rx = state.broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Connect-time state sync: last snapshot first, then the owner's rules.
    if let Some(snapshot) = state.broadcaster.latest_snapshot() {
        if send_event(&mut sender, &OutboundEvent::from_snapshot(&snapshot))
            .await
            .is_err()
        {
            return;
        }
    }
    if send_initial_rules(&mut sender, &state, &owner).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            // Forward broadcast events to this client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(%owner, skipped, "subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Handle inbound client messages
            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(ClientCommand::SubmitRule { asset, kind, threshold }) => {
                                let new_rule = NewAlertRule {
                                    owner: owner.clone(),
                                    asset,
                                    kind,
                                    threshold,
                                };
                                match state.store.create_rule(new_rule).await {
                                    Ok(rule) => {
                                        info!(%owner, asset = %rule.asset, rule_id = %rule.id, "rule submitted");
                                        if send_initial_rules(&mut sender, &state, &owner).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(%owner, error = %e, "failed to store submitted rule");
                                    }
                                }
                            }
                            Err(e) => {
                                debug!(%owner, error = %e, "ignoring unparseable client message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    info!(%owner, "subscriber disconnected");
}
