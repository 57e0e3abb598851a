//! Minimal health/metrics/websocket surface (spec §6). The data plane owns
//! these three endpoints; the CRUD/API surface is out of core scope.
//! Grounded on the teacher's `server/routes.rs` + `server/ws.rs` shape.

use crate::context::AppContext;
use crate::repo::Repository;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .route("/health/live", get(health_live))
        .route("/metrics", get(metrics))
        .route("/api/v1/ws", get(ws_handler))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(ctx)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn health_ready(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.repos.users.list().await {
        Ok(_) => Json(serde_json::json!({"status": "ready"})).into_response(),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "not_ready", "error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn health_live() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "alive"}))
}

/// GET /metrics -- aggregate operational snapshot, not a Prometheus
/// exposition (spec names the route but not a format; this follows the
/// teacher's own `/api/metrics`, a plain JSON aggregate over live state).
async fn metrics(State(ctx): State<Arc<AppContext>>) -> Response {
    let active_alerts = ctx.repos.alerts.list().await.map(|a| a.iter().filter(|a| a.active).count());
    let pending_bets = ctx.repos.bets.list().await.map(|b| {
        b.iter()
            .filter(|b| b.status == crate::domain::BetStatus::Pending)
            .count()
    });
    let connected_clients = ctx.hub.connection_count().await;

    Json(serde_json::json!({
        "connectedClients": connected_clients,
        "activeAlerts": active_alerts.unwrap_or(0),
        "pendingBets": pending_bets.unwrap_or(0),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    user_id: Option<uuid::Uuid>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<WsQuery>,
) -> Response {
    let user_id = query.user_id.map(crate::domain::UserId).unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, ctx, user_id))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<AppContext>, user_id: crate::domain::UserId) {
    let (mut sender, mut receiver) = socket.split();
    let (client_id, queue) = ctx.hub.register(user_id).await;

    let send_task = tokio::spawn(async move {
        loop {
            let message = queue.recv().await;
            let Ok(json) = serde_json::to_string(&message) else { continue };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let hub = ctx.hub.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Subscribe { channel }) => hub.subscribe(client_id, &channel).await,
                    Ok(ClientFrame::Unsubscribe { channel }) => hub.unsubscribe(client_id, &channel).await,
                    Err(e) => tracing::debug!(error = %e, "ignoring malformed client frame"),
                },
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    ctx.hub.unregister(client_id).await;
}
