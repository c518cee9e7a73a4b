use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::any;
use futures_util::SinkExt;
use tokio::sync::mpsc;
use utoipa_axum::router::OpenApiRouter;

use crate::sync::{serialize, Connection, Timeout};
use crate::ServerState;

/// Sync init
///
/// Open a websocket to start receiving live events. Send a Hello with a
/// session token to join; the server heartbeats with Ping and expects Pong.
#[utoipa::path(
    get,
    path = "/sync",
    tags = ["sync"],
    responses(
        (status = UPGRADE_REQUIRED, description = "success"),
    )
)]
async fn sync(State(s): State<Arc<ServerState>>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    upgrade.on_upgrade(move |ws| worker(s, ws))
}

#[tracing::instrument(skip(s, ws))]
async fn worker(s: Arc<ServerState>, mut ws: WebSocket) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut conn = Connection::new(s, tx);
    let mut timeout = Timeout::for_ping();

    loop {
        tokio::select! {
            ws_msg = ws.recv() => {
                match ws_msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(ws_msg)) => {
                        if let Err(err) = conn.handle_message(ws_msg, &mut ws, &mut timeout).await {
                            let _ = ws.send(err.into()).await;
                            let _ = ws.close().await;
                            break;
                        }
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Some(envelope) => {
                        if ws.send(serialize(&envelope)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep_until(timeout.get_instant()) => {
                if !handle_timeout(&mut timeout, &mut ws).await {
                    break;
                }
            }
        }
    }

    conn.close();
}

async fn handle_timeout(timeout: &mut Timeout, ws: &mut WebSocket) -> bool {
    match timeout {
        Timeout::Ping(_) => {
            let ping = common::types::MessageEnvelope {
                payload: common::types::MessagePayload::Ping,
            };
            let _ = ws.send(serialize(&ping)).await;
            *timeout = Timeout::for_close();
            true
        }
        Timeout::Close(_) => {
            let _ = ws.close().await;
            false
        }
    }
}

pub fn routes() -> OpenApiRouter<Arc<ServerState>> {
    OpenApiRouter::new().route("/sync", any(sync))
}
