use crate::broadcaster::{Broadcaster, Subscription};
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tracing::{debug, info};

/// Push-channel routes: `GET /` upgrades to a WebSocket subscriber.
pub fn ws_router(broadcaster: Broadcaster) -> Router {
    Router::new()
        .route("/", get(ws_upgrade_handler))
        .with_state(broadcaster)
}

/// Bind the push server and serve until the listener fails.
pub async fn serve(addr: SocketAddr, broadcaster: Broadcaster) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting broadcast server");
    axum::serve(listener, ws_router(broadcaster)).await?;
    Ok(())
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Broadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, broadcaster))
}

async fn handle_ws_connection(socket: WebSocket, broadcaster: Broadcaster) {
    let Subscription { id, mut rx } = broadcaster.connect();
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(payload.to_string().into())).await {
                debug!(subscriber = id, error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // Clients never send anything meaningful; read until they go away.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(subscriber = id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    broadcaster.disconnect(id);
    send_task.abort();
}
