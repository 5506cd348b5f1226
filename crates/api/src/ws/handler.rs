use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::registry::ObserverRegistry;

/// GET /ws-status -- upgrade to a status observer connection.
pub async fn ws_status_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.observers))
}

/// Manage one observer connection after upgrade.
///
/// A sender task forwards frames from the registry channel to the socket
/// while this task reads (and ignores) inbound frames. Whichever side ends
/// first ends the connection.
async fn handle_socket(socket: WebSocket, observers: Arc<ObserverRegistry>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut rx = observers.register(conn_id.clone()).await;
    tracing::info!(conn_id = %conn_id, "Observer connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Observer sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let receive = async {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Observer receive error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = &mut send_task => {}
        _ = receive => {}
    }

    observers.unregister(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Observer disconnected");
}
