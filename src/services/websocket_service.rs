use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientCommand, RoomEvent},
    services::{
        dispatch::{self, Session},
        room_events,
    },
    state::{ConnId, SharedState},
};

/// Handle the full lifecycle of a room client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let conn: ConnId = Uuid::new_v4().to_string();
    state.hub().register(conn.clone(), outbound_tx.clone());
    info!(conn_id = %conn, "client connected");
    room_events::reply(
        &state,
        &conn,
        &RoomEvent::Connected {
            connection_id: conn.clone(),
        },
    );

    let mut session = Session::new(conn.clone());
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientCommand::from_json_str(&text) {
                Ok(command) => {
                    debug!(conn_id = %conn, command = command.name(), "received command");
                    dispatch::handle_command(&state, &mut session, command).await;
                }
                Err(err) => {
                    warn!(conn_id = %conn, error = %err, "failed to parse client command");
                    room_events::reply(
                        &state,
                        &conn,
                        &RoomEvent::Error {
                            reason: "invalid-input",
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(conn_id = %conn, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(conn_id = %conn, error = %err, "websocket error");
                break;
            }
        }
    }

    dispatch::disconnect(&state, &mut session).await;
    state.hub().unregister(&conn);
    info!(conn_id = %conn, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
