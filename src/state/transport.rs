//! Pub/sub capability used by room sessions to reach connections, and its WebSocket-backed
//! implementation.

use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dto::ws::RoomEvent,
    state::{ConnId, RoomId},
};

/// Delivery primitives consumed by room sessions.
///
/// Emits never block and never fail from the caller's point of view: a closed
/// connection is logged and skipped.
pub trait Transport: Send + Sync {
    /// Subscribe `conn` to events of `room`.
    fn join_room(&self, conn: &ConnId, room: &RoomId);
    /// Unsubscribe `conn` from `room`.
    fn leave_room(&self, conn: &ConnId, room: &RoomId);
    /// Send `event` to every connection in `room`.
    fn emit_to_room(&self, room: &RoomId, event: &RoomEvent);
    /// Send `event` to every connection in `room` but `sender`.
    fn emit_to_room_except(&self, room: &RoomId, sender: &ConnId, event: &RoomEvent);
    /// Send `event` to a single connection.
    fn emit_to_connection(&self, conn: &ConnId, event: &RoomEvent);
}

/// Registry of live WebSocket writers and room memberships.
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnId, mpsc::UnboundedSender<Message>>,
    rooms: DashMap<RoomId, HashSet<ConnId>>,
}

impl ConnectionHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the writer channel of a freshly accepted socket.
    pub fn register(&self, conn: ConnId, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(conn, tx);
    }

    /// Forget a closed socket and all of its memberships.
    pub fn unregister(&self, conn: &ConnId) {
        self.connections.remove(conn);
        self.rooms.retain(|_, members| {
            members.remove(conn);
            !members.is_empty()
        });
    }

    fn send(&self, conn: &ConnId, payload: &str) {
        let Some(tx) = self.connections.get(conn).map(|entry| entry.value().clone()) else {
            debug!(conn_id = %conn, "dropping event for unknown connection");
            return;
        };
        if tx.send(Message::Text(payload.to_owned().into())).is_err() {
            warn!(conn_id = %conn, "writer closed; dropping event");
        }
    }

    fn members(&self, room: &RoomId) -> Vec<ConnId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn broadcast(&self, room: &RoomId, skip: Option<&ConnId>, event: &RoomEvent) {
        let Some(payload) = encode(event) else {
            return;
        };
        for conn in self.members(room) {
            if skip != Some(&conn) {
                self.send(&conn, &payload);
            }
        }
    }
}

impl Transport for ConnectionHub {
    fn join_room(&self, conn: &ConnId, room: &RoomId) {
        self.rooms
            .entry(room.clone())
            .or_default()
            .insert(conn.clone());
    }

    fn leave_room(&self, conn: &ConnId, room: &RoomId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(conn);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    fn emit_to_room(&self, room: &RoomId, event: &RoomEvent) {
        self.broadcast(room, None, event);
    }

    fn emit_to_room_except(&self, room: &RoomId, sender: &ConnId, event: &RoomEvent) {
        self.broadcast(room, Some(sender), event);
    }

    fn emit_to_connection(&self, conn: &ConnId, event: &RoomEvent) {
        if let Some(payload) = encode(event) {
            self.send(conn, &payload);
        }
    }
}

/// Serialize an event once for all recipients.
///
/// Serialization failure is a bug in a payload type, not a transient condition, so it is
/// logged and the event dropped.
fn encode(event: &RoomEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "failed to serialize event `{event:?}`");
            None
        }
    }
}
