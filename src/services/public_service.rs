use crate::{dto::room::RoomSnapshot, error::ServiceError, state::SharedState};

/// Return the client-safe snapshot of a room.
pub async fn room_snapshot(state: &SharedState, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
    let handle = state
        .rooms()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))?;
    let room = handle.lock().await;
    Ok(RoomSnapshot::from(&*room))
}
