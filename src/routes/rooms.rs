use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{dto::room::RoomSnapshot, error::AppError, services::public_service, state::SharedState};

/// Read-only room endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/rooms/{room_id}", get(get_room))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Unknown room")
    )
)]
/// Return the snapshot every client of the room receives.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let payload = public_service::room_snapshot(&state, &room_id).await?;
    Ok(Json(payload))
}
