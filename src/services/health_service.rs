use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the question source can serve paced rooms.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().len();
    if state.is_degraded() {
        warn!("question source unavailable (degraded mode)");
        HealthResponse::degraded(rooms)
    } else {
        HealthResponse::ok(rooms)
    }
}
