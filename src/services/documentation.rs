use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the hayaoshi backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::rooms::get_room,
        crate::routes::generation::preview_questions,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::ParticipantView,
            crate::dto::room::QuestionView,
            crate::dto::generation::PreviewResponse,
            crate::dto::generation::PreviewQuestion,
            crate::dto::ws::ClientCommand,
            crate::dto::ws::QuestionInput,
            crate::dto::ws::Role,
            crate::dto::validation::PacingConfigUpdate,
            crate::state::room::Mode,
            crate::state::room::PacingConfig,
            crate::state::room::Citation,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room snapshots and the room WebSocket"),
        (name = "generation", description = "Question generation diagnostics"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/ws",
            "/rooms/{room_id}",
            "/api/questions/preview",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
