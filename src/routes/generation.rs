use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::generation::{PreviewQuery, PreviewResponse},
    error::AppError,
    services::generation_service,
    state::SharedState,
};

/// Question generation diagnostics.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/questions/preview", get(preview_questions))
}

#[utoipa::path(
    get,
    path = "/api/questions/preview",
    tag = "generation",
    params(PreviewQuery),
    responses(
        (status = 200, description = "Generated questions", body = PreviewResponse),
        (status = 400, description = "Invalid query"),
        (status = 503, description = "Question source unavailable")
    )
)]
/// Generate a batch of questions without attaching them to a room.
pub async fn preview_questions(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<PreviewQuery>>,
) -> Result<Json<PreviewResponse>, AppError> {
    let payload = generation_service::preview(&state, query).await?;
    Ok(Json(payload))
}
