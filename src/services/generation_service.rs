use tracing::{info, warn};

use crate::{
    dto::generation::{PreviewQuery, PreviewResponse},
    error::ServiceError,
    source::generate_with_budget,
    state::SharedState,
};

/// Run one budgeted generation outside of any room and return the questions as-is.
pub async fn preview(
    state: &SharedState,
    query: PreviewQuery,
) -> Result<PreviewResponse, ServiceError> {
    let config = state.config();
    let request = query.into_request(&config.pacing);
    let topic = request.topic.clone();
    let source = state.source();
    let questions = generate_with_budget(source.as_ref(), request, &config.generation)
        .await
        .map_err(|err| {
            warn!(error = %err, topic = %topic, "preview generation failed");
            ServiceError::SourceUnavailable(err.to_string())
        })?;
    info!(topic = %topic, count = questions.len(), "preview generated");
    Ok(PreviewResponse {
        topic,
        questions: questions.into_iter().map(Into::into).collect(),
    })
}
