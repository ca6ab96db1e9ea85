//! Payloads of the question preview endpoint.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    source::{GeneratedQuestion, GenerationRequest},
    state::room::{Citation, PacingConfig},
};

/// Query parameters of `GET /api/questions/preview`; absent values use the room defaults.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Generation topic.
    #[validate(length(min = 1, max = 200))]
    pub topic: Option<String>,
    /// Questions to generate.
    #[validate(range(min = 1, max = 20))]
    pub count: Option<usize>,
    /// Difficulty, 1 to 10.
    #[validate(range(min = 1, max = 10))]
    pub difficulty: Option<u8>,
    /// Optional genre hint.
    #[validate(length(max = 200))]
    pub genre: Option<String>,
    /// Ground generation on web search.
    pub grounding: Option<bool>,
}

impl PreviewQuery {
    /// Build the generation request, filling gaps from `defaults`.
    pub fn into_request(self, defaults: &PacingConfig) -> GenerationRequest {
        let mut request = GenerationRequest::from_config(
            defaults,
            self.count.unwrap_or(defaults.refill_count),
        );
        if let Some(topic) = self.topic.filter(|topic| !topic.trim().is_empty()) {
            request.topic = topic.trim().to_owned();
        }
        if let Some(difficulty) = self.difficulty {
            request.difficulty = difficulty;
        }
        if let Some(genre) = self.genre {
            request.genre = genre.trim().to_owned();
        }
        if let Some(grounding) = self.grounding {
            request.grounding = grounding;
        }
        request
    }
}

/// A generated question, answer included.
#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewQuestion {
    /// Question text.
    pub text: String,
    /// Normalized canonical answer.
    pub answer: String,
    /// Grounding citations.
    pub sources: Vec<Citation>,
}

impl From<GeneratedQuestion> for PreviewQuestion {
    fn from(question: GeneratedQuestion) -> Self {
        Self {
            text: question.text,
            answer: question.answer,
            sources: question.sources,
        }
    }
}

/// Response of the preview endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewResponse {
    /// Topic actually requested.
    pub topic: String,
    /// Generated questions.
    pub questions: Vec<PreviewQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_parameters() {
        let request = PreviewQuery::default().into_request(&PacingConfig::default());
        assert_eq!(request.topic, "general knowledge");
        assert_eq!(request.count, 5);
        assert_eq!(request.difficulty, 3);
        assert!(request.grounding);
    }

    #[test]
    fn explicit_parameters_win() {
        let query = PreviewQuery {
            topic: Some(" 地理 ".into()),
            count: Some(2),
            difficulty: Some(7),
            genre: None,
            grounding: Some(false),
        };
        assert!(query.validate().is_ok());
        let request = query.into_request(&PacingConfig::default());
        assert_eq!(request.topic, "地理");
        assert_eq!(request.count, 2);
        assert_eq!(request.difficulty, 7);
        assert!(!request.grounding);
    }

    #[test]
    fn out_of_range_count_is_rejected() {
        let query = PreviewQuery {
            count: Some(50),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }
}
