//! Validated configuration updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::room::PacingConfig;

/// Partial pacing configuration; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema, Validate)]
pub struct PacingConfigUpdate {
    /// Question timer and auto tick, in milliseconds.
    #[validate(range(min = 100, max = 600_000))]
    pub interval_ms: Option<u64>,
    /// Reveal delay before advancing, in milliseconds.
    #[validate(range(max = 60_000))]
    pub reveal_ms: Option<u64>,
    /// Answer window per canonical answer character.
    #[validate(range(min = 0.1, max = 60.0))]
    pub seconds_per_char: Option<f64>,
    /// Remaining questions at or below which a refill starts.
    #[validate(range(max = 100))]
    pub refill_threshold: Option<usize>,
    /// Questions requested per refill.
    #[validate(range(min = 1, max = 20))]
    pub refill_count: Option<usize>,
    /// Generation topic.
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    /// Generation difficulty, 1 to 10.
    #[validate(range(min = 1, max = 10))]
    pub difficulty: Option<u8>,
    /// Optional genre hint.
    #[validate(length(max = 200))]
    pub genre: Option<String>,
    /// Ground generation on web search.
    pub grounding: Option<bool>,
}

impl PacingConfigUpdate {
    /// Overlay the provided fields onto `config`.
    pub fn apply_to(self, config: &mut PacingConfig) {
        if let Some(ms) = self.interval_ms {
            config.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reveal_ms {
            config.reveal = Duration::from_millis(ms);
        }
        if let Some(seconds) = self.seconds_per_char {
            config.seconds_per_char = seconds;
        }
        if let Some(threshold) = self.refill_threshold {
            config.refill_threshold = threshold;
        }
        if let Some(count) = self.refill_count {
            config.refill_count = count;
        }
        if let Some(topic) = self.topic {
            let topic = topic.trim();
            if !topic.is_empty() {
                config.topic = topic.to_owned();
            }
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(genre) = self.genre {
            config.genre = genre.trim().to_owned();
        }
        if let Some(grounding) = self.grounding {
            config.grounding = grounding;
        }
    }
}
