//! Client-safe projection of a room.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::room::{Mode, PacingConfig, Room};

/// Participant as seen by other clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParticipantView {
    /// Display name.
    pub name: String,
}

/// Question as listed in a snapshot: the answer is never included.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuestionView {
    /// Question id.
    pub id: String,
    /// Question text.
    pub text: String,
}

/// Snapshot broadcast to a room after every state change.
///
/// Timer handles, canonical answers and the current responder are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// Moderator connection, if one joined.
    pub moderator: Option<String>,
    /// Participants by connection id, in join order.
    #[schema(value_type = Object)]
    pub participants: IndexMap<String, ParticipantView>,
    /// Pool without answers.
    pub questions: Vec<QuestionView>,
    /// Pool size.
    pub questions_count: usize,
    /// Pacing mode.
    pub mode: Mode,
    /// Whether the round has started.
    pub started: bool,
    /// Next question to send.
    pub current_index: usize,
    /// Whether submissions are rejected.
    pub answer_locked: bool,
    /// Pacing configuration.
    pub config: PacingConfig,
    /// Whether a refill is running.
    pub refilling: bool,
    /// Whether the paced cycle is paused.
    pub paused: bool,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            moderator: room.moderator.clone(),
            participants: room
                .participants
                .iter()
                .map(|(id, participant)| {
                    (
                        id.clone(),
                        ParticipantView {
                            name: participant.name.clone(),
                        },
                    )
                })
                .collect(),
            questions: room
                .questions
                .iter()
                .map(|question| QuestionView {
                    id: question.id.clone(),
                    text: question.text.clone(),
                })
                .collect(),
            questions_count: room.questions.len(),
            mode: room.mode,
            started: room.started,
            current_index: room.current_index,
            answer_locked: room.answer_locked,
            config: room.config.clone(),
            refilling: room.refilling,
            paused: room.paused,
        }
    }
}
