//! Frames exchanged with room WebSocket clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{room::RoomSnapshot, validation::PacingConfigUpdate},
    state::room::{Citation, Mode},
};

/// Role requested when joining a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Moderator driving the room.
    #[serde(alias = "moderator")]
    Host,
    /// Participant allowed to buzz and answer.
    #[default]
    Player,
}

/// Question supplied wholesale by a moderator.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct QuestionInput {
    /// Stable id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Question text shown to everyone.
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    /// Canonical answer.
    #[serde(alias = "answer_text", alias = "answerText")]
    pub answer: String,
    /// Optional attributions.
    #[serde(default)]
    pub sources: Vec<Citation>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Commands accepted from room WebSocket clients.
///
/// Every command names its target room in `room_id`.
#[allow(missing_docs)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Enter a room, creating it on first use.
    Join {
        room_id: String,
        /// Display name; `Player` when blank.
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        role: Role,
    },
    /// Switch pacing mode, dropping every timer.
    SetMode { room_id: String, mode: Mode },
    /// Start pacing for the current mode.
    StartGame { room_id: String },
    /// Reset the round, optionally under a new configuration.
    RestartGame {
        room_id: String,
        #[serde(default)]
        config: Option<PacingConfigUpdate>,
    },
    /// Replace the question pool.
    SetQuestions {
        room_id: String,
        questions: Vec<QuestionInput>,
    },
    /// Update pacing configuration.
    SetPacingConfig {
        room_id: String,
        config: PacingConfigUpdate,
    },
    /// Send a question by index, or the next one.
    NextQuestion {
        room_id: String,
        #[serde(default)]
        index: Option<usize>,
    },
    /// Reveal the answer on display.
    RevealAnswer { room_id: String },
    /// Claim the buzz lock.
    Buzz { room_id: String },
    /// Give the buzz lock back.
    CancelBuzz { room_id: String },
    /// Submit an answer for the question at `index`.
    SubmitAnswer {
        room_id: String,
        index: usize,
        answer: String,
    },
    /// Partial answer relayed to the rest of the room.
    TypingUpdate {
        room_id: String,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        partial: String,
    },
    /// Start a background refill of the configured size.
    ForceRefill { room_id: String },
    /// Start a background refill of `count` questions.
    GenerateQuestions {
        room_id: String,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        config: Option<PacingConfigUpdate>,
    },
    /// Any command type this server does not know.
    #[serde(other)]
    Unknown,
}

impl ClientCommand {
    /// Parse a text frame.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Room the command targets.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Join { room_id, .. }
            | Self::SetMode { room_id, .. }
            | Self::StartGame { room_id }
            | Self::RestartGame { room_id, .. }
            | Self::SetQuestions { room_id, .. }
            | Self::SetPacingConfig { room_id, .. }
            | Self::NextQuestion { room_id, .. }
            | Self::RevealAnswer { room_id }
            | Self::Buzz { room_id }
            | Self::CancelBuzz { room_id }
            | Self::SubmitAnswer { room_id, .. }
            | Self::TypingUpdate { room_id, .. }
            | Self::ForceRefill { room_id }
            | Self::GenerateQuestions { room_id, .. } => Some(room_id.as_str()),
            Self::Unknown => None,
        }
    }

    /// Wire name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::SetMode { .. } => "set-mode",
            Self::StartGame { .. } => "start-game",
            Self::RestartGame { .. } => "restart-game",
            Self::SetQuestions { .. } => "set-questions",
            Self::SetPacingConfig { .. } => "set-pacing-config",
            Self::NextQuestion { .. } => "next-question",
            Self::RevealAnswer { .. } => "reveal-answer",
            Self::Buzz { .. } => "buzz",
            Self::CancelBuzz { .. } => "cancel-buzz",
            Self::SubmitAnswer { .. } => "submit-answer",
            Self::TypingUpdate { .. } => "typing-update",
            Self::ForceRefill { .. } => "force-refill",
            Self::GenerateQuestions { .. } => "generate-questions",
            Self::Unknown => "unknown",
        }
    }
}

/// Events pushed to room clients, framed as `{"event": <name>, "data": <payload>}`.
///
/// Payload fields carry their wire names; `participant_id` and `name` always identify the
/// participant the event is about.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// First frame on every socket.
    Connected { connection_id: String },
    /// Full room snapshot.
    RoomState(RoomSnapshot),
    /// Mode switched.
    ModeChanged { mode: Mode },
    /// Round started with this pacing budget.
    GameStarted {
        mode: Mode,
        interval_ms: u64,
        reveal_ms: u64,
    },
    /// Question on display.
    Question {
        index: usize,
        text: String,
        answer_length: usize,
        /// Pacing budget in the timed modes.
        #[serde(skip_serializing_if = "Option::is_none")]
        time_allowed_ms: Option<u64>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        sources: Vec<Citation>,
    },
    /// Canonical answer of the question at `index`.
    RevealAnswer { index: usize, answer: String },
    /// Sent to the responder only.
    BuzzGranted {
        index: usize,
        answer_window_ms: u64,
        answer_length: usize,
        answer: String,
    },
    /// Everyone but the responder is locked out.
    BuzzLocked {
        participant_id: String,
        name: String,
    },
    /// The buzz lock was given back.
    BuzzCancelled {
        participant_id: String,
        name: String,
        reason: &'static str,
    },
    /// Buzz refused, sent to the caller only.
    BuzzDenied { reason: &'static str },
    /// Verdict on the caller's submission.
    AnswerResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'static str>,
    },
    /// Sent to the moderator with the submitted text and verdict.
    PlayerAnswer {
        participant_id: String,
        name: String,
        index: usize,
        answer: String,
        ok: bool,
    },
    /// Someone submitted; the verdict stays private.
    PlayerAttempt {
        participant_id: String,
        name: String,
        index: usize,
    },
    /// Partial answer of another participant.
    PlayerTyping {
        participant_id: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        partial: String,
    },
    /// Pool exhausted.
    RoundFinished,
    /// Paced cycle suspended.
    Paused { reason: &'static str },
    /// Paced cycle running again.
    Resumed { reason: &'static str },
    /// Background refill accepted.
    RefillStarted { count: usize },
    /// Questions appended to the pool.
    RefillResult { added: usize },
    /// Synchronous generation gave up.
    RefillError { message: String },
    /// Outcome of `restart-game`, sent to the caller.
    RestartResult {
        success: bool,
        questions_count: usize,
        regenerating: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Rejected command, sent to the caller only.
    Error { reason: &'static str },
}

impl RoomEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RoomState(_) => "room-state",
            Self::ModeChanged { .. } => "mode-changed",
            Self::GameStarted { .. } => "game-started",
            Self::Question { .. } => "question",
            Self::RevealAnswer { .. } => "reveal-answer",
            Self::BuzzGranted { .. } => "buzz-granted",
            Self::BuzzLocked { .. } => "buzz-locked",
            Self::BuzzCancelled { .. } => "buzz-cancelled",
            Self::BuzzDenied { .. } => "buzz-denied",
            Self::AnswerResult { .. } => "answer-result",
            Self::PlayerAnswer { .. } => "player-answer",
            Self::PlayerAttempt { .. } => "player-attempt",
            Self::PlayerTyping { .. } => "player-typing",
            Self::RoundFinished => "round-finished",
            Self::Paused { .. } => "paused",
            Self::Resumed { .. } => "resumed",
            Self::RefillStarted { .. } => "refill-started",
            Self::RefillResult { .. } => "refill-result",
            Self::RefillError { .. } => "refill-error",
            Self::RestartResult { .. } => "restart-result",
            Self::Error { .. } => "error",
        }
    }
}
