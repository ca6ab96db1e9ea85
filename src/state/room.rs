//! Room aggregate: participants, question pool, cursor, mode flags and the timer slots
//! owned by the room.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::state::{
    ConnId, RoomId,
    buzz::BuzzArbiter,
    timers::{RoomTimers, TaskHandle, TimerKind},
};

/// How questions are paced in a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// The moderator sends every question.
    #[default]
    Manual,
    /// A repeating tick sends the next question every interval.
    Auto,
    /// Question/reveal cycle over a pool generated on demand.
    #[serde(alias = "llm")]
    PacedGenerated,
}

/// Timer regime suspended while a participant holds the buzz lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// The auto-mode tick.
    Auto,
    /// The paced question timer.
    Paced,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
/// Pacing and generation settings of a room.
pub struct PacingConfig {
    #[serde(rename = "interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[schema(value_type = u64)]
    /// Time a question stays open (auto tick period, paced question timeout).
    pub interval: Duration,
    #[serde(rename = "reveal_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[schema(value_type = u64)]
    /// Time an answer stays on display before the round advances.
    pub reveal: Duration,
    /// Answer window granted per canonical answer character, in seconds.
    pub seconds_per_char: f64,
    /// Refill starts once this many questions or fewer remain.
    pub refill_threshold: usize,
    /// Questions requested per refill.
    pub refill_count: usize,
    /// Subject passed to the question source.
    pub topic: String,
    /// Difficulty from 1 (elementary) to 10 (specialist).
    pub difficulty: u8,
    /// Optional genre hint.
    pub genre: String,
    /// Ask the source to ground questions with web search.
    pub grounding: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10_000),
            reveal: Duration::from_millis(3_000),
            seconds_per_char: 3.0,
            refill_threshold: 2,
            refill_count: 5,
            topic: "general knowledge".into(),
            difficulty: 3,
            genre: String::new(),
            grounding: true,
        }
    }
}

/// Someone connected to a room as a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Connection id, doubles as participant id.
    pub id: ConnId,
    /// Display name.
    pub name: String,
}

/// Attribution attached to a generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Citation {
    /// Source title.
    pub title: String,
    /// Source location.
    pub uri: String,
}

/// Question in a room pool. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable id.
    pub id: String,
    /// Text shown to everyone.
    pub text: String,
    /// Canonical answer; compared and measured after normalization.
    pub answer: String,
    /// Attributions.
    pub sources: Vec<Citation>,
}

/// Per-room session state.
#[derive(Debug)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Moderator connection, if any.
    pub moderator: Option<ConnId>,
    /// Participants in join order.
    pub participants: IndexMap<ConnId, Participant>,
    /// Question pool, append-only except on replacement.
    pub questions: Vec<Question>,
    /// Next question to send.
    pub current_index: usize,
    /// Question currently on display.
    pub active: Option<usize>,
    /// Pacing mode.
    pub mode: Mode,
    /// Round started.
    pub started: bool,
    /// Submissions rejected while an answer is revealed.
    pub answer_locked: bool,
    /// Buzz lock.
    pub buzz: BuzzArbiter,
    /// Single-flight guard of the background refill.
    pub refilling: bool,
    /// Paced cycle suspended for lack of participants.
    pub paused: bool,
    /// Paced start deferred until the running refill lands.
    pub awaiting_pool: bool,
    /// Regime interrupted by the current buzz.
    pub suspended: Option<Regime>,
    /// Pacing configuration.
    pub config: PacingConfig,
    /// Exclusively owned timer slots.
    pub timers: RoomTimers,
    /// Supervised background refill, if running.
    pub refill: Option<TaskHandle>,
    /// Bumped whenever mode, restart or configuration invalidates in-flight work.
    pub epoch: u64,
    /// Last command handled, for idle eviction.
    pub last_activity: Instant,
}

impl Room {
    /// Fresh room using `config` as its pacing configuration.
    pub fn new(id: RoomId, config: PacingConfig) -> Self {
        Self {
            id,
            moderator: None,
            participants: IndexMap::new(),
            questions: Vec::new(),
            current_index: 0,
            active: None,
            mode: Mode::default(),
            started: false,
            answer_locked: false,
            buzz: BuzzArbiter::default(),
            refilling: false,
            paused: false,
            awaiting_pool: false,
            suspended: None,
            config,
            timers: RoomTimers::default(),
            refill: None,
            epoch: 0,
            last_activity: Instant::now(),
        }
    }

    /// Question on display, if any.
    pub fn active_question(&self) -> Option<(usize, &Question)> {
        let index = self.active?;
        self.questions.get(index).map(|question| (index, question))
    }

    /// Questions not yet sent.
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current_index)
    }

    /// Whether the room runs the paced generated mode.
    pub fn is_paced(&self) -> bool {
        self.mode == Mode::PacedGenerated
    }

    /// Whether anyone is left to play.
    pub fn has_participants(&self) -> bool {
        !self.participants.is_empty()
    }

    /// Whether a paced question or reveal callback is scheduled.
    pub fn paced_cycle_live(&self) -> bool {
        self.timers.is_live(TimerKind::Question) || self.timers.is_live(TimerKind::Reveal)
    }

    /// Invalidate in-flight work tied to the previous mode or configuration.
    pub fn bump_epoch(&mut self) {
        self.epoch += 1;
    }

    /// Record activity now.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether nothing keeps the room alive.
    pub fn is_idle(&self) -> bool {
        self.participants.is_empty() && self.moderator.is_none() && !self.refilling
    }

    /// Abort every timer and the background refill.
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
        self.refill = None;
        self.refilling = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: format!("question {id}"),
            answer: "こたえ".into(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&Mode::PacedGenerated).unwrap(),
            "\"paced-generated\""
        );
        let legacy: Mode = serde_json::from_str("\"llm\"").unwrap();
        assert_eq!(legacy, Mode::PacedGenerated);
        let auto: Mode = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(auto, Mode::Auto);
    }

    #[test]
    fn pacing_config_serializes_durations_as_millis() {
        let value = serde_json::to_value(PacingConfig::default()).unwrap();
        assert_eq!(value["interval_ms"], 10_000);
        assert_eq!(value["reveal_ms"], 3_000);
        assert_eq!(value["topic"], "general knowledge");
    }

    #[test]
    fn remaining_never_underflows() {
        let mut room = Room::new("r".into(), PacingConfig::default());
        room.questions = vec![question("a"), question("b")];
        assert_eq!(room.remaining(), 2);
        room.current_index = 5;
        assert_eq!(room.remaining(), 0);
    }

    #[test]
    fn active_question_follows_display_index() {
        let mut room = Room::new("r".into(), PacingConfig::default());
        room.questions = vec![question("a"), question("b")];
        assert!(room.active_question().is_none());
        room.active = Some(1);
        assert_eq!(room.active_question().map(|(i, q)| (i, q.id.as_str())), Some((1, "b")));
        room.active = Some(7);
        assert!(room.active_question().is_none());
    }

    #[test]
    fn idle_requires_nobody_and_no_refill() {
        let mut room = Room::new("r".into(), PacingConfig::default());
        assert!(room.is_idle());
        room.refilling = true;
        assert!(!room.is_idle());
        room.refilling = false;
        room.moderator = Some("m".into());
        assert!(!room.is_idle());
    }
}
