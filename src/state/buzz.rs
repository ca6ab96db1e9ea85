//! Exclusive answering lock of a room.

use std::time::Duration;

use crate::state::ConnId;

/// Shortest answer window ever granted.
pub const MIN_ANSWER_WINDOW: Duration = Duration::from_millis(300);
/// Seconds per character used when the configured factor is unusable.
const FALLBACK_SECONDS_PER_CHAR: f64 = 3.0;

/// Why a buzz attempt was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuzzRefusal {
    /// Someone else already holds the lock.
    Busy,
}

/// Lock state of the buzz arbiter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BuzzArbiter {
    /// Nobody is answering.
    #[default]
    Open,
    /// `responder` holds the exclusive answering window.
    Locked {
        /// Connection id of the participant answering.
        responder: ConnId,
    },
}

impl BuzzArbiter {
    /// Grant the lock to `participant` if it is free.
    pub fn try_lock(&mut self, participant: &ConnId) -> Result<(), BuzzRefusal> {
        match self {
            Self::Locked { .. } => Err(BuzzRefusal::Busy),
            Self::Open => {
                *self = Self::Locked {
                    responder: participant.clone(),
                };
                Ok(())
            }
        }
    }

    /// Drop the lock, returning the previous responder.
    pub fn open(&mut self) -> Option<ConnId> {
        match std::mem::take(self) {
            Self::Locked { responder } => Some(responder),
            Self::Open => None,
        }
    }

    /// Current responder, if any.
    pub fn responder(&self) -> Option<&ConnId> {
        match self {
            Self::Locked { responder } => Some(responder),
            Self::Open => None,
        }
    }

    /// Whether `participant` currently holds the lock.
    pub fn is_responder(&self, participant: &ConnId) -> bool {
        self.responder() == Some(participant)
    }

    /// Whether anyone holds the lock.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Time granted to answer a question whose canonical answer has `answer_length` characters.
///
/// Non-positive or non-finite factors fall back to three seconds per character, and the
/// result never drops below [`MIN_ANSWER_WINDOW`].
pub fn answer_window(seconds_per_char: f64, answer_length: usize) -> Duration {
    let per_char = if seconds_per_char.is_finite() && seconds_per_char > 0.0 {
        seconds_per_char
    } else {
        FALLBACK_SECONDS_PER_CHAR
    };
    let millis = (per_char * answer_length as f64 * 1000.0).round();
    Duration::from_millis(millis as u64).max(MIN_ANSWER_WINDOW)
}
