//! Room commands that are neither pacing nor buzzing: membership, pool and configuration
//! management, manual question flow and refill triggers.

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        validation::PacingConfigUpdate,
        ws::{QuestionInput, Role, RoomEvent},
    },
    error::CommandError,
    services::{
        buzz_service::{self, DISCONNECTED},
        pacing::{self, Advance},
        refill, room_events,
    },
    state::{
        ConnId, SharedState,
        room::{Participant, Question, Room},
        timers::TimerKind,
    },
};

const DEFAULT_PLAYER_NAME: &str = "Player";
/// Upper bound of a single `generate-questions` batch.
pub const MAX_BATCH: usize = 20;

/// Register `conn` in `room_id` as moderator or participant, creating the room on first use.
///
/// A participant joining a paused paced round resumes it.
pub async fn join(
    state: &SharedState,
    conn: &ConnId,
    room_id: &str,
    name: Option<String>,
    role: Role,
) {
    let handle = state.rooms().get_or_create(room_id);
    let mut room = handle.lock().await;
    match role {
        Role::Host => room.moderator = Some(conn.clone()),
        Role::Player => {
            let name = name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_owned());
            room.participants.insert(
                conn.clone(),
                Participant {
                    id: conn.clone(),
                    name,
                },
            );
        }
    }
    state.transport().join_room(conn, &room.id);
    room.touch();
    info!(room_id = %room.id, conn_id = %conn, ?role, "joined room");

    if role == Role::Player {
        pacing::resume_paced(state, &mut room);
    }
    room_events::broadcast_state(state, &room);
}

/// Remove `conn` from `room_id`, releasing its buzz and pausing an emptied paced round.
pub async fn leave(state: &SharedState, conn: &ConnId, room_id: &str) {
    let Some(handle) = state.rooms().get(room_id) else {
        return;
    };
    let mut room = handle.lock().await;
    if room.buzz.is_responder(conn) {
        // An emptied paced room pauses below; auto keeps ticking without players.
        let others_remain = room.participants.keys().any(|id| id != conn);
        let resume = others_remain || !room.is_paced();
        buzz_service::release(state, &mut room, DISCONNECTED, resume);
    }
    room.participants.shift_remove(conn);
    if room.moderator.as_ref() == Some(conn) {
        room.moderator = None;
    }
    state.transport().leave_room(conn, &room.id);
    if room.is_paced() && room.started && !room.has_participants() {
        pacing::pause_for_absence(state, &mut room);
    }
    room.touch();
    info!(room_id = %room.id, conn_id = %conn, "left room");
    room_events::broadcast_state(state, &room);
}

/// Drop the running round: timers, buzz lock, cursor and the started flag.
fn reset_round(room: &mut Room) {
    room.timers.cancel_all();
    room.buzz.open();
    room.answer_locked = false;
    room.suspended = None;
    room.paused = false;
    room.awaiting_pool = false;
    room.current_index = 0;
    room.active = None;
    room.started = false;
    room.bump_epoch();
}

/// Reset the round, optionally under a new configuration, and regenerate a paced pool.
pub fn restart(
    state: &SharedState,
    room: &mut Room,
    conn: &ConnId,
    config: Option<PacingConfigUpdate>,
) -> Result<(), CommandError> {
    if let Some(update) = config.as_ref() {
        update.validate()?;
    }
    reset_round(room);
    if let Some(update) = config {
        update.apply_to(&mut room.config);
    }

    let regenerating = room.is_paced();
    let mut error = None;
    if regenerating {
        room.questions.clear();
        refill::cancel(room);
        if state.is_degraded() {
            error = Some("question source unavailable".to_owned());
        } else {
            let count = room.config.refill_count;
            refill::start(state, room, count)?;
        }
    }
    info!(
        room_id = %room.id,
        regenerating,
        questions = room.questions.len(),
        "round restarted"
    );
    room_events::reply(
        state,
        conn,
        &RoomEvent::RestartResult {
            success: error.is_none(),
            questions_count: room.questions.len(),
            regenerating: regenerating && error.is_none(),
            error,
        },
    );
    Ok(())
}

/// Replace the pool wholesale.
pub fn set_questions(
    state: &SharedState,
    room: &mut Room,
    questions: Vec<QuestionInput>,
) -> Result<(), CommandError> {
    for question in &questions {
        question.validate()?;
    }
    room.questions = questions
        .into_iter()
        .map(|input| Question {
            id: input
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            text: input.text.trim().to_owned(),
            answer: input.answer.trim().to_owned(),
            sources: input.sources,
        })
        .collect();
    info!(room_id = %room.id, count = room.questions.len(), "questions replaced");
    if room.is_paced() && room.started {
        refill::evaluate(state, room);
    }
    Ok(())
}

/// Apply a validated configuration update. A paced room drops its pool and round.
pub fn set_pacing_config(
    room: &mut Room,
    update: PacingConfigUpdate,
) -> Result<(), CommandError> {
    update.validate()?;
    update.apply_to(&mut room.config);
    if room.is_paced() {
        reset_round(room);
        room.questions.clear();
        refill::cancel(room);
    }
    info!(room_id = %room.id, config = ?room.config, "pacing configuration updated");
    Ok(())
}

/// Manually send the question at `index`, or the next one.
pub fn next_question(
    state: &SharedState,
    room: &mut Room,
    index: Option<usize>,
) -> Result<(), CommandError> {
    let index = match index {
        Some(index) => index,
        None => match pacing::advance_round(room) {
            Advance::Next(index) => index,
            Advance::Finished => room.questions.len(),
        },
    };
    let sent = pacing::send_question(state, room, index);
    refill::evaluate(state, room);
    if !sent {
        return Err(CommandError::NoQuestion);
    }
    if room.is_paced() && room.started && !room.paused {
        room.timers.cancel(TimerKind::Reveal);
        pacing::arm_question_timer(state, room);
    }
    Ok(())
}

/// Manually reveal the answer on display and lock submissions.
pub fn reveal_answer(state: &SharedState, room: &mut Room) -> Result<(), CommandError> {
    let index = room.active.ok_or(CommandError::NoCurrentQuestion)?;
    let event = room_events::reveal_event(room, index).ok_or(CommandError::NoQuestion)?;
    room.timers.cancel(TimerKind::Answer);
    let interrupted = room.buzz.open().is_some();
    room.answer_locked = true;
    room_events::emit(state, room, &event);
    if interrupted {
        pacing::restore_regime(state, room);
    }
    Ok(())
}

/// Relay a partial answer to everyone else in the room.
pub fn typing(
    state: &SharedState,
    room: &Room,
    conn: &ConnId,
    index: Option<usize>,
    partial: String,
) {
    room_events::emit_except(
        state,
        room,
        conn,
        &RoomEvent::PlayerTyping {
            participant_id: conn.clone(),
            name: room_events::display_name(room, conn),
            index: index.or(room.active),
            partial,
        },
    );
}

/// Start a background refill of the configured size.
pub fn force_refill(
    state: &SharedState,
    room: &mut Room,
    conn: &ConnId,
) -> Result<(), CommandError> {
    let count = room.config.refill_count;
    refill::start(state, room, count)?;
    room_events::reply(state, conn, &RoomEvent::RefillStarted { count });
    Ok(())
}

/// Apply an optional configuration, then start a background refill of `count` questions.
pub fn generate_questions(
    state: &SharedState,
    room: &mut Room,
    conn: &ConnId,
    count: Option<usize>,
    config: Option<PacingConfigUpdate>,
) -> Result<(), CommandError> {
    if room.refilling {
        return Err(CommandError::AlreadyRefilling);
    }
    if let Some(update) = config {
        update.validate()?;
        update.apply_to(&mut room.config);
    }
    let count = count.unwrap_or(room.config.refill_count).clamp(1, MAX_BATCH);
    refill::start(state, room, count)?;
    room_events::reply(state, conn, &RoomEvent::RefillStarted { count });
    Ok(())
}
