//! Timer choreography of the timed modes.
//!
//! Auto mode runs a repeating tick that sends the next question every interval. Paced
//! mode alternates a question timer (reveal on fire) and a reveal timer (advance on fire),
//! and pauses whenever the room has nobody left to play. Every callback re-fetches its
//! room through the registry and must still own its timer slot before acting.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dto::ws::RoomEvent,
    services::{buzz_service, refill, room_events},
    source::{GeneratedQuestion, GenerationRequest, generate_with_budget},
    state::{
        RoomHandle, RoomId, SharedState,
        room::{Mode, Regime, Room},
        timers::{TaskHandle, TimerKind},
    },
};

/// Reason attached to `paused` when the last participant is gone.
pub const NO_PLAYERS: &str = "no-players";
/// Reason attached to `resumed` when a participant comes back.
pub const PLAYER_JOINED: &str = "player-joined";
/// Reason attached to `resumed` when a deferred round gets its questions.
pub const POOL_READY: &str = "pool-ready";

/// Where the round goes once the question on display is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Send the question at this index.
    Next(usize),
    /// The pool is exhausted.
    Finished,
}

/// The single reveal-then-advance transition shared by every timer and answer path.
pub fn advance_round(room: &Room) -> Advance {
    let next = room.active.map_or(room.current_index, |index| index + 1);
    if next < room.questions.len() {
        Advance::Next(next)
    } else {
        Advance::Finished
    }
}

/// Schedule a one-shot callback in `kind`, replacing whatever the slot held.
pub fn schedule(state: &SharedState, room: &mut Room, kind: TimerKind, delay: Duration) {
    let token = room.timers.next_token();
    let task_state = Arc::clone(state);
    let room_id = room.id.clone();
    let task = tokio::spawn(async move {
        sleep(delay).await;
        fire(task_state, room_id, kind, token).await;
    });
    room.timers.install(kind, TaskHandle::new(token, task));
}

async fn fire(state: SharedState, room_id: RoomId, kind: TimerKind, token: u64) {
    let Some(handle) = state.rooms().get(&room_id) else {
        debug!(room_id = %room_id, ?kind, "timer fired for a removed room");
        return;
    };
    let mut room = handle.lock().await;
    if !room.timers.claim(kind, token) {
        debug!(room_id = %room_id, ?kind, "discarding stale timer");
        return;
    }
    match kind {
        TimerKind::Question => on_question_elapsed(&state, &mut room),
        TimerKind::Reveal => on_reveal_elapsed(&state, &mut room),
        TimerKind::Answer => buzz_service::on_answer_elapsed(&state, &mut room),
        TimerKind::Tick => warn!(room_id = %room_id, "tick slot scheduled as a one-shot timer"),
    }
    room_events::broadcast_state(&state, &room);
}

/// Display the question at `index`, returning `false` when it does not exist.
///
/// Clears the buzz lock and unlocks answers. Auto mode moves the cursor past the question,
/// the other modes point it at it; once a round has started the cursor never moves back.
pub fn send_question(state: &SharedState, room: &mut Room, index: usize) -> bool {
    let Some(event) = room_events::question_event(room, index) else {
        return false;
    };
    room.timers.cancel(TimerKind::Answer);
    room.buzz.open();
    room.answer_locked = false;
    room.active = Some(index);
    let cursor = if room.mode == Mode::Auto {
        index + 1
    } else {
        index
    };
    room.current_index = if room.started {
        cursor.max(room.current_index)
    } else {
        cursor
    };
    room_events::emit(state, room, &event);
    true
}

/// Re-emit the question on display without touching the cursor.
pub fn emit_question(state: &SharedState, room: &Room) {
    if let Some(event) = room
        .active
        .and_then(|index| room_events::question_event(room, index))
    {
        room_events::emit(state, room, &event);
    }
}

/// Start the repeating auto tick at the configured interval.
pub fn start_tick(state: &SharedState, room: &mut Room) {
    let token = room.timers.next_token();
    let interval = room.config.interval;
    let task_state = Arc::clone(state);
    let room_id = room.id.clone();
    let task = tokio::spawn(run_tick(task_state, room_id, interval, token));
    room.timers.install(TimerKind::Tick, TaskHandle::new(token, task));
}

async fn run_tick(state: SharedState, room_id: RoomId, interval: Duration, token: u64) {
    loop {
        sleep(interval).await;
        let Some(handle) = state.rooms().get(&room_id) else {
            return;
        };
        let mut room = handle.lock().await;
        if !room.timers.holds(TimerKind::Tick, token) {
            return;
        }
        let finished = match advance_round(&room) {
            Advance::Next(index) => {
                send_question(&state, &mut room, index);
                refill::evaluate(&state, &mut room);
                false
            }
            Advance::Finished => {
                room.timers.claim(TimerKind::Tick, token);
                finish_round(&state, &mut room);
                true
            }
        };
        room_events::broadcast_state(&state, &room);
        if finished {
            return;
        }
    }
}

/// Arm the paced question timer for a full interval.
pub fn arm_question_timer(state: &SharedState, room: &mut Room) {
    let interval = room.config.interval;
    schedule(state, room, TimerKind::Question, interval);
}

/// Paced question timeout: reveal the answer and lock submissions.
pub fn on_question_elapsed(state: &SharedState, room: &mut Room) {
    if !room.has_participants() {
        pause_for_absence(state, room);
        return;
    }
    room.answer_locked = true;
    if let Some(event) = room
        .active
        .and_then(|index| room_events::reveal_event(room, index))
    {
        room_events::emit(state, room, &event);
    }
    let reveal = room.config.reveal;
    schedule(state, room, TimerKind::Reveal, reveal);
}

/// Reveal delay over: top up the pool, then send the next question or end the round.
pub fn on_reveal_elapsed(state: &SharedState, room: &mut Room) {
    if room.is_paced() && room.started && !room.has_participants() {
        pause_for_absence(state, room);
        return;
    }
    refill::evaluate(state, room);
    match advance_round(room) {
        Advance::Finished => finish_round(state, room),
        Advance::Next(index) => {
            send_question(state, room, index);
            restore_regime(state, room);
        }
    }
}

/// Stop every pacing timer and announce the end of the pool.
pub fn finish_round(state: &SharedState, room: &mut Room) {
    room.timers.cancel(TimerKind::Tick);
    room.timers.cancel(TimerKind::Question);
    room.timers.cancel(TimerKind::Reveal);
    room.suspended = None;
    room.active = None;
    room.current_index = room.current_index.max(room.questions.len());
    info!(room_id = %room.id, "round finished");
    room_events::emit(state, room, &RoomEvent::RoundFinished);
}

/// Resume the regime interrupted by a buzz, restarting its interval at full length.
pub fn restore_regime(state: &SharedState, room: &mut Room) {
    let suspended = room.suspended.take();
    if room.is_paced() && room.started {
        arm_question_timer(state, room);
    } else if suspended == Some(Regime::Auto) && room.mode == Mode::Auto {
        start_tick(state, room);
    }
}

/// Tear down the paced cycle and raise `paused`.
pub fn pause_for_absence(state: &SharedState, room: &mut Room) {
    room.timers.cancel(TimerKind::Question);
    room.timers.cancel(TimerKind::Reveal);
    if !room.paused {
        room.paused = true;
        info!(room_id = %room.id, "paced round paused: no players");
        room_events::emit(state, room, &RoomEvent::Paused { reason: NO_PLAYERS });
    }
}

/// (Re)enter the paced cycle at the pending question.
///
/// The pending question is the one on display, or the cursor when nothing is displayed.
pub fn begin_paced_round(state: &SharedState, room: &mut Room, reason: &'static str) {
    room.awaiting_pool = false;
    if !room.has_participants() {
        pause_for_absence(state, room);
        return;
    }
    if room.paused {
        room.paused = false;
        info!(room_id = %room.id, reason, "paced round resumed");
        room_events::emit(state, room, &RoomEvent::Resumed { reason });
    }
    let index = pending_index(room);
    if send_question(state, room, index) {
        arm_question_timer(state, room);
    } else {
        finish_round(state, room);
    }
}

/// Resume a paused paced round after a participant joined. A live cycle is left alone.
pub fn resume_paced(state: &SharedState, room: &mut Room) {
    if !(room.is_paced() && room.started && room.paused) || room.paced_cycle_live() {
        return;
    }
    if pending_index(room) >= room.questions.len() {
        room.awaiting_pool = true;
        refill::evaluate(state, room);
        return;
    }
    begin_paced_round(state, room, PLAYER_JOINED);
}

/// Called by the refill loop once new questions were appended.
pub fn on_pool_landed(state: &SharedState, room: &mut Room) {
    if room.awaiting_pool && room.is_paced() && room.started {
        begin_paced_round(state, room, POOL_READY);
    }
}

fn pending_index(room: &Room) -> usize {
    room.active.unwrap_or(room.current_index)
}

/// Switch modes, dropping every timer, the buzz lock and any running refill.
pub fn set_mode(state: &SharedState, room: &mut Room, mode: Mode) {
    room.teardown();
    room.buzz.open();
    room.suspended = None;
    room.paused = false;
    room.awaiting_pool = false;
    room.bump_epoch();
    room.mode = mode;
    info!(room_id = %room.id, ?mode, "mode changed");
    room_events::emit(state, room, &RoomEvent::ModeChanged { mode });
}

/// Mark the room started and launch pacing for its mode.
///
/// An empty paced pool is filled synchronously within the generation budget; the room lock
/// is released while the source is awaited.
pub async fn start_game(state: &SharedState, handle: &RoomHandle) {
    let mut room = handle.lock().await;
    room.started = true;
    room_events::emit(
        state,
        &room,
        &RoomEvent::GameStarted {
            mode: room.mode,
            interval_ms: room_events::millis(room.config.interval),
            reveal_ms: room_events::millis(room.config.reveal),
        },
    );
    info!(room_id = %room.id, mode = ?room.mode, "game started");

    let mode = room.mode;
    match mode {
        Mode::Manual => {}
        Mode::Auto => {
            if !room.questions.is_empty() {
                start_tick(state, &mut room);
            }
        }
        Mode::PacedGenerated => {
            if !room.has_participants() {
                pause_for_absence(state, &mut room);
                refill::evaluate(state, &mut room);
            } else if pending_index(&room) < room.questions.len() {
                begin_paced_round(state, &mut room, POOL_READY);
                refill::evaluate(state, &mut room);
            } else if room.refilling {
                room.awaiting_pool = true;
            } else {
                drop(room);
                generate_initial_pool(state, handle).await;
                return;
            }
        }
    }
    room_events::broadcast_state(state, &room);
}

async fn generate_initial_pool(state: &SharedState, handle: &RoomHandle) {
    let (request, epoch) = {
        let mut room = handle.lock().await;
        room.refilling = true;
        room_events::broadcast_state(state, &room);
        (
            GenerationRequest::from_config(&room.config, room.config.refill_count),
            room.epoch,
        )
    };

    let source = state.source();
    let config = state.config();
    let outcome = generate_with_budget(source.as_ref(), request, &config.generation).await;

    let mut room = handle.lock().await;
    if room.epoch != epoch {
        debug!(room_id = %room.id, "discarding initial pool generated for a previous epoch");
        return;
    }
    room.refilling = false;
    match outcome {
        Ok(generated) => {
            let added = generated.len();
            room.questions
                .extend(generated.into_iter().map(GeneratedQuestion::into_question));
            info!(room_id = %room.id, added, "initial pool generated");
            room_events::emit(state, &room, &RoomEvent::RefillResult { added });
            begin_paced_round(state, &mut room, POOL_READY);
        }
        Err(err) => {
            warn!(room_id = %room.id, error = %err, "initial pool generation failed");
            room_events::emit(
                state,
                &room,
                &RoomEvent::RefillError {
                    message: err.to_string(),
                },
            );
        }
    }
    room_events::broadcast_state(state, &room);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::{PacingConfig, Question};

    fn room_with(count: usize) -> Room {
        let mut room = Room::new("r".into(), PacingConfig::default());
        room.questions = (0..count)
            .map(|i| Question {
                id: i.to_string(),
                text: format!("q{i}"),
                answer: "あ".into(),
                sources: Vec::new(),
            })
            .collect();
        room
    }

    #[test]
    fn advance_starts_at_the_cursor_when_nothing_is_displayed() {
        let mut room = room_with(2);
        assert_eq!(advance_round(&room), Advance::Next(0));
        room.current_index = 1;
        assert_eq!(advance_round(&room), Advance::Next(1));
    }

    #[test]
    fn advance_moves_past_the_displayed_question() {
        let mut room = room_with(3);
        room.active = Some(1);
        room.current_index = 1;
        assert_eq!(advance_round(&room), Advance::Next(2));
        room.active = Some(2);
        assert_eq!(advance_round(&room), Advance::Finished);
    }

    #[test]
    fn empty_pool_is_finished() {
        assert_eq!(advance_round(&room_with(0)), Advance::Finished);
    }
}
