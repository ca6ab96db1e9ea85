use tracing::info;

use crate::{
    dto::ws::RoomEvent,
    error::CommandError,
    matcher,
    services::{pacing, room_events},
    state::{
        ConnId, SharedState,
        buzz::answer_window,
        room::{Regime, Room},
        timers::TimerKind,
    },
};

/// `buzz-cancelled` reason when the responder gave up.
pub const CANCELLED: &str = "cancelled";
/// `buzz-cancelled` reason when the responder's connection went away.
pub const DISCONNECTED: &str = "disconnect";

/// Grant the buzz lock on the question on display to `conn`.
///
/// Suspends whichever pacing timer is running, hands the answer window and answer metadata
/// to the responder alone and tells everyone else that inputs are locked.
pub fn buzz(state: &SharedState, room: &mut Room, conn: &ConnId) -> Result<(), CommandError> {
    if room.buzz.is_locked() {
        return Err(CommandError::Busy);
    }
    if !room.participants.contains_key(conn) {
        return Err(CommandError::NotJoined);
    }
    let Some((index, question)) = room.active_question() else {
        return Err(CommandError::NoQuestion);
    };
    if room.answer_locked {
        return Err(CommandError::Locked);
    }
    let answer = question.answer.clone();
    let answer_length = matcher::answer_length(&answer);
    let window = answer_window(room.config.seconds_per_char, answer_length);

    room.buzz
        .try_lock(conn)
        .map_err(|_| CommandError::Busy)?;
    suspend_pacing(room);

    let answer_window_ms = room_events::millis(window);
    info!(room_id = %room.id, conn_id = %conn, index, answer_window_ms, "buzz granted");
    room_events::reply(
        state,
        conn,
        &RoomEvent::BuzzGranted {
            index,
            answer_window_ms,
            answer_length,
            answer,
        },
    );
    room_events::emit_except(
        state,
        room,
        conn,
        &RoomEvent::BuzzLocked {
            participant_id: conn.clone(),
            name: room_events::display_name(room, conn),
        },
    );
    pacing::schedule(state, room, TimerKind::Answer, window);
    Ok(())
}

fn suspend_pacing(room: &mut Room) {
    if room.timers.cancel(TimerKind::Tick) {
        room.suspended = Some(Regime::Auto);
    } else if room.timers.cancel(TimerKind::Question) {
        room.suspended = Some(Regime::Paced);
    }
}

/// Give up the buzz held by `conn`.
pub fn cancel(state: &SharedState, room: &mut Room, conn: &ConnId) -> Result<(), CommandError> {
    if !room.buzz.is_responder(conn) {
        return Err(CommandError::NotResponder);
    }
    release(state, room, CANCELLED, true);
    Ok(())
}

/// Clear the buzz lock and announce it.
///
/// With `resume`, the question on display is re-emitted and the suspended regime restarts
/// at its full interval; otherwise the suspended regime is dropped.
pub fn release(state: &SharedState, room: &mut Room, reason: &'static str, resume: bool) {
    room.timers.cancel(TimerKind::Answer);
    let Some(responder) = room.buzz.open() else {
        return;
    };
    room.answer_locked = false;
    info!(room_id = %room.id, conn_id = %responder, reason, "buzz released");
    room_events::emit(
        state,
        room,
        &RoomEvent::BuzzCancelled {
            name: room_events::display_name(room, &responder),
            participant_id: responder,
            reason,
        },
    );
    if resume {
        pacing::emit_question(state, room);
        pacing::restore_regime(state, room);
    } else {
        room.suspended = None;
    }
}

/// Reveal the answer on display and schedule the round advance.
fn resolve(state: &SharedState, room: &mut Room) {
    room.timers.cancel(TimerKind::Answer);
    room.timers.cancel(TimerKind::Question);
    room.buzz.open();
    room.answer_locked = true;
    if let Some(event) = room
        .active
        .and_then(|index| room_events::reveal_event(room, index))
    {
        room_events::emit(state, room, &event);
    }
    let reveal = room.config.reveal;
    pacing::schedule(state, room, TimerKind::Reveal, reveal);
}

/// Answer window of the current responder is over.
pub fn on_answer_elapsed(state: &SharedState, room: &mut Room) {
    if room.buzz.is_locked() {
        info!(room_id = %room.id, "answer window elapsed");
        resolve(state, room);
    }
}

/// Score a submission for the question at `index`.
///
/// The caller gets the verdict, the moderator gets the normalized text and verdict, the room
/// only learns that an attempt was made. A responder's submission always resolves the
/// question; so does a correct answer to the displayed question in paced mode.
pub fn submit_answer(
    state: &SharedState,
    room: &mut Room,
    conn: &ConnId,
    index: usize,
    answer: &str,
) -> Result<(), CommandError> {
    if room
        .buzz
        .responder()
        .is_some_and(|responder| responder != conn)
    {
        return Err(CommandError::NotYourTurn);
    }
    if room.answer_locked {
        return Err(CommandError::Locked);
    }
    let Some(question) = room.questions.get(index) else {
        return Err(CommandError::NoQuestion);
    };
    let ok = matcher::matches(&question.answer, answer);
    let name = room_events::display_name(room, conn);
    info!(room_id = %room.id, conn_id = %conn, index, ok, "answer submitted");

    room_events::reply(
        state,
        conn,
        &RoomEvent::AnswerResult {
            index: Some(index),
            ok,
            error: None,
        },
    );
    if let Some(moderator) = room.moderator.as_ref() {
        room_events::reply(
            state,
            moderator,
            &RoomEvent::PlayerAnswer {
                participant_id: conn.clone(),
                name: name.clone(),
                index,
                answer: matcher::normalize(answer),
                ok,
            },
        );
    }
    room_events::emit(
        state,
        room,
        &RoomEvent::PlayerAttempt {
            participant_id: conn.clone(),
            name,
            index,
        },
    );

    let was_responder = room.buzz.is_responder(conn);
    if was_responder || (ok && room.is_paced() && room.active == Some(index)) {
        resolve(state, room);
    }
    Ok(())
}
