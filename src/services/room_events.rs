use std::time::Duration;

use crate::{
    dto::{room::RoomSnapshot, ws::RoomEvent},
    matcher,
    state::{
        ConnId, SharedState,
        room::{Mode, Room},
    },
};

/// Broadcast the client-safe snapshot of `room` to everyone in it.
pub fn broadcast_state(state: &SharedState, room: &Room) {
    emit(state, room, &RoomEvent::RoomState(RoomSnapshot::from(room)));
}

/// Send `event` to every connection in `room`.
pub fn emit(state: &SharedState, room: &Room, event: &RoomEvent) {
    state.transport().emit_to_room(&room.id, event);
}

/// Send `event` to every connection in `room` except `sender`.
pub fn emit_except(state: &SharedState, room: &Room, sender: &ConnId, event: &RoomEvent) {
    state.transport().emit_to_room_except(&room.id, sender, event);
}

/// Send `event` to a single connection.
pub fn reply(state: &SharedState, conn: &ConnId, event: &RoomEvent) {
    state.transport().emit_to_connection(conn, event);
}

/// `question` announcement for `index`, or `None` past the end of the pool.
///
/// Only the answer length leaves the server; the timed modes also carry their budget.
pub fn question_event(room: &Room, index: usize) -> Option<RoomEvent> {
    let question = room.questions.get(index)?;
    Some(RoomEvent::Question {
        index,
        text: question.text.clone(),
        answer_length: matcher::answer_length(&question.answer),
        time_allowed_ms: (room.mode != Mode::Manual).then(|| millis(room.config.interval)),
        sources: question.sources.clone(),
    })
}

/// `reveal-answer` for `index`, or `None` past the end of the pool.
pub fn reveal_event(room: &Room, index: usize) -> Option<RoomEvent> {
    room.questions
        .get(index)
        .map(|question| RoomEvent::RevealAnswer {
            index,
            answer: question.answer.clone(),
        })
}

/// Display name of a connection in `room`, empty when unknown.
pub fn display_name(room: &Room, conn: &ConnId) -> String {
    room.participants
        .get(conn)
        .map(|participant| participant.name.clone())
        .unwrap_or_default()
}

/// Whole milliseconds of `duration`, saturating.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
