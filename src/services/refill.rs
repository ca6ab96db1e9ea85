//! Background top-up of paced question pools.
//!
//! At most one refill runs per room. The room's `refilling` flag is raised before the task
//! is spawned and only cleared by the landing of a non-empty batch, or by whoever aborts
//! the task handle stored in the room.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dto::ws::RoomEvent,
    error::CommandError,
    services::{pacing, room_events},
    source::{GeneratedQuestion, GenerationRequest, SourceError},
    state::{RoomId, SharedState, room::Room, timers::TaskHandle},
};

/// Start a refill when a paced pool runs low.
pub fn evaluate(state: &SharedState, room: &mut Room) {
    if !room.is_paced() || room.refilling {
        return;
    }
    if room.remaining() <= room.config.refill_threshold {
        let count = room.config.refill_count;
        if let Err(err) = start(state, room, count) {
            debug!(room_id = %room.id, error = %err, "refill not started");
        }
    }
}

/// Spawn the retrying refill loop for `count` questions.
pub fn start(state: &SharedState, room: &mut Room, count: usize) -> Result<(), CommandError> {
    if room.refilling {
        return Err(CommandError::AlreadyRefilling);
    }
    room.refilling = true;
    let token = room.timers.next_token();
    let request = GenerationRequest::from_config(&room.config, count);
    let task = tokio::spawn(run(Arc::clone(state), room.id.clone(), request, token));
    room.refill = Some(TaskHandle::new(token, task));
    info!(room_id = %room.id, count, "refill started");
    Ok(())
}

/// Abort the running refill, if any.
pub fn cancel(room: &mut Room) -> bool {
    room.refilling = false;
    room.refill.take().is_some()
}

async fn run(state: SharedState, room_id: RoomId, request: GenerationRequest, token: u64) {
    let source = state.source();
    let backoff = state.config().refill.clone();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let failure = match source.generate(request.clone()).await {
            Ok(generated) if !generated.is_empty() => {
                land(&state, &room_id, token, generated).await;
                return;
            }
            Ok(_) => SourceError::Empty,
            Err(err) => err,
        };
        let delay = backoff.delay(attempt);
        warn!(
            room_id = %room_id,
            attempt,
            error = %failure,
            delay_ms = room_events::millis(delay),
            "refill attempt failed; retrying"
        );
        sleep(delay).await;
        if !still_owned(&state, &room_id, token).await {
            debug!(room_id = %room_id, "refill superseded; stopping");
            return;
        }
    }
}

fn owns(room: &Room, token: u64) -> bool {
    room.refilling
        && room
            .refill
            .as_ref()
            .is_some_and(|handle| handle.token() == token)
}

async fn still_owned(state: &SharedState, room_id: &RoomId, token: u64) -> bool {
    match state.rooms().get(room_id) {
        Some(handle) => owns(&*handle.lock().await, token),
        None => false,
    }
}

async fn land(state: &SharedState, room_id: &RoomId, token: u64, generated: Vec<GeneratedQuestion>) {
    let Some(handle) = state.rooms().get(room_id) else {
        return;
    };
    let mut room = handle.lock().await;
    if !owns(&room, token) {
        debug!(room_id = %room_id, "discarding refill batch of a superseded run");
        return;
    }
    if let Some(own) = room.refill.take() {
        own.detach();
    }
    room.refilling = false;

    let added = generated.len();
    room.questions
        .extend(generated.into_iter().map(GeneratedQuestion::into_question));
    info!(room_id = %room_id, added, total = room.questions.len(), "refill landed");
    room_events::emit(state, &room, &RoomEvent::RefillResult { added });
    pacing::on_pool_landed(state, &mut room);
    room_events::broadcast_state(state, &room);
}
