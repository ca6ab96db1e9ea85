//! Routing of inbound client commands to room operations.
//!
//! Every command runs as one turn under its room's lock. Caller-input errors are answered
//! to the originating connection only, in the shape that command's client expects.

use tracing::{debug, warn};

use crate::{
    dto::ws::{ClientCommand, RoomEvent},
    error::CommandError,
    services::{buzz_service, pacing, room_events, room_service},
    state::{ConnId, RoomHandle, RoomId, SharedState, room::Room},
};

/// Per-connection context: who is talking and which room they joined.
#[derive(Debug, Clone)]
pub struct Session {
    conn: ConnId,
    room: Option<RoomId>,
}

impl Session {
    /// Session of a fresh connection, in no room yet.
    pub fn new(conn: ConnId) -> Self {
        Self { conn, room: None }
    }

    /// Connection id.
    pub fn conn(&self) -> &ConnId {
        &self.conn
    }

    /// Room joined last, if any.
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }
}

/// How a rejected command is reported back.
enum Denial {
    Buzz,
    Answer(usize),
    Error,
}

/// Execute `command` on behalf of `session`.
pub async fn handle_command(state: &SharedState, session: &mut Session, command: ClientCommand) {
    let name = command.name();
    let denial = match &command {
        ClientCommand::Buzz { .. } => Denial::Buzz,
        ClientCommand::SubmitAnswer { index, .. } => Denial::Answer(*index),
        _ => Denial::Error,
    };
    let Err(err) = execute(state, session, command).await else {
        return;
    };
    debug!(conn_id = %session.conn, command = name, code = err.code(), "command rejected");
    let event = match denial {
        Denial::Buzz => RoomEvent::BuzzDenied { reason: err.code() },
        Denial::Answer(index) => RoomEvent::AnswerResult {
            index: Some(index),
            ok: false,
            error: Some(err.code()),
        },
        Denial::Error => RoomEvent::Error { reason: err.code() },
    };
    room_events::reply(state, &session.conn, &event);
}

/// Run the disconnect handling of a closed connection.
pub async fn disconnect(state: &SharedState, session: &mut Session) {
    if let Some(room_id) = session.room.take() {
        room_service::leave(state, &session.conn, &room_id).await;
    }
}

async fn execute(
    state: &SharedState,
    session: &mut Session,
    command: ClientCommand,
) -> Result<(), CommandError> {
    match command {
        ClientCommand::Join {
            room_id,
            name,
            role,
        } => {
            if let Some(previous) = session.room.take().filter(|previous| *previous != room_id) {
                room_service::leave(state, &session.conn, &previous).await;
            }
            room_service::join(state, &session.conn, &room_id, name, role).await;
            session.room = Some(room_id);
            Ok(())
        }
        ClientCommand::StartGame { room_id } => {
            let handle = lookup(state, &room_id)?;
            pacing::start_game(state, &handle).await;
            Ok(())
        }
        ClientCommand::Unknown => {
            warn!(conn_id = %session.conn, "ignoring unknown command");
            Ok(())
        }
        command => {
            let Some(room_id) = command.room_id() else {
                return Ok(());
            };
            let handle = lookup(state, room_id)?;
            let mut room = handle.lock().await;
            room.touch();
            let quiet = matches!(command, ClientCommand::TypingUpdate { .. });
            apply(state, &mut room, &session.conn, command)?;
            if !quiet {
                room_events::broadcast_state(state, &room);
            }
            Ok(())
        }
    }
}

fn lookup(state: &SharedState, room_id: &str) -> Result<RoomHandle, CommandError> {
    state.rooms().get(room_id).ok_or(CommandError::UnknownRoom)
}

fn apply(
    state: &SharedState,
    room: &mut Room,
    conn: &ConnId,
    command: ClientCommand,
) -> Result<(), CommandError> {
    match command {
        ClientCommand::SetMode { mode, .. } => {
            pacing::set_mode(state, room, mode);
            Ok(())
        }
        ClientCommand::RestartGame { config, .. } => {
            room_service::restart(state, room, conn, config)
        }
        ClientCommand::SetQuestions { questions, .. } => {
            room_service::set_questions(state, room, questions)
        }
        ClientCommand::SetPacingConfig { config, .. } => {
            room_service::set_pacing_config(room, config)
        }
        ClientCommand::NextQuestion { index, .. } => {
            room_service::next_question(state, room, index)
        }
        ClientCommand::RevealAnswer { .. } => room_service::reveal_answer(state, room),
        ClientCommand::Buzz { .. } => buzz_service::buzz(state, room, conn),
        ClientCommand::CancelBuzz { .. } => buzz_service::cancel(state, room, conn),
        ClientCommand::SubmitAnswer { index, answer, .. } => {
            buzz_service::submit_answer(state, room, conn, index, &answer)
        }
        ClientCommand::TypingUpdate { index, partial, .. } => {
            room_service::typing(state, room, conn, index, partial);
            Ok(())
        }
        ClientCommand::ForceRefill { .. } => room_service::force_refill(state, room, conn),
        ClientCommand::GenerateQuestions { count, config, .. } => {
            room_service::generate_questions(state, room, conn, count, config)
        }
        ClientCommand::Join { .. } | ClientCommand::StartGame { .. } | ClientCommand::Unknown => {
            Ok(())
        }
    }
}
