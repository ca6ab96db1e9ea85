//! Shared fixtures: a transport that records every delivery and a scripted question source.

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use hayaoshi_back::{
    config::AppConfig,
    dto::{
        validation::PacingConfigUpdate,
        ws::{ClientCommand, QuestionInput, Role, RoomEvent},
    },
    services::dispatch::{self, Session},
    source::{GeneratedQuestion, GenerationRequest, QuestionSource, SourceError, SourceResult},
    state::{AppState, ConnId, RoomId, SharedState, Transport, room::Mode},
};

pub const ROOM: &str = "room-1";

/// Where an event was sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Room(RoomId),
    RoomExcept(RoomId, ConnId),
    Connection(ConnId),
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: Target,
    pub event: RoomEvent,
}

/// Transport recording deliveries instead of writing to sockets.
#[derive(Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingTransport {
    fn record(&self, target: Target, event: &RoomEvent) {
        self.deliveries.lock().unwrap().push(Delivery {
            target,
            event: event.clone(),
        });
    }

    pub fn clear(&self) {
        self.deliveries.lock().unwrap().clear();
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Events broadcast to the whole room, snapshots excluded.
    pub fn room_events(&self) -> Vec<RoomEvent> {
        self.deliveries()
            .into_iter()
            .filter(|delivery| matches!(delivery.target, Target::Room(_)))
            .map(|delivery| delivery.event)
            .filter(|event| !matches!(event, RoomEvent::RoomState(_)))
            .collect()
    }

    /// Events sent to `conn` alone.
    pub fn sent_to(&self, conn: &str) -> Vec<RoomEvent> {
        self.deliveries()
            .into_iter()
            .filter(|delivery| matches!(&delivery.target, Target::Connection(id) if id == conn))
            .map(|delivery| delivery.event)
            .collect()
    }

    /// Indices of every `question` broadcast, in order.
    pub fn question_indices(&self) -> Vec<usize> {
        self.room_events()
            .into_iter()
            .filter_map(|event| match event {
                RoomEvent::Question { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Room-wide event names, snapshots excluded.
    pub fn names(&self) -> Vec<&'static str> {
        self.room_events().iter().map(RoomEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }
}

impl Transport for RecordingTransport {
    fn join_room(&self, _conn: &ConnId, _room: &RoomId) {}

    fn leave_room(&self, _conn: &ConnId, _room: &RoomId) {}

    fn emit_to_room(&self, room: &RoomId, event: &RoomEvent) {
        self.record(Target::Room(room.clone()), event);
    }

    fn emit_to_room_except(&self, room: &RoomId, sender: &ConnId, event: &RoomEvent) {
        self.record(Target::RoomExcept(room.clone(), sender.clone()), event);
    }

    fn emit_to_connection(&self, conn: &ConnId, event: &RoomEvent) {
        self.record(Target::Connection(conn.clone()), event);
    }
}

/// How the scripted source answers.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Return this many questions immediately.
    Succeed(usize),
    /// Fail every call.
    Fail,
    /// Never complete.
    Hang,
}

/// Question source following a [`Script`] and counting its calls.
pub struct ScriptedSource {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuestionSource for ScriptedSource {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, SourceResult<Vec<GeneratedQuestion>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Succeed(count) => {
                let questions: Vec<GeneratedQuestion> = (0..count)
                    .map(|i| GeneratedQuestion {
                        text: format!("{} #{call}-{i}", request.topic),
                        answer: "こたえ".into(),
                        sources: Vec::new(),
                    })
                    .collect();
                Box::pin(async move { Ok(questions) })
            }
            Script::Fail => Box::pin(async { Err(SourceError::Request("offline".into())) }),
            Script::Hang => Box::pin(futures::future::pending()),
        }
    }
}

/// Application state wired to a recording transport.
pub fn app(source: Arc<ScriptedSource>) -> (SharedState, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let state = AppState::with_transport(AppConfig::default(), source, transport.clone());
    (state, transport)
}

pub fn question(text: &str, answer: &str) -> QuestionInput {
    QuestionInput {
        id: None,
        text: text.into(),
        answer: answer.into(),
        sources: Vec::new(),
    }
}

/// A connected client.
pub struct Client {
    pub session: Session,
}

impl Client {
    pub fn new(conn: &str) -> Self {
        Self {
            session: Session::new(conn.into()),
        }
    }

    pub fn id(&self) -> ConnId {
        self.session.conn().clone()
    }

    pub async fn send(&mut self, state: &SharedState, command: ClientCommand) {
        dispatch::handle_command(state, &mut self.session, command).await;
    }

    pub async fn join(&mut self, state: &SharedState, name: &str, role: Role) {
        self.send(
            state,
            ClientCommand::Join {
                room_id: ROOM.into(),
                name: Some(name.into()),
                role,
            },
        )
        .await;
    }

    pub async fn disconnect(&mut self, state: &SharedState) {
        dispatch::disconnect(state, &mut self.session).await;
    }

    pub async fn set_mode(&mut self, state: &SharedState, mode: Mode) {
        self.send(
            state,
            ClientCommand::SetMode {
                room_id: ROOM.into(),
                mode,
            },
        )
        .await;
    }

    pub async fn set_questions(&mut self, state: &SharedState, questions: Vec<QuestionInput>) {
        self.send(
            state,
            ClientCommand::SetQuestions {
                room_id: ROOM.into(),
                questions,
            },
        )
        .await;
    }

    pub async fn configure(&mut self, state: &SharedState, config: PacingConfigUpdate) {
        self.send(
            state,
            ClientCommand::SetPacingConfig {
                room_id: ROOM.into(),
                config,
            },
        )
        .await;
    }

    pub async fn start(&mut self, state: &SharedState) {
        self.send(
            state,
            ClientCommand::StartGame {
                room_id: ROOM.into(),
            },
        )
        .await;
    }

    pub async fn next_question(&mut self, state: &SharedState, index: usize) {
        self.send(
            state,
            ClientCommand::NextQuestion {
                room_id: ROOM.into(),
                index: Some(index),
            },
        )
        .await;
    }

    pub async fn reveal_answer(&mut self, state: &SharedState) {
        self.send(
            state,
            ClientCommand::RevealAnswer {
                room_id: ROOM.into(),
            },
        )
        .await;
    }

    pub async fn buzz(&mut self, state: &SharedState) {
        self.send(
            state,
            ClientCommand::Buzz {
                room_id: ROOM.into(),
            },
        )
        .await;
    }

    pub async fn cancel_buzz(&mut self, state: &SharedState) {
        self.send(
            state,
            ClientCommand::CancelBuzz {
                room_id: ROOM.into(),
            },
        )
        .await;
    }

    pub async fn submit(&mut self, state: &SharedState, index: usize, answer: &str) {
        self.send(
            state,
            ClientCommand::SubmitAnswer {
                room_id: ROOM.into(),
                index,
                answer: answer.into(),
            },
        )
        .await;
    }

    pub async fn force_refill(&mut self, state: &SharedState) {
        self.send(
            state,
            ClientCommand::ForceRefill {
                room_id: ROOM.into(),
            },
        )
        .await;
    }
}

/// Let spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward, running every timer that falls due.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}
