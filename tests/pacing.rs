mod common;

use common::{Client, ROOM, Script, ScriptedSource, advance, app, question, settle};
use hayaoshi_back::{
    dto::{
        validation::PacingConfigUpdate,
        ws::{Role, RoomEvent},
    },
    state::{
        SharedState,
        room::{Mode, Room},
    },
};

async fn inspect<T>(state: &SharedState, read: impl FnOnce(&Room) -> T) -> T {
    let handle = state.rooms().get(ROOM).expect("room exists");
    let room = handle.lock().await;
    read(&room)
}

fn timing(interval_ms: u64, reveal_ms: u64) -> PacingConfigUpdate {
    PacingConfigUpdate {
        interval_ms: Some(interval_ms),
        reveal_ms: Some(reveal_ms),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn auto_mode_sends_one_question_per_tick_then_finishes() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    host.join(&state, "host", Role::Host).await;
    host.configure(&state, timing(1_000, 3_000)).await;
    host.set_questions(&state, vec![question("A", "あ"), question("B", "い")])
        .await;
    host.set_mode(&state, Mode::Auto).await;
    transport.clear();

    host.start(&state).await;
    advance(999).await;
    assert!(transport.question_indices().is_empty());

    advance(2).await;
    assert_eq!(transport.question_indices(), vec![0]);
    assert_eq!(inspect(&state, |room| room.current_index).await, 1);

    advance(1_000).await;
    assert_eq!(transport.question_indices(), vec![0, 1]);
    assert_eq!(inspect(&state, |room| room.current_index).await, 2);
    assert_eq!(transport.count("round-finished"), 0);

    advance(1_000).await;
    assert_eq!(transport.count("round-finished"), 1);

    advance(10_000).await;
    assert_eq!(transport.question_indices(), vec![0, 1]);
    assert_eq!(transport.count("round-finished"), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_questions_carry_the_pacing_budget() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    host.join(&state, "host", Role::Host).await;
    host.configure(&state, timing(1_000, 3_000)).await;
    host.set_questions(&state, vec![question("A", "すいか")]).await;
    host.set_mode(&state, Mode::Auto).await;
    host.start(&state).await;
    advance(1_001).await;

    let first = transport
        .room_events()
        .into_iter()
        .find(|event| matches!(event, RoomEvent::Question { .. }))
        .expect("question sent");
    assert_eq!(
        first,
        RoomEvent::Question {
            index: 0,
            text: "A".into(),
            answer_length: 3,
            time_allowed_ms: Some(1_000),
            sources: Vec::new(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_buzz_restarts_the_auto_tick_at_full_length() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.configure(&state, timing(1_000, 3_000)).await;
    host.set_questions(
        &state,
        vec![question("A", "あ"), question("B", "い"), question("C", "う")],
    )
    .await;
    host.set_mode(&state, Mode::Auto).await;
    host.start(&state).await;

    advance(1_001).await;
    alice.buzz(&state).await;
    advance(500).await;
    assert_eq!(transport.question_indices(), vec![0]);

    alice.cancel_buzz(&state).await;
    assert_eq!(transport.question_indices(), vec![0, 0]);

    advance(999).await;
    assert_eq!(transport.question_indices(), vec![0, 0]);
    advance(2).await;
    assert_eq!(transport.question_indices(), vec![0, 0, 1]);
}

#[tokio::test(start_paused = true)]
async fn paced_start_without_players_pauses_until_someone_joins() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    host.join(&state, "host", Role::Host).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    host.set_questions(
        &state,
        vec![question("A", "あ"), question("B", "い"), question("C", "う")],
    )
    .await;
    transport.clear();

    host.start(&state).await;
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::Paused { reason: "no-players" })
    );
    advance(30_000).await;
    assert!(transport.question_indices().is_empty());

    let mut alice = Client::new("alice");
    alice.join(&state, "alice", Role::Player).await;
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::Resumed { reason: "player-joined" })
    );
    assert_eq!(transport.question_indices(), vec![0]);
    assert!(inspect(&state, |room| room.paced_cycle_live() && !room.paused).await);

    let mut bob = Client::new("bob");
    bob.join(&state, "bob", Role::Player).await;
    assert_eq!(transport.question_indices(), vec![0]);
    assert_eq!(transport.count("resumed"), 1);
}

#[tokio::test(start_paused = true)]
async fn paced_cycle_reveals_then_advances_and_tops_up_the_pool() {
    let source = ScriptedSource::new(Script::Succeed(3));
    let (state, transport) = app(source.clone());
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.configure(&state, timing(1_000, 500)).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    host.set_questions(&state, vec![question("A", "あ"), question("B", "い")])
        .await;
    transport.clear();

    host.start(&state).await;
    settle().await;
    assert_eq!(transport.question_indices(), vec![0]);
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::RefillResult { added: 3 })
    );
    assert_eq!(source.calls(), 1);

    advance(1_001).await;
    assert!(transport.room_events().contains(&RoomEvent::RevealAnswer {
        index: 0,
        answer: "あ".into(),
    }));
    assert!(inspect(&state, |room| room.answer_locked).await);

    alice.submit(&state, 0, "あ").await;
    assert!(transport.sent_to("alice").contains(&RoomEvent::AnswerResult {
        index: Some(0),
        ok: false,
        error: Some("locked"),
    }));

    advance(500).await;
    assert_eq!(transport.question_indices(), vec![0, 1]);
    assert_eq!(inspect(&state, |room| room.questions.len()).await, 5);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn last_player_leaving_pauses_and_a_new_player_resumes_the_same_question() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.configure(&state, timing(1_000, 500)).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    host.set_questions(
        &state,
        vec![
            question("A", "あ"),
            question("B", "い"),
            question("C", "う"),
            question("D", "え"),
        ],
    )
    .await;
    host.start(&state).await;
    assert_eq!(transport.question_indices(), vec![0]);

    alice.disconnect(&state).await;
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::Paused { reason: "no-players" })
    );
    assert!(!inspect(&state, Room::paced_cycle_live).await);

    advance(5_000).await;
    assert_eq!(transport.question_indices(), vec![0]);

    let mut carol = Client::new("carol");
    carol.join(&state, "carol", Role::Player).await;
    assert_eq!(transport.question_indices(), vec![0, 0]);
    advance(1_001).await;
    assert_eq!(transport.count("reveal-answer"), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_paced_pool_is_generated_before_the_first_question() {
    let source = ScriptedSource::new(Script::Succeed(2));
    let (state, transport) = app(source.clone());
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    transport.clear();

    host.start(&state).await;
    assert_eq!(source.calls(), 1);
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::RefillResult { added: 2 })
    );
    assert_eq!(transport.question_indices(), vec![0]);
    assert!(!inspect(&state, |room| room.refilling).await);
}

#[tokio::test(start_paused = true)]
async fn failed_initial_generation_is_reported_once() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    transport.clear();

    host.start(&state).await;
    assert_eq!(transport.count("refill-error"), 1);
    assert!(transport.question_indices().is_empty());
    assert!(!inspect(&state, |room| room.refilling).await);
}

#[tokio::test(start_paused = true)]
async fn mode_change_cancels_running_timers() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    host.join(&state, "host", Role::Host).await;
    host.configure(&state, timing(1_000, 3_000)).await;
    host.set_questions(&state, vec![question("A", "あ"), question("B", "い")])
        .await;
    host.set_mode(&state, Mode::Auto).await;
    host.start(&state).await;

    advance(500).await;
    host.set_mode(&state, Mode::Manual).await;
    assert!(
        transport
            .room_events()
            .contains(&RoomEvent::ModeChanged { mode: Mode::Manual })
    );
    advance(5_000).await;
    assert!(transport.question_indices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn auto_tick_survives_the_only_responder_disconnecting() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.configure(&state, timing(1_000, 3_000)).await;
    host.set_questions(
        &state,
        vec![
            question("A", "あ"),
            question("B", "い"),
            question("C", "う"),
            question("D", "え"),
        ],
    )
    .await;
    host.set_mode(&state, Mode::Auto).await;
    host.start(&state).await;

    advance(1_001).await;
    alice.buzz(&state).await;
    alice.disconnect(&state).await;
    assert!(transport.room_events().contains(&RoomEvent::BuzzCancelled {
        participant_id: "alice".into(),
        name: "alice".into(),
        reason: "disconnect",
    }));

    let mut bob = Client::new("bob");
    bob.join(&state, "bob", Role::Player).await;
    advance(10_000).await;

    assert_eq!(transport.question_indices(), vec![0, 0, 1, 2, 3]);
    assert_eq!(transport.count("round-finished"), 1);
}

#[tokio::test(start_paused = true)]
async fn resolved_buzz_rearms_the_paced_question_timer_at_full_interval() {
    let (state, transport) = app(ScriptedSource::new(Script::Fail));
    let mut host = Client::new("host");
    let mut alice = Client::new("alice");
    host.join(&state, "host", Role::Host).await;
    alice.join(&state, "alice", Role::Player).await;
    host.configure(&state, timing(1_000, 500)).await;
    host.set_mode(&state, Mode::PacedGenerated).await;
    host.set_questions(
        &state,
        vec![
            question("A", "あ"),
            question("B", "い"),
            question("C", "う"),
            question("D", "え"),
        ],
    )
    .await;
    host.start(&state).await;
    assert_eq!(transport.question_indices(), vec![0]);

    advance(400).await;
    alice.buzz(&state).await;
    alice.submit(&state, 0, "あ").await;
    assert!(transport.room_events().contains(&RoomEvent::RevealAnswer {
        index: 0,
        answer: "あ".into(),
    }));

    advance(500).await;
    assert_eq!(transport.question_indices(), vec![0, 1]);
    assert_eq!(transport.count("reveal-answer"), 1);

    advance(999).await;
    assert_eq!(transport.count("reveal-answer"), 1);
    advance(2).await;
    assert!(transport.room_events().contains(&RoomEvent::RevealAnswer {
        index: 1,
        answer: "い".into(),
    }));
}
