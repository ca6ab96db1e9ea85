//! Exclusively owned task handles for the scheduled callbacks of a room.
//!
//! Every handle carries the token it was scheduled with. A callback that wakes
//! up must claim its slot with that token before touching the room; anything
//! that cancels or replaces a slot drops the old handle, which aborts the task.

use tokio::task::JoinHandle;

/// The scheduled callbacks a room can own at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Paced-generated question timeout (reveal when it fires).
    Question,
    /// Delay between revealing an answer and advancing the round.
    Reveal,
    /// Repeating auto-mode tick.
    Tick,
    /// Answer window granted to the current responder.
    Answer,
}

/// Handle to a spawned task that is aborted when dropped.
#[derive(Debug)]
pub struct TaskHandle {
    token: u64,
    task: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Wrap a spawned task scheduled with `token`.
    pub fn new(token: u64, task: JoinHandle<()>) -> Self {
        Self {
            token,
            task: Some(task),
        }
    }

    /// Token the task was scheduled with.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Let go of the task without aborting it. Used by a task that releases its own slot.
    pub fn detach(mut self) {
        self.task.take();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Timer slots of a single room.
#[derive(Debug, Default)]
pub struct RoomTimers {
    next_token: u64,
    question: Option<TaskHandle>,
    reveal: Option<TaskHandle>,
    tick: Option<TaskHandle>,
    answer: Option<TaskHandle>,
}

impl RoomTimers {
    /// Allocate a fresh token, never reused within the room.
    pub fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Store a freshly spawned task, aborting whatever previously occupied the slot.
    pub fn install(&mut self, kind: TimerKind, handle: TaskHandle) {
        *self.slot_mut(kind) = Some(handle);
    }

    /// Abort the task in `kind`, returning whether one was live.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slot_mut(kind).take().is_some()
    }

    /// Abort every scheduled callback.
    pub fn cancel_all(&mut self) {
        for kind in [
            TimerKind::Question,
            TimerKind::Reveal,
            TimerKind::Tick,
            TimerKind::Answer,
        ] {
            self.cancel(kind);
        }
    }

    /// Whether a task is currently scheduled in `kind`.
    pub fn is_live(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Whether `kind` still holds the task scheduled with `token`.
    pub fn holds(&self, kind: TimerKind, token: u64) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|handle| handle.token() == token)
    }

    /// Called by a firing one-shot task: empties the slot without aborting the caller.
    ///
    /// Returns `false` when the slot was cancelled or re-armed in the meantime, in
    /// which case the callback must be discarded.
    pub fn claim(&mut self, kind: TimerKind, token: u64) -> bool {
        if !self.holds(kind, token) {
            return false;
        }
        if let Some(handle) = self.slot_mut(kind).take() {
            handle.detach();
        }
        true
    }

    fn slot(&self, kind: TimerKind) -> &Option<TaskHandle> {
        match kind {
            TimerKind::Question => &self.question,
            TimerKind::Reveal => &self.reveal,
            TimerKind::Tick => &self.tick,
            TimerKind::Answer => &self.answer,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TaskHandle> {
        match kind {
            TimerKind::Question => &mut self.question,
            TimerKind::Reveal => &mut self.reveal,
            TimerKind::Tick => &mut self.tick,
            TimerKind::Answer => &mut self.answer,
        }
    }
}
