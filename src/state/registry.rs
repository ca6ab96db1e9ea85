//! Process-wide map of rooms.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::state::{
    RoomId,
    room::{PacingConfig, Room},
};

/// Shared handle to a single room.
pub type RoomHandle = Arc<Mutex<Room>>;

/// When rooms are dropped from the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Rooms live until the process exits.
    #[default]
    Never,
    /// Rooms nobody is connected to are dropped after this much inactivity.
    IdleFor(Duration),
}

/// Creates and looks up rooms by identifier.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
    defaults: PacingConfig,
    policy: EvictionPolicy,
}

impl RoomRegistry {
    /// Empty registry; new rooms start with `defaults`.
    pub fn new(defaults: PacingConfig, policy: EvictionPolicy) -> Self {
        Self {
            rooms: DashMap::new(),
            defaults,
            policy,
        }
    }

    /// Look up an existing room.
    pub fn get(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a room, creating it on first use.
    pub fn get_or_create(&self, id: &str) -> RoomHandle {
        if let Some(room) = self.get(id) {
            return room;
        }
        let entry = self.rooms.entry(id.to_owned()).or_insert_with(|| {
            info!(room_id = %id, "creating room");
            Arc::new(Mutex::new(Room::new(id.to_owned(), self.defaults.clone())))
        });
        Arc::clone(entry.value())
    }

    /// Number of rooms currently registered.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room exists.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Eviction policy in force.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Drop a room and abort everything it scheduled.
    pub async fn remove(&self, id: &str) -> bool {
        let Some((_, room)) = self.rooms.remove(id) else {
            return false;
        };
        room.lock().await.teardown();
        info!(room_id = %id, "room removed");
        true
    }

    /// Apply the eviction policy once, returning the evicted room ids.
    pub async fn sweep(&self) -> Vec<RoomId> {
        let EvictionPolicy::IdleFor(limit) = self.policy else {
            return Vec::new();
        };
        let candidates: Vec<(RoomId, RoomHandle)> = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut evicted = Vec::new();
        for (id, handle) in candidates {
            let mut room = handle.lock().await;
            if !room.is_idle() || room.last_activity.elapsed() < limit {
                continue;
            }
            // Only evict the exact room we inspected; a concurrent re-creation stays.
            if self
                .rooms
                .remove_if(&id, |_, current| Arc::ptr_eq(current, &handle))
                .is_some()
            {
                room.teardown();
                info!(room_id = %id, "evicted idle room");
                evicted.push(id);
            }
        }
        evicted
    }
}
