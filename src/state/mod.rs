/// Buzz lock arbitration.
pub mod buzz;
/// Room registry and eviction.
pub mod registry;
/// Room data model.
pub mod room;
/// Per-room timer slots.
pub mod timers;
/// Event delivery to connections.
pub mod transport;

use std::sync::Arc;

use crate::{config::AppConfig, source::QuestionSource};

pub use self::registry::{EvictionPolicy, RoomHandle, RoomRegistry};
pub use self::transport::{ConnectionHub, Transport};

/// Identifier of a WebSocket connection; doubles as participant id.
pub type ConnId = String;
/// Identifier of a room, chosen by clients.
pub type RoomId = String;

/// Handle shared by routes, sessions and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: rooms, live connections and the question source.
pub struct AppState {
    config: Arc<AppConfig>,
    rooms: RoomRegistry,
    hub: Arc<ConnectionHub>,
    transport: Arc<dyn Transport>,
    source: Arc<dyn QuestionSource>,
}

impl AppState {
    /// Construct a new [`AppState`] delivering events through its own [`ConnectionHub`].
    pub fn new(config: AppConfig, source: Arc<dyn QuestionSource>) -> SharedState {
        let hub = Arc::new(ConnectionHub::new());
        let transport: Arc<dyn Transport> = hub.clone();
        Self::build(config, source, hub, transport)
    }

    /// Construct a new [`AppState`] delivering events through `transport`.
    pub fn with_transport(
        config: AppConfig,
        source: Arc<dyn QuestionSource>,
        transport: Arc<dyn Transport>,
    ) -> SharedState {
        Self::build(config, source, Arc::new(ConnectionHub::new()), transport)
    }

    fn build(
        config: AppConfig,
        source: Arc<dyn QuestionSource>,
        hub: Arc<ConnectionHub>,
        transport: Arc<dyn Transport>,
    ) -> SharedState {
        let policy = config
            .rooms
            .idle_eviction
            .map_or(EvictionPolicy::Never, EvictionPolicy::IdleFor);
        Arc::new(Self {
            rooms: RoomRegistry::new(config.pacing.clone(), policy),
            config: Arc::new(config),
            hub,
            transport,
            source,
        })
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Every room known to the process.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// WebSocket writers, registered by the socket handler.
    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Event delivery used by room sessions.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// External question generator.
    pub fn source(&self) -> Arc<dyn QuestionSource> {
        Arc::clone(&self.source)
    }

    /// Degraded when the question source cannot produce anything.
    pub fn is_degraded(&self) -> bool {
        !self.source.is_available()
    }
}
