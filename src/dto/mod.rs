/// Question preview payloads.
pub mod generation;
/// Health check payloads.
pub mod health;
/// Room snapshots.
pub mod room;
/// Validated configuration updates.
pub mod validation;
/// WebSocket commands and events.
pub mod ws;
