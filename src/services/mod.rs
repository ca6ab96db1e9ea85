/// Answer locking, submission scoring and answer windows.
pub mod buzz_service;
/// Routing of inbound client commands to room operations.
pub mod dispatch;
/// OpenAPI documentation generation.
pub mod documentation;
/// Out-of-room question generation.
pub mod generation_service;
/// Health check service.
pub mod health_service;
/// Timer choreography of the auto and paced modes.
pub mod pacing;
/// Read-only room information for REST clients.
pub mod public_service;
/// Background top-up of paced question pools.
pub mod refill;
/// Room event helpers shared by every operation.
pub mod room_events;
/// Membership, pool and configuration commands.
pub mod room_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
