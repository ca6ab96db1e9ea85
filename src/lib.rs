//! Library crate for hayaoshi-back, exposing modules for the binary and integration tests.

/// Application configuration.
pub mod config;
/// Wire payloads.
pub mod dto;
/// Command, service and HTTP errors.
pub mod error;
/// Answer normalization and comparison.
pub mod matcher;
/// HTTP and WebSocket routes.
pub mod routes;
/// Room operations and request handlers.
pub mod services;
/// Question generation backends.
pub mod source;
/// Shared state, rooms and the transport.
pub mod state;
