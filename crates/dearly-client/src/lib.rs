//! Typed client for the Dearly backend.
//!
//! Wraps every REST endpoint, drives the game wizard and type conversion
//! against the server, keeps the viewed-rewards set in sync, caches audio
//! on disk and listens on the WebSocket gateway.

pub mod api;
pub mod audio_cache;
pub mod auth_messages;
pub mod conversion;
pub mod error;
pub mod events;
pub mod refresh;
pub mod viewed;

pub use api::ApiClient;
pub use error::ClientError;
