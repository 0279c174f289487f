//! Realtime push to connected clients
//!
//! - `hub`: connection registry and fan-out
//! - `handler`: authenticated WebSocket upgrade
//! - `messages`: server-to-client frames

pub mod handler;
pub mod hub;
pub mod messages;

pub use handler::{ws_router, WsState};
pub use hub::{ConnectionId, Hub, HubHandle};
pub use messages::{ErrorPayload, ServerMessage};
