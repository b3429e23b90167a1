//! Real-time chat over WebSocket
//!
//! Customers (widget) and agents (dashboard) connect with a bearer token in
//! the query string, join per-conversation rooms and exchange messages,
//! typing indicators and presence updates.
//!
//! # Architecture
//!
//! - **Connection**: an authenticated socket and the rooms it joined
//! - **Room**: (shop, conversation) pub/sub for broadcasting events
//! - **State**: registry of live connections and rooms
//! - **Relay**: persistence plus fan-out for client events
//! - **Handler**: Axum upgrade route and frame pump
//! - **Events**: wire format for client and server frames

pub mod connection;
pub mod events;
pub mod handler;
pub mod relay;
pub mod room;
pub mod state;

pub use events::{ClientEvent, ServerEvent};
pub use handler::ws_handler;
pub use relay::ChatRelay;
pub use room::RoomKey;
pub use state::{WebSocketState, WebSocketStats};
