// WebSocket endpoint: one client at a time, attached through a connection slot.

pub mod error;
pub mod server;
pub mod slot;
