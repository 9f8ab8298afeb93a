//! The realtime connection gateway: handshake authentication, presence,
//! message routing and fanout, backlog replay, and stats broadcast.

pub mod connection;
pub mod events;
pub mod fanout;
pub mod history;
pub mod presence;
pub mod router;
pub mod server;
pub mod stats;
