//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections: the stateful
//! handshake/heartbeat/resume protocol (`handler`), per-connection state
//! and replay buffer (`session`), the live session index (`registry`),
//! the dispatch decision function (`router`), and server lifecycle plus
//! typed event payloads (`gateway`).

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod router;
pub mod session;

pub use gateway::GatewayServer;
pub use handler::ws_handler;
pub use messages::{GatewayReceive, GatewaySend, OpCode};
pub use registry::Registry;
pub use session::GatewaySession;
