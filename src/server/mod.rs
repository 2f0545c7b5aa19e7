//! WebSocket server module
//!
//! Accepts client connections and runs the greeting exchange on each one.

mod handler;
mod websocket;

pub use handler::*;
pub use websocket::*;
