//! Playback chain orchestration
//!
//! The session owns two external processes (resolver and player), wires
//! them together, supervises them with a background monitor, and exposes
//! transport controls over the player's IPC socket.

pub mod ipc;
mod monitor;
mod pipeline;
mod session;

pub use ipc::{ControlSocket, IpcError};
pub use session::{PlayerSession, SessionPhase};
