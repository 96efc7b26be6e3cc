//! # Kanade Player Library (kanade-player)
//!
//! Playback orchestration over two external processes: a media resolver
//! (yt-dlp) and a player (mpv), chained by an anonymous byte pipe and
//! controlled through the player's JSON IPC socket.
//!
//! **Architecture:** a single [`PlayerSession`] supervises the process
//! chain; a [`UrlCache`] keeps resolved direct addresses for a bounded time
//! so repeat plays skip the resolver entirely. Search and the demo catalog
//! are thin collaborators that produce track descriptors.

pub mod cache;
pub mod config;
pub mod demo;
pub mod error;
pub mod playback;
pub mod resolver;
pub mod search;

pub use cache::{CacheStats, UrlCache};
pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use playback::{ControlSocket, IpcError, PlayerSession, SessionPhase};
pub use resolver::{UrlResolver, YtDlpResolver};
