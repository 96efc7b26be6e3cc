//! # Kanade Common (kanade-common)
//!
//! Shared types for the Kanade playback orchestrator.
//!
//! **Purpose:** Track descriptors, duration-label handling, and playback
//! lifecycle events consumed by the player crate and its callers. This crate
//! holds plain data only: no I/O, no process handling.

pub mod duration;
pub mod events;
pub mod track;

pub use duration::format_duration;
pub use events::PlayerEvent;
pub use track::TrackDescriptor;
