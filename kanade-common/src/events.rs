//! Playback lifecycle events
//!
//! The playback session broadcasts these on a `tokio::sync::broadcast`
//! channel so callers (and tests) can await lifecycle transitions instead of
//! polling or sleeping. The channel itself lives in the player crate; this
//! crate only defines the payload.

use crate::track::TrackDescriptor;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A playback chain was spawned and reported ready
    PlaybackStarted {
        /// The track the session is now playing
        track: TrackDescriptor,
        /// When playback started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The player process exited on its own (natural end of stream)
    PlaybackEnded {
        /// When the monitor observed the exit
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback was torn down by an explicit stop
    PlaybackStopped {
        /// When the stop completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    pub fn started(track: TrackDescriptor) -> Self {
        Self::PlaybackStarted {
            track,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn ended() -> Self {
        Self::PlaybackEnded {
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn stopped() -> Self {
        Self::PlaybackStopped {
            timestamp: chrono::Utc::now(),
        }
    }

    /// Event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PlaybackStarted { .. } => "PlaybackStarted",
            Self::PlaybackEnded { .. } => "PlaybackEnded",
            Self::PlaybackStopped { .. } => "PlaybackStopped",
        }
    }
}
