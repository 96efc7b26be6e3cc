//! Track descriptors
//!
//! A track descriptor identifies what is (or could be) playing: upstream id,
//! display title, source locator, and a human-readable duration label. It is
//! supplied by search, related-track lookup, or the demo catalog, and the
//! playback session holds a clone of it for the lifetime of the playback.

use serde::{Deserialize, Serialize};

/// Duration label used for live or indeterminate streams
pub const DURATION_LIVE: &str = "LIVE";

/// Duration label used when the upstream reports no duration
pub const DURATION_UNKNOWN: &str = "?";

/// Caller-supplied metadata for a playable track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Upstream video/track id (e.g. the YouTube video id)
    pub id: String,
    /// Display title
    pub title: String,
    /// Source locator handed to the resolver (watch-page URL)
    pub url: String,
    /// Human duration label: `"3:05"`, `"LIVE"`, or `"?"`
    pub duration: String,
    /// Upstream tags, when the source provides them
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TrackDescriptor {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            duration: duration.into(),
            tags: Vec::new(),
        }
    }

    /// True when the duration label marks a live or indeterminate stream.
    ///
    /// Live streams are handed to the player directly; only tracks with a
    /// definite duration go through the resolver pipe.
    pub fn is_live(&self) -> bool {
        self.duration == DURATION_LIVE || self.duration == DURATION_UNKNOWN
    }
}

impl std::fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.title, self.duration)
    }
}
