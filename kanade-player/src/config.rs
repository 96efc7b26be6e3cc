//! kanade-player configuration
//!
//! All knobs for the playback chain live here: binary names for the two
//! external processes, the well-known control-socket path, the audio format
//! preference handed to the resolver, and the timeout/poll bounds used by
//! the cache, the readiness wait, and process teardown.
//!
//! Values resolve in priority order: explicit config file path (CLI or
//! `KANADE_CONFIG`), then the user config file at
//! `<config_dir>/kanade/config.toml`, then compiled defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default audio format preference: opus webm, then m4a, then whatever the
/// resolver considers best. The first two are direct (non-HLS) formats.
pub const DEFAULT_AUDIO_FORMAT: &str = "251/140/bestaudio";

/// Player configuration
///
/// Every field has a compiled default, so a partial (or absent) config file
/// is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player binary (mpv or compatible: must speak the JSON IPC protocol)
    pub player_bin: PathBuf,
    /// Resolver binary (yt-dlp or compatible)
    pub resolver_bin: PathBuf,
    /// Well-known control-socket path, reused across sessions
    pub socket_path: PathBuf,
    /// Preference-ordered audio format list passed to the resolver
    pub audio_format: String,

    /// Resolved-URL cache TTL in seconds.
    ///
    /// Upstream direct URLs stay valid for hours; 300s is a deliberate
    /// under-estimate so a cached address is never handed out near its real
    /// expiry. There is no server-side invalidation signal, so an address
    /// can still die mid-playback; known limitation.
    pub cache_ttl_secs: u64,

    /// Hard bound on a single address-only resolution
    pub resolve_timeout_secs: u64,
    /// `--socket-timeout` value passed to the resolver
    pub resolver_socket_timeout_secs: u64,
    /// Hard bound on a search/related-tracks invocation
    pub search_timeout_secs: u64,

    /// Bound on the wait for the player to report readiness
    pub readiness_timeout_ms: u64,
    /// Poll interval during the readiness wait
    pub readiness_poll_ms: u64,
    /// Grace delay applied when readiness never shows up
    pub startup_grace_ms: u64,

    /// Monitor poll interval for player-exit detection
    pub monitor_poll_ms: u64,
    /// Bound on waiting for a terminated child to exit
    pub kill_wait_ms: u64,
    /// Bound on a single control-socket round trip
    pub ipc_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_bin: PathBuf::from("mpv"),
            resolver_bin: PathBuf::from("yt-dlp"),
            socket_path: std::env::temp_dir().join("kanade-mpv.sock"),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            cache_ttl_secs: 300,
            resolve_timeout_secs: 10,
            resolver_socket_timeout_secs: 5,
            search_timeout_secs: 30,
            readiness_timeout_ms: 10_000,
            readiness_poll_ms: 100,
            startup_grace_ms: 500,
            monitor_poll_ms: 200,
            kill_wait_ms: 2_000,
            ipc_timeout_ms: 1_000,
        }
    }
}

impl PlayerConfig {
    /// Load configuration.
    ///
    /// An explicitly given path must exist and parse; the default user
    /// config file is optional and silently skipped when absent.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// `<config_dir>/kanade/config.toml`, when the platform has a config dir
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kanade").join("config.toml"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn monitor_poll(&self) -> Duration {
        Duration::from_millis(self.monitor_poll_ms)
    }

    pub fn kill_wait(&self) -> Duration {
        Duration::from_millis(self.kill_wait_ms)
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_millis(self.ipc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PlayerConfig::default();
        assert_eq!(config.player_bin, PathBuf::from("mpv"));
        assert_eq!(config.resolver_bin, PathBuf::from("yt-dlp"));
        assert_eq!(config.audio_format, "251/140/bestaudio");
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: PlayerConfig = toml::from_str(
            r#"
            player_bin = "/usr/local/bin/mpv"
            cache_ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.player_bin, PathBuf::from("/usr/local/bin/mpv"));
        assert_eq!(config.cache_ttl_secs, 60);
        // untouched fields keep their defaults
        assert_eq!(config.resolver_bin, PathBuf::from("yt-dlp"));
        assert_eq!(config.readiness_timeout_ms, 10_000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = PlayerConfig::load(Some(Path::new("/nonexistent/kanade.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
