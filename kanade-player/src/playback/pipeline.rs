//! Process pipeline construction
//!
//! Spawns the external processes that make up a playback chain. Two shapes
//! exist: the player alone against a direct address (live streams and cache
//! hits), and resolver piped into player (cache misses), where the resolver
//! streams audio bytes to stdout and the player reads them from stdin
//! through an anonymous pipe.
//!
//! All children are spawned with `kill_on_drop` as a last-resort backstop;
//! orderly teardown goes through the session and monitor.

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Player command line shared by both chain shapes: audio only, no terminal
/// takeover, IPC server at the well-known socket path.
fn player_command(config: &PlayerConfig, target: &str) -> Command {
    let mut cmd = Command::new(&config.player_bin);
    cmd.arg("--no-video")
        .arg("--no-terminal")
        .arg(format!("--input-ipc-server={}", config.socket_path.display()))
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

/// Spawn the player directly against `target` (a direct address or a live
/// stream URL the player handles itself).
pub(crate) fn spawn_direct(config: &PlayerConfig, target: &str) -> Result<Child> {
    debug!(target, "spawning player (direct)");
    player_command(config, target)
        .spawn()
        .map_err(|e| Error::Spawn(format!("cannot spawn {}: {}", config.player_bin.display(), e)))
}

/// Spawn resolver and player concatenated by a byte pipe.
///
/// Returns `(resolver, player)`. If the player fails to spawn after the
/// resolver is already up, the resolver is killed before the error is
/// returned, so no half-built chain survives.
pub(crate) fn spawn_piped(config: &PlayerConfig, url: &str) -> Result<(Child, Child)> {
    debug!(url, "spawning resolver -> player pipe");

    let mut resolver = Command::new(&config.resolver_bin)
        .arg("-f")
        .arg(&config.audio_format)
        .arg("-o")
        .arg("-")
        .arg("--no-warnings")
        .arg("--no-progress")
        .arg("--no-playlist")
        .arg("--no-check-certificates")
        .arg("--socket-timeout")
        .arg(config.resolver_socket_timeout_secs.to_string())
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            Error::Spawn(format!("cannot spawn {}: {}", config.resolver_bin.display(), e))
        })?;

    let feed = resolver
        .stdout
        .take()
        .ok_or_else(|| Error::Spawn("resolver stdout was not captured".to_string()))?;
    let feed: Stdio = feed
        .try_into()
        .map_err(|e| Error::Spawn(format!("cannot wire resolver stdout: {}", e)))?;

    let mut player_cmd = player_command(config, "-");
    player_cmd.stdin(feed);

    match player_cmd.spawn() {
        Ok(player) => Ok((resolver, player)),
        Err(e) => {
            // don't leave the resolver streaming into a closed pipe
            let _ = resolver.start_kill();
            Err(Error::Spawn(format!(
                "cannot spawn {}: {}",
                config.player_bin.display(),
                e
            )))
        }
    }
}

/// Remove the control-socket file if present. A stale file from a crashed
/// run must never be mistaken for a live endpoint.
pub(crate) fn remove_socket_file(config: &PlayerConfig) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            debug!(path = %config.socket_path.display(), error = %e, "cannot remove socket file");
        }
    }
}
