//! Shared test helpers
//!
//! Stub shell scripts stand in for the player and resolver binaries so the
//! process-orchestration paths can run without mpv or yt-dlp installed.

#![allow(dead_code)]

use async_trait::async_trait;
use kanade_player::{PlayerConfig, UrlResolver};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write an executable shell script into `dir` and return its path
pub fn stub_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write stub script");
    let mut perms = std::fs::metadata(&path).expect("stat stub script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub script");
    path
}

/// A player stub that stays up until killed
pub fn long_lived_player(dir: &Path) -> PathBuf {
    stub_script(dir, "player", "exec sleep 5")
}

/// A player stub that exits on its own after ~300ms
pub fn short_lived_player(dir: &Path) -> PathBuf {
    stub_script(dir, "player-short", "exec sleep 0.3")
}

/// A resolver stub for pipe mode: writes a little data, then lingers so the
/// monitor has something to reap
pub fn long_lived_resolver(dir: &Path) -> PathBuf {
    stub_script(dir, "resolver", "echo stream-data\nexec sleep 30")
}

/// Config pointing at the stubs, with timeouts shrunk for test speed
pub fn test_config(dir: &Path, player_bin: &Path, resolver_bin: &Path) -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.player_bin = player_bin.to_path_buf();
    config.resolver_bin = resolver_bin.to_path_buf();
    config.socket_path = dir.join("control.sock");
    config.readiness_timeout_ms = 200;
    config.readiness_poll_ms = 20;
    config.startup_grace_ms = 10;
    config.monitor_poll_ms = 50;
    config.kill_wait_ms = 1_000;
    config.ipc_timeout_ms = 200;
    config
}

/// Resolver test double returning a fixed address after a fixed delay
pub struct StaticResolver {
    answer: String,
    delay: Duration,
}

impl StaticResolver {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(answer: &str, delay: Duration) -> Self {
        Self {
            answer: answer.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl UrlResolver for StaticResolver {
    async fn resolve(&self, _url: &str, _format: &str) -> kanade_player::Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.answer.clone())
    }
}

/// True while `pid` exists (including zombies); a reaped process is gone
pub fn process_exists(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
