//! External URL resolver
//!
//! Shells out to yt-dlp in address-only mode (`-g`) to turn a watch-page URL
//! into a direct playable address. The trait seam exists so the cache can be
//! driven by a scripted resolver in tests; production wiring always uses
//! [`YtDlpResolver`].

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Resolves a source locator to a direct playable address
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolve `url` using the given preference-ordered format list.
    ///
    /// Errors cover non-zero exit, empty output, and timeout; callers treat
    /// all of them as "not resolved" rather than failures worth surfacing.
    async fn resolve(&self, url: &str, format: &str) -> Result<String>;
}

/// Address-only resolution via the yt-dlp binary
pub struct YtDlpResolver {
    bin: PathBuf,
    socket_timeout: Duration,
    resolve_timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            bin: config.resolver_bin.clone(),
            socket_timeout: Duration::from_secs(config.resolver_socket_timeout_secs),
            resolve_timeout: config.resolve_timeout(),
        }
    }
}

#[async_trait]
impl UrlResolver for YtDlpResolver {
    async fn resolve(&self, url: &str, format: &str) -> Result<String> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-f")
            .arg(format)
            .arg("-g")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--no-check-certificates")
            .arg("--socket-timeout")
            .arg(self.socket_timeout.as_secs().to_string())
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.resolve_timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::Resolve(format!(
                    "resolver timed out after {}s for {}",
                    self.resolve_timeout.as_secs(),
                    url
                ))
            })?
            .map_err(|e| Error::Resolve(format!("cannot run {}: {}", self.bin.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Resolve(format!(
                "resolver exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        // Several URLs may come back (video + audio); the first line is the
        // one matching the requested audio format.
        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => {
                debug!(url, direct = line, "resolved direct address");
                Ok(line.to_string())
            }
            None => Err(Error::Resolve(format!("resolver produced no output for {}", url))),
        }
    }
}
