//! Control channel to the player process
//!
//! Speaks mpv's JSON IPC protocol over a Unix-domain socket: one JSON object
//! per line. A command is `{"command": [<op>, <args...>]}`; a property query
//! is `{"command": ["get_property", <name>]}` answered with one line
//! `{"data": <value>, "error": <status>}` where only `"success"` carries a
//! value. Every call opens a fresh connection, writes one line, reads at
//! most one response line, and closes; no connection is held across calls.
//!
//! A missing socket file or a refused connection is an expected state (the
//! player is not up, or already gone), modeled as [`IpcError::Unavailable`]
//! rather than raised. The session maps every variant to "no effect" or
//! "absent value".

use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::trace;

/// Control-channel failure modes. All of them degrade to "no value" at the
/// session surface; none of them ever aborts playback.
#[derive(Error, Debug)]
pub enum IpcError {
    /// Socket file missing, connection refused, or I/O failed mid-exchange
    #[error("control socket unavailable")]
    Unavailable,

    /// The player answered, but with an error status or a non-numeric value
    #[error("player returned no value")]
    NoValue,

    /// The response line was not valid JSON
    #[error("malformed control response")]
    Malformed,
}

pub type IpcResult<T> = std::result::Result<T, IpcError>;

/// One line of a property-query response
#[derive(Debug, Deserialize)]
struct PropertyReply {
    #[serde(default)]
    data: serde_json::Value,
    error: String,
}

/// Client for the player's IPC endpoint at a fixed socket path
#[derive(Debug, Clone)]
pub struct ControlSocket {
    path: PathBuf,
    io_timeout: Duration,
}

impl ControlSocket {
    pub fn new(path: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            io_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> IpcResult<UnixStream> {
        if !self.path.exists() {
            return Err(IpcError::Unavailable);
        }
        tokio::time::timeout(self.io_timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| IpcError::Unavailable)?
            .map_err(|_| IpcError::Unavailable)
    }

    /// Send a fire-and-forget command such as `["cycle", "pause"]`
    pub async fn command(&self, args: &[&str]) -> IpcResult<()> {
        let mut stream = self.connect().await?;
        let line = format!("{}\n", json!({ "command": args }));
        trace!(command = %line.trim(), "ipc send");
        tokio::time::timeout(self.io_timeout, stream.write_all(line.as_bytes()))
            .await
            .map_err(|_| IpcError::Unavailable)?
            .map_err(|_| IpcError::Unavailable)
    }

    /// Query a transport property and return its raw JSON value
    pub async fn get_property(&self, name: &str) -> IpcResult<serde_json::Value> {
        let stream = self.connect().await?;
        let mut stream = BufReader::new(stream);

        let line = format!("{}\n", json!({ "command": ["get_property", name] }));
        tokio::time::timeout(self.io_timeout, stream.write_all(line.as_bytes()))
            .await
            .map_err(|_| IpcError::Unavailable)?
            .map_err(|_| IpcError::Unavailable)?;

        let mut response = String::new();
        let read = tokio::time::timeout(self.io_timeout, stream.read_line(&mut response))
            .await
            .map_err(|_| IpcError::Unavailable)?
            .map_err(|_| IpcError::Unavailable)?;
        if read == 0 {
            return Err(IpcError::Unavailable);
        }
        trace!(property = name, response = %response.trim(), "ipc reply");

        let reply: PropertyReply =
            serde_json::from_str(response.trim()).map_err(|_| IpcError::Malformed)?;
        if reply.error == "success" && !reply.data.is_null() {
            Ok(reply.data)
        } else {
            Err(IpcError::NoValue)
        }
    }

    /// Query a numeric transport property (time-pos, duration, ...)
    pub async fn get_property_f64(&self, name: &str) -> IpcResult<f64> {
        self.get_property(name)
            .await?
            .as_f64()
            .ok_or(IpcError::NoValue)
    }
}
