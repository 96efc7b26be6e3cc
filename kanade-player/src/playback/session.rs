//! Playback session
//!
//! Owns the lifecycle of the running playback chain: at most one session is
//! active at a time, and starting a new one always fully tears down the
//! previous one first. The session state machine is Idle -> Starting ->
//! Active -> (Stopping ->) Idle; Active returns to Idle either through the
//! background monitor (natural player exit) or through an explicit `stop`.
//!
//! A generation counter ties each monitor task to the session incarnation
//! that spawned it: `stop` and every new `play` bump the counter, so a
//! superseded monitor notices and exits without touching the new chain.

use crate::cache::UrlCache;
use crate::config::PlayerConfig;
use crate::error::Result;
use crate::playback::ipc::ControlSocket;
use crate::playback::{monitor, pipeline};
use kanade_common::{PlayerEvent, TrackDescriptor};
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Child;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Relative volume step sent per volume command
const VOLUME_STEP: i32 = 5;

/// Relative seek step in seconds
const SEEK_STEP_SECS: i32 = 10;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No chain running; initial and terminal state
    Idle,
    /// Play request accepted, processes being spawned
    Starting,
    /// Chain up, monitor watching the player handle
    Active,
    /// Caller-initiated teardown in progress
    Stopping,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Starting => write!(f, "starting"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Stopping => write!(f, "stopping"),
        }
    }
}

/// Mutable session state, shared with the monitor task
pub(crate) struct SessionState {
    pub(crate) phase: SessionPhase,
    pub(crate) player: Option<Child>,
    pub(crate) resolver: Option<Child>,
    pub(crate) playing: bool,
    pub(crate) current_track: Option<TrackDescriptor>,
    pub(crate) generation: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            player: None,
            resolver: None,
            playing: false,
            current_track: None,
            generation: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.player = None;
        self.resolver = None;
        self.playing = false;
        self.current_track = None;
        self.phase = SessionPhase::Idle;
    }
}

/// The playback process orchestrator
#[derive(Clone)]
pub struct PlayerSession {
    config: PlayerConfig,
    cache: Arc<UrlCache>,
    state: Arc<Mutex<SessionState>>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl PlayerSession {
    pub fn new(config: PlayerConfig, cache: Arc<UrlCache>) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            config,
            cache,
            state: Arc::new(Mutex::new(SessionState::new())),
            event_tx,
        }
    }

    /// Subscribe to playback lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Start playing `url`, described by `track`.
    ///
    /// Any current session is fully stopped first. Returns `true` once the
    /// chain is up (after the readiness wait); `false` if spawning failed,
    /// in which case the session is rolled back to Idle with nothing left
    /// running.
    pub async fn play(&self, url: &str, track: TrackDescriptor) -> bool {
        match self.try_play(url, track).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url, error = %e, "playback start failed");
                self.stop().await;
                false
            }
        }
    }

    async fn try_play(&self, url: &str, track: TrackDescriptor) -> Result<()> {
        self.stop().await;
        pipeline::remove_socket_file(&self.config);

        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.phase = SessionPhase::Starting;
            state.playing = true;
            state.current_track = Some(track.clone());
            state.generation
        };

        // Live streams go straight to the player; for everything else a
        // cached direct address skips the resolver process entirely, and a
        // cache miss builds the full resolver -> player pipe.
        let (player, resolver) = if track.is_live() {
            info!(url, title = %track.title, "starting live stream (direct)");
            (pipeline::spawn_direct(&self.config, url)?, None)
        } else if let Some(direct) = self.cache.get(url).await {
            info!(url, title = %track.title, "starting from cached address");
            (pipeline::spawn_direct(&self.config, &direct)?, None)
        } else {
            info!(url, title = %track.title, "starting resolver pipe");
            let (resolver, player) = pipeline::spawn_piped(&self.config, url)?;
            (player, Some(resolver))
        };

        {
            let mut state = self.state.lock().await;
            state.player = Some(player);
            state.resolver = resolver;
            state.phase = SessionPhase::Active;
        }

        monitor::spawn_monitor(
            Arc::clone(&self.state),
            generation,
            self.config.clone(),
            self.event_tx.clone(),
        );

        self.wait_until_ready().await;
        let _ = self.event_tx.send(PlayerEvent::started(track));
        Ok(())
    }

    /// Stop playback. Idempotent; safe to call from any task, including a
    /// shutdown hook racing the monitor.
    ///
    /// The resolver is terminated before the player so the producer never
    /// outlives this call, then state is cleared and the socket file
    /// removed. "Process already gone" counts as success throughout.
    pub async fn stop(&self) {
        let (resolver, player, my_generation) = {
            let mut state = self.state.lock().await;
            if state.player.is_none() && state.resolver.is_none() && state.phase == SessionPhase::Idle
            {
                return;
            }
            state.phase = SessionPhase::Stopping;
            // orphan any monitor attached to the old chain
            state.generation += 1;
            (state.resolver.take(), state.player.take(), state.generation)
        };

        if let Some(mut child) = resolver {
            terminate(&mut child, &self.config, "resolver").await;
        }
        if let Some(mut child) = player {
            terminate(&mut child, &self.config, "player").await;
        }

        {
            // a new play() may have started while we were terminating; only
            // the owner of the latest generation may clear state and the
            // socket file
            let mut state = self.state.lock().await;
            if state.generation == my_generation {
                state.clear();
                pipeline::remove_socket_file(&self.config);
            }
        }

        debug!("session stopped");
        let _ = self.event_tx.send(PlayerEvent::stopped());
    }

    /// True iff the session believes it is playing and a direct liveness
    /// probe of the player handle agrees. The probe guards against the flag
    /// going stale between the process dying and the monitor noticing.
    pub async fn playing(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.playing {
            return false;
        }
        match state.player.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// The track currently playing, if any
    pub async fn current_track(&self) -> Option<TrackDescriptor> {
        self.state.lock().await.current_track.clone()
    }

    /// Current session phase
    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    /// OS pid of the player process, if one is held
    pub async fn player_pid(&self) -> Option<u32> {
        self.state.lock().await.player.as_ref().and_then(|c| c.id())
    }

    /// OS pid of the resolver process, if one is held
    pub async fn resolver_pid(&self) -> Option<u32> {
        self.state.lock().await.resolver.as_ref().and_then(|c| c.id())
    }

    // Transport controls. Every one of these is a silent no-op (false /
    // None) when no chain is up or the socket is gone; a transient control
    // failure never disturbs the session.

    /// Toggle pause
    pub async fn pause(&self) -> bool {
        if !self.playing().await {
            return false;
        }
        self.ipc().command(&["cycle", "pause"]).await.is_ok()
    }

    pub async fn volume_up(&self) -> bool {
        self.send_command(&["add", "volume", &VOLUME_STEP.to_string()])
            .await
    }

    pub async fn volume_down(&self) -> bool {
        self.send_command(&["add", "volume", &(-VOLUME_STEP).to_string()])
            .await
    }

    pub async fn seek_forward(&self) -> bool {
        self.send_command(&["seek", &SEEK_STEP_SECS.to_string()]).await
    }

    pub async fn seek_backward(&self) -> bool {
        self.send_command(&["seek", &(-SEEK_STEP_SECS).to_string()])
            .await
    }

    /// Current playback position in seconds
    pub async fn time_pos(&self) -> Option<f64> {
        self.get_property("time-pos").await
    }

    /// Stream duration in seconds (absent for live streams)
    pub async fn duration(&self) -> Option<f64> {
        self.get_property("duration").await
    }

    fn ipc(&self) -> ControlSocket {
        ControlSocket::new(&self.config.socket_path, self.config.ipc_timeout())
    }

    async fn has_player(&self) -> bool {
        self.state.lock().await.player.is_some()
    }

    async fn send_command(&self, args: &[&str]) -> bool {
        if !self.has_player().await {
            return false;
        }
        self.ipc().command(args).await.is_ok()
    }

    async fn get_property(&self, name: &str) -> Option<f64> {
        if !self.has_player().await {
            return None;
        }
        self.ipc().get_property_f64(name).await.ok()
    }

    /// Wait for playback readiness: the socket file exists and a transport
    /// property query answers. Polls at a short interval up to a bound; on
    /// timeout, falls back to a fixed grace delay and proceeds anyway, since
    /// some streams legitimately take longer to report properties.
    async fn wait_until_ready(&self) {
        let ipc = self.ipc();
        let deadline = Instant::now() + self.config.readiness_timeout();

        while Instant::now() < deadline {
            if self.config.socket_path.exists()
                && (ipc.get_property_f64("duration").await.is_ok()
                    || ipc.get_property_f64("time-pos").await.is_ok())
            {
                debug!("player ready");
                return;
            }
            tokio::time::sleep(self.config.readiness_poll()).await;
        }

        debug!(
            grace_ms = self.config.startup_grace_ms,
            "player not ready within bound, proceeding after grace delay"
        );
        tokio::time::sleep(self.config.startup_grace()).await;
    }
}

/// Terminate a child process: kill, then wait up to the configured bound.
/// A child that is already gone (killed, reaped, or never fully spawned) is
/// success, not an error.
pub(crate) async fn terminate(child: &mut Child, config: &PlayerConfig, label: &str) {
    if let Err(e) = child.start_kill() {
        // InvalidInput means the child was already reaped
        debug!(process = label, error = %e, "kill skipped");
    }
    match tokio::time::timeout(config.kill_wait(), child.wait()).await {
        Ok(Ok(status)) => debug!(process = label, %status, "terminated"),
        Ok(Err(e)) => debug!(process = label, error = %e, "wait failed, treating as gone"),
        Err(_) => warn!(
            process = label,
            wait_ms = config.kill_wait_ms,
            "did not exit within bound"
        ),
    }
}
