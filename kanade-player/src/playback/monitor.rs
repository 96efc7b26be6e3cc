//! Background monitor for the playback chain
//!
//! One monitor task is spawned per session generation. It polls the player
//! handle; when the player exits on its own, the monitor terminates a
//! surviving resolver (the consumer is gone, so the producer's output is no
//! longer wanted), clears the session state, removes the socket file, and
//! broadcasts `PlaybackEnded`.
//!
//! A monitor whose generation no longer matches the session state has been
//! superseded by a newer `play` or an explicit `stop`; it exits without
//! touching anything.

use crate::config::PlayerConfig;
use crate::playback::pipeline;
use crate::playback::session::{terminate, SessionState};
use kanade_common::PlayerEvent;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub(crate) fn spawn_monitor(
    state: Arc<Mutex<SessionState>>,
    generation: u64,
    config: PlayerConfig,
    event_tx: broadcast::Sender<PlayerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(generation, "monitor started");
        loop {
            tokio::time::sleep(config.monitor_poll()).await;

            let resolver = {
                let mut state = state.lock().await;
                if state.generation != generation {
                    debug!(generation, "monitor superseded");
                    return;
                }

                let exited = match state.player.as_mut() {
                    // Err from try_wait leaves us blind; assume the worst
                    // and let teardown sort it out.
                    Some(child) => !matches!(child.try_wait(), Ok(None)),
                    None => true,
                };
                if !exited {
                    continue;
                }

                info!(generation, "player exited, tearing down chain");
                let resolver = state.resolver.take();
                state.clear();
                resolver
            };

            // the player (consumer) is gone, reap the producer too
            if let Some(mut child) = resolver {
                terminate(&mut child, &config, "resolver").await;
            }
            {
                // only touch the socket file if no newer session took over
                // while the resolver was being reaped
                let state = state.lock().await;
                if state.generation == generation {
                    pipeline::remove_socket_file(&config);
                }
            }
            let _ = event_tx.send(PlayerEvent::ended());
            return;
        }
    })
}
