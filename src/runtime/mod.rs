//! Poll-driven gamepad runtime.
//!
//! The gamepad handler is snapshot based: unlike the event-driven devices it
//! needs someone to feed it full device frames at a steady cadence. This
//! module owns that cadence — a tokio task ticks an interval, pulls a frame
//! out of a [`GamepadSource`] and hands it to the registered gamepad handler
//! through the controller lock.
//!
//! [`GilrsSource`] is the production source; tests script their own.

pub mod gilrs_source;

pub use gilrs_source::GilrsSource;

use crate::controller::InputController;
use crate::devices::{GamepadSnapshot, HandlerKind};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("gamepad backend failed: {0}")]
    Backend(String),

    #[error("poll task failed to shut down: {0}")]
    Join(String),
}

/// Provider of per-slot gamepad frames.
///
/// `pump_connections` is called once per tick before `frame` and returns
/// whether a new device showed up since the last call.
pub trait GamepadSource: Send {
    fn pump_connections(&mut self) -> bool;
    fn frame(&mut self) -> Vec<Option<GamepadSnapshot>>;
}

/// Handle to the spawned poll task, used for shutdown.
pub struct PollLoopHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollLoopHandle {
    /// Spawns the poll loop on the current tokio runtime.
    ///
    /// Each tick pumps the source for connection events, grabs a frame and
    /// feeds it to the controller's gamepad handler. Ticks are skipped with
    /// a warning when no gamepad handler is registered.
    pub fn spawn(
        controller: Arc<Mutex<InputController>>,
        mut source: Box<dyn GamepadSource>,
        interval: Duration,
    ) -> Self {
        info!("spawning gamepad poll loop at {:?} interval", interval);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("gamepad poll loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let connected = source.pump_connections();
                        let frame = source.frame();

                        let mut controller = controller.lock();
                        match controller.handler_mut(crate::devices::GamepadHandler::NAME) {
                            Ok(HandlerKind::Gamepad(pad)) => {
                                if connected {
                                    pad.connected();
                                }
                                pad.poll_frame(&frame);
                            }
                            Ok(_) => {
                                // A foreign handler squatting on the gamepad
                                // name cannot consume frames.
                                warn!("handler under 'gamepad' is not a gamepad handler");
                            }
                            Err(_) => {
                                debug!("no gamepad handler registered, skipping frame");
                            }
                        }
                    }
                }
            }
        });

        Self {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Signals the loop to stop and waits for the task to finish.
    pub async fn shutdown(self) -> Result<(), PollError> {
        // A dropped receiver means the task already exited; joining below
        // surfaces whatever happened to it.
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| PollError::Join(e.to_string()))?;
        info!("gamepad poll loop stopped");
        Ok(())
    }
}
