//! Host automation pointer
//!
//! Drives the cursor through [enigo](https://docs.rs/enigo) on X11, Windows
//! and macOS. The enigo handle is not `Send` on every platform, so it lives on
//! a dedicated worker thread and the backend only holds the command sender.
//!
//! ```text
//! session / tick task                 automation worker (std::thread)
//! ━━━━━━━━━━━━━━━━━━━━━               ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//! AutomationPointer ──Command──────> worker::run()
//!   move / scroll / button              ├─ Enigo::new()
//!   (fire and forget)                   ├─ move_mouse / scroll / button
//!   center ───────────reply──────────── └─ main_display() + absolute move
//! ```
//!
//! Built only with the `automation` cargo feature. Without it,
//! [`AutomationPointer::new`] fails with [`PointerError::Unsupported`].

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

use super::error::{PointerError, Result};
use super::{MouseButton, PointerBackend};

/// Commands handled by the automation worker
#[derive(Debug)]
enum Command {
    Move { dx: i32, dy: i32 },
    Scroll { dx: i32, dy: i32 },
    Button { button: MouseButton, pressed: bool },
    Center { reply: Sender<Result<()>> },
    Shutdown,
}

/// Pointer backed by the host automation library
pub struct AutomationPointer {
    command_tx: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AutomationPointer {
    /// Start the worker thread and open the automation handle
    #[cfg(feature = "automation")]
    pub fn new() -> Result<Self> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = std::thread::Builder::new()
            .name("pointer-automation".to_string())
            .spawn(move || worker::run(command_rx, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Automation worker started");
                Ok(Self {
                    command_tx,
                    worker: Mutex::new(Some(handle)),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(PointerError::WorkerGone)
            }
        }
    }

    /// Always fails: the crate was built without the `automation` feature
    #[cfg(not(feature = "automation"))]
    pub fn new() -> Result<Self> {
        Err(PointerError::Unsupported("automation"))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PointerError::WorkerGone)
    }
}

impl PointerBackend for AutomationPointer {
    fn name(&self) -> &'static str {
        "automation"
    }

    fn move_relative(&self, dx: i32, dy: i32) -> Result<()> {
        self.send(Command::Move { dx, dy })
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        self.send(Command::Scroll { dx, dy })
    }

    fn press(&self, button: MouseButton) -> Result<()> {
        self.send(Command::Button {
            button,
            pressed: true,
        })
    }

    fn release(&self, button: MouseButton) -> Result<()> {
        self.send(Command::Button {
            button,
            pressed: false,
        })
    }

    fn center_on_primary_display(&self) -> Result<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(Command::Center { reply: reply_tx })?;
        reply_rx.recv().map_err(|_| PointerError::WorkerGone)?
    }

    fn close(&self) -> Result<()> {
        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };

        debug!("Stopping automation worker");
        let _ = self.command_tx.send(Command::Shutdown);
        if handle.join().is_err() {
            error!("Automation worker panicked during shutdown");
            return Err(PointerError::Automation("worker panicked".to_string()));
        }
        info!("Automation worker stopped");
        Ok(())
    }
}

impl Drop for AutomationPointer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(feature = "automation")]
mod worker {
    use enigo::{Axis, Button, Coordinate, Direction, Enigo, Mouse, Settings};
    use tracing::{debug, warn};

    use crossbeam_channel::{Receiver, Sender};

    use super::Command;
    use crate::pointer::error::{PointerError, Result};
    use crate::pointer::MouseButton;

    fn to_enigo(button: MouseButton) -> Button {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        }
    }

    fn automation_err(e: impl std::fmt::Display) -> PointerError {
        PointerError::Automation(e.to_string())
    }

    fn center(enigo: &mut Enigo) -> Result<()> {
        let (width, height) = enigo.main_display().map_err(automation_err)?;
        debug!("Main display {}x{}", width, height);
        enigo
            .move_mouse(width / 2, height / 2, Coordinate::Abs)
            .map_err(automation_err)
    }

    pub(super) fn run(commands: Receiver<Command>, ready: Sender<Result<()>>) {
        let mut enigo = match Enigo::new(&Settings::default()) {
            Ok(enigo) => {
                let _ = ready.send(Ok(()));
                enigo
            }
            Err(e) => {
                let _ = ready.send(Err(automation_err(e)));
                return;
            }
        };

        for command in commands.iter() {
            let result = match command {
                Command::Move { dx, dy } => enigo.move_mouse(dx, dy, Coordinate::Rel),
                Command::Scroll { dx, dy } => {
                    let vertical = if dy != 0 {
                        enigo.scroll(dy, Axis::Vertical)
                    } else {
                        Ok(())
                    };
                    vertical.and_then(|()| {
                        if dx != 0 {
                            enigo.scroll(dx, Axis::Horizontal)
                        } else {
                            Ok(())
                        }
                    })
                }
                Command::Button { button, pressed } => {
                    let direction = if pressed {
                        Direction::Press
                    } else {
                        Direction::Release
                    };
                    enigo.button(to_enigo(button), direction)
                }
                Command::Center { reply } => {
                    let _ = reply.send(center(&mut enigo));
                    continue;
                }
                Command::Shutdown => break,
            };

            if let Err(e) = result {
                warn!("Automation command failed: {}", e);
            }
        }

        debug!("Automation worker exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_channel_reports_worker_gone() {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        drop(command_rx);
        let pointer = AutomationPointer {
            command_tx,
            worker: Mutex::new(None),
        };

        assert!(matches!(
            pointer.move_relative(1, 1),
            Err(PointerError::WorkerGone)
        ));
        assert!(matches!(
            pointer.center_on_primary_display(),
            Err(PointerError::WorkerGone)
        ));
        // No worker to join
        assert!(pointer.close().is_ok());
    }

    #[test]
    fn test_commands_forwarded_to_worker() {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let pointer = AutomationPointer {
            command_tx,
            worker: Mutex::new(None),
        };

        pointer.move_relative(3, -4).unwrap();
        pointer.press(MouseButton::Right).unwrap();
        pointer.scroll(0, 0).unwrap();

        assert!(matches!(
            command_rx.try_recv(),
            Ok(Command::Move { dx: 3, dy: -4 })
        ));
        assert!(matches!(
            command_rx.try_recv(),
            Ok(Command::Button {
                button: MouseButton::Right,
                pressed: true
            })
        ));
        // Zero scroll is not forwarded
        assert!(command_rx.try_recv().is_err());
    }
}
