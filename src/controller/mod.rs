//! Packet Controller
//!
//! Bridges decoded packets to the pointer backend. Direct commands (moves,
//! scrolls, clicks) hit the backend immediately; orientation samples only
//! adjust a shared velocity that a fixed-rate tick task turns into cursor
//! motion.
//!
//! # Architecture
//!
//! ```text
//! session tasks ──dispatch()──┬─> backend (mouse_move, scroll_move, clicks)
//!                             │
//!                             └─> ControlState ◄── tick task (every 16ms)
//!                                 ├─ PhysicsState          │
//!                                 └─ Calibration           └─> backend.move_relative
//! ```
//!
//! `ControlState` sits behind one `parking_lot::Mutex` that is only held for
//! the state update. Backend calls happen after the guard is dropped.
//!
//! # Lifecycle
//!
//! [`PacketController::new`] spawns the tick task on the current tokio
//! runtime. [`PacketController::manual`] skips it so tests can drive ticks
//! with [`PacketController::tick`]. [`PacketController::close`] stops the
//! tick task and closes the backend; it is safe to call more than once.

pub mod calibration;
pub mod physics;

pub use calibration::{Calibration, CalibrationPhase, Orientation};
pub use physics::{PhysicsConfig, PhysicsState};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::pointer::{MouseButton, PointerBackend, PointerError};
use crate::protocol::Packet;
use physics::{
    normalize_angle, scale_delta, sensitivity_factor, POINTER_SENSITIVITY_UNIT,
    SCROLL_SENSITIVITY_UNIT,
};

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Controller error types
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Controller has been shut down
    #[error("controller is closed")]
    Closed,

    /// Backend rejected a direct command
    #[error("pointer backend error: {0}")]
    Pointer(#[from] PointerError),
}

/// Everything guarded by the state lock
#[derive(Debug)]
struct ControlState {
    physics: PhysicsState,
    calibration: Calibration,
}

/// Routes packets to the pointer and owns the physics integrator
pub struct PacketController {
    backend: Arc<dyn PointerBackend>,
    config: PhysicsConfig,
    state: Mutex<ControlState>,
    closed: AtomicBool,
    cancel: CancellationToken,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl PacketController {
    /// Create a controller and start its tick task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn PointerBackend>, config: PhysicsConfig) -> Arc<Self> {
        let controller = Self::manual(backend, config);

        let handle = tokio::spawn(run_ticker(
            Arc::downgrade(&controller),
            controller.cancel.clone(),
        ));
        *controller.ticker.lock() = Some(handle);

        info!(
            "Physics loop started ({}ms tick)",
            controller.config.tick_interval_ms
        );
        controller
    }

    /// Create a controller without a tick task
    pub fn manual(backend: Arc<dyn PointerBackend>, config: PhysicsConfig) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(ControlState {
                physics: PhysicsState::new(Instant::now()),
                calibration: Calibration::default(),
            }),
            config,
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            ticker: Mutex::new(None),
        })
    }

    /// Apply one packet
    ///
    /// Backend failures on direct commands are returned; the caller decides
    /// whether to log them. Orientation and calibration packets only touch
    /// controller state.
    pub fn dispatch(&self, packet: &Packet) -> Result<()> {
        if self.is_closed() {
            return Err(ControllerError::Closed);
        }

        match *packet {
            Packet::MouseMove {
                x,
                y,
                pointer_sensitivity,
            } => {
                let dx = scale_delta(x, pointer_sensitivity, POINTER_SENSITIVITY_UNIT);
                let dy = scale_delta(y, pointer_sensitivity, POINTER_SENSITIVITY_UNIT);
                debug!(
                    "Moving mouse: dx={}, dy={} (raw: {}, {}, sens: {:.2})",
                    dx, dy, x, y, pointer_sensitivity
                );
                self.backend.move_relative(dx, dy)?;
            }

            Packet::ScrollMove {
                x,
                y,
                scroll_sensitivity,
            } => {
                let dx = scale_delta(x, scroll_sensitivity, SCROLL_SENSITIVITY_UNIT);
                let dy = scale_delta(y, scroll_sensitivity, SCROLL_SENSITIVITY_UNIT);
                debug!(
                    "Scrolling: dx={}, dy={} (raw: {}, {}, sens: {:.2})",
                    dx, dy, x, y, scroll_sensitivity
                );
                self.backend.scroll(dx, dy)?;
            }

            Packet::DeviceMotion {
                rot_alpha,
                rot_beta,
                rot_gamma,
                pointer_sensitivity,
                ..
            } => self.update_motion(
                Orientation::new(rot_alpha, rot_beta, rot_gamma),
                pointer_sensitivity,
            ),

            Packet::Calibration {
                rot_alpha,
                rot_beta,
                rot_gamma,
                ..
            } => self.add_calibration_sample(Orientation::new(rot_alpha, rot_beta, rot_gamma)),

            Packet::CalibrationDone => {
                let mut state = self.state.lock();
                let count = state.calibration.sample_count();
                match state.calibration.finish() {
                    Some(b) => info!(
                        "Calibration done: baselines ({:.2}, {:.2}, {:.2}) from {} samples",
                        b.alpha, b.beta, b.gamma, count
                    ),
                    None => info!("Calibration done: no samples collected, baselines unchanged"),
                }
            }

            Packet::LeftClickDown => self.button(MouseButton::Left, true)?,
            Packet::LeftClickUp => self.button(MouseButton::Left, false)?,
            Packet::RightClickDown => self.button(MouseButton::Right, true)?,
            Packet::RightClickUp => self.button(MouseButton::Right, false)?,

            // Liveness and credentials are the session's business
            Packet::KeepAlive | Packet::Auth { .. } => {}
        }

        Ok(())
    }

    fn button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        debug!("{} button {}", button, if pressed { "down" } else { "up" });
        if pressed {
            self.backend.press(button)?;
        } else {
            self.backend.release(button)?;
        }
        Ok(())
    }

    fn update_motion(&self, raw: Orientation, sensitivity: f64) {
        let factor = sensitivity_factor(sensitivity, POINTER_SENSITIVITY_UNIT);

        let mut state = self.state.lock();
        let calibrated = state.calibration.apply(raw);
        let beta = normalize_angle(calibrated.beta) * factor;
        let gamma = normalize_angle(calibrated.gamma) * factor;
        state.physics.apply_orientation(&self.config, beta, gamma);

        let (vx, vy) = state.physics.velocity();
        trace!(
            "Device motion: beta={:.2}, gamma={:.2}, velocity=({:.3}, {:.3}), sens={:.2}",
            beta,
            gamma,
            vx,
            vy,
            sensitivity
        );
    }

    fn add_calibration_sample(&self, sample: Orientation) {
        let (started, count) = {
            let mut state = self.state.lock();
            let started = state.calibration.add_sample(sample);
            (started, state.calibration.sample_count())
        };

        debug!(
            "Calibration sample {}: ({:.2}, {:.2}, {:.2})",
            count, sample.alpha, sample.beta, sample.gamma
        );

        if started {
            info!("Calibration started, centering cursor");
            if let Err(e) = self.backend.center_on_primary_display() {
                warn!("Failed to center cursor for calibration: {}", e);
            }
        }
    }

    /// Run one physics step
    pub fn tick(&self) {
        let delta = self.state.lock().physics.step(&self.config, Instant::now());

        if let Some((dx, dy)) = delta {
            if let Err(e) = self.backend.move_relative(dx, dy) {
                warn!("Physics mouse move error: {}", e);
            }
        }
    }

    /// Stop the tick task and close the backend
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.cancel.cancel();
        let ticker = self.ticker.lock().take();
        if let Some(handle) = ticker {
            if let Err(e) = handle.await {
                error!("Physics loop task failed: {}", e);
            }
        }

        self.backend.close()?;
        info!("Packet controller closed");
        Ok(())
    }

    /// Current `(vX, vY)`
    pub fn velocity(&self) -> (f64, f64) {
        self.state.lock().physics.velocity()
    }

    /// Finalized calibration baselines
    pub fn baselines(&self) -> Orientation {
        self.state.lock().calibration.baselines()
    }

    pub fn calibration_phase(&self) -> CalibrationPhase {
        self.state.lock().calibration.phase()
    }

    /// Samples collected in the current calibration run
    pub fn calibration_samples(&self) -> u32 {
        self.state.lock().calibration.sample_count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn physics_config(&self) -> &PhysicsConfig {
        &self.config
    }
}

async fn run_ticker(controller: Weak<PacketController>, cancel: CancellationToken) {
    let period = match controller.upgrade() {
        Some(c) => c.config.tick_interval(),
        None => return,
    };
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match controller.upgrade() {
                    Some(c) => c.tick(),
                    None => break,
                }
            }
        }
    }

    debug!("Physics loop stopped");
}
