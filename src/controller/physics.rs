//! Pointer Physics
//!
//! Turns orientation samples into a cursor velocity and integrates it at a
//! fixed rate.
//!
//! # Model
//!
//! Each `device_motion` sample nudges the velocity:
//!
//! ```text
//! vY -= beta  · centering_gain        (always)
//! vX += gamma · centering_gain
//! vY -= beta  · tilt_gain             (|beta|  > rot_deadzone)
//! vX += gamma · tilt_gain             (|gamma| > rot_deadzone)
//! ```
//!
//! Each tick decays and emits it:
//!
//! ```text
//! v  = v · friction
//! v  = 0                      if |v| < velocity_threshold
//! v  = clamp(v, ±max_velocity)
//! d  = trunc(v · move_scale)  → move_relative(dX, dY) when non-zero
//! ```
//!
//! Deltas truncate toward zero, so a velocity below `1 / move_scale` never
//! moves the cursor even though it is still carried between ticks.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Physics tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Per-tick velocity decay factor, in (0, 1)
    #[serde(default = "default_friction")]
    pub friction: f64,

    /// Velocity cap per axis
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,

    /// Tilt below this many degrees has no authority
    #[serde(default = "default_rot_deadzone")]
    pub rot_deadzone: f64,

    /// Velocities smaller than this snap to zero
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,

    /// Pixels per unit of velocity per tick
    #[serde(default = "default_move_scale")]
    pub move_scale: f64,

    /// Gain applied to every sample regardless of deadzone
    #[serde(default = "default_centering_gain")]
    pub centering_gain: f64,

    /// Gain applied to tilt outside the deadzone
    #[serde(default = "default_tilt_gain")]
    pub tilt_gain: f64,

    /// Tick period (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Cap on the elapsed time a single tick accounts for (ms)
    #[serde(default = "default_max_dt_ms")]
    pub max_dt_ms: u64,
}

fn default_friction() -> f64 {
    0.9
}
fn default_max_velocity() -> f64 {
    150.0
}
fn default_rot_deadzone() -> f64 {
    2.0
}
fn default_velocity_threshold() -> f64 {
    0.01
}
fn default_move_scale() -> f64 {
    15.0
}
fn default_centering_gain() -> f64 {
    0.0005
}
fn default_tilt_gain() -> f64 {
    0.01
}
fn default_tick_interval_ms() -> u64 {
    16
}
fn default_max_dt_ms() -> u64 {
    100
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: default_friction(),
            max_velocity: default_max_velocity(),
            rot_deadzone: default_rot_deadzone(),
            velocity_threshold: default_velocity_threshold(),
            move_scale: default_move_scale(),
            centering_gain: default_centering_gain(),
            tilt_gain: default_tilt_gain(),
            tick_interval_ms: default_tick_interval_ms(),
            max_dt_ms: default_max_dt_ms(),
        }
    }
}

impl PhysicsConfig {
    /// Tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Cap on per-tick elapsed time
    pub fn max_dt(&self) -> Duration {
        Duration::from_millis(self.max_dt_ms)
    }
}

/// Pointer sensitivity reference: the client's "1×" setting
pub const POINTER_SENSITIVITY_UNIT: f64 = 25.0;

/// Scroll sensitivity reference
pub const SCROLL_SENSITIVITY_UNIT: f64 = 50.0;

/// Wrap an angle in degrees into `(-180, 180]`
///
/// Non-finite input maps to 0.
pub fn normalize_angle(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Multiplier for a client sensitivity; zero means pass-through
pub fn sensitivity_factor(sensitivity: f64, unit: f64) -> f64 {
    if sensitivity == 0.0 || !sensitivity.is_finite() {
        1.0
    } else {
        sensitivity / unit
    }
}

/// Scale an integer delta and truncate toward zero
pub fn scale_delta(delta: i32, sensitivity: f64, unit: f64) -> i32 {
    (f64::from(delta) * sensitivity_factor(sensitivity, unit)) as i32
}

/// Velocity integrator state
#[derive(Debug, Clone)]
pub struct PhysicsState {
    velocity_x: f64,
    velocity_y: f64,
    last_update: Instant,
    last_dt: Duration,
}

impl PhysicsState {
    /// At rest
    pub fn new(now: Instant) -> Self {
        Self {
            velocity_x: 0.0,
            velocity_y: 0.0,
            last_update: now,
            last_dt: Duration::ZERO,
        }
    }

    /// Current `(vX, vY)`
    pub fn velocity(&self) -> (f64, f64) {
        (self.velocity_x, self.velocity_y)
    }

    /// Elapsed time the most recent tick accounted for, after capping
    pub fn last_dt(&self) -> Duration {
        self.last_dt
    }

    /// Overwrite the velocity
    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.velocity_x = vx;
        self.velocity_y = vy;
    }

    /// Apply one calibrated, normalized, sensitivity-scaled orientation
    /// sample (`beta` pitch, `gamma` roll)
    pub fn apply_orientation(&mut self, config: &PhysicsConfig, beta: f64, gamma: f64) {
        self.velocity_y -= beta * config.centering_gain;
        self.velocity_x += gamma * config.centering_gain;

        if beta.abs() > config.rot_deadzone {
            self.velocity_y -= beta * config.tilt_gain;
        }
        if gamma.abs() > config.rot_deadzone {
            self.velocity_x += gamma * config.tilt_gain;
        }
    }

    /// Advance one tick
    ///
    /// Returns the cursor delta to emit, or `None` when both axes truncate
    /// to zero.
    pub fn step(&mut self, config: &PhysicsConfig, now: Instant) -> Option<(i32, i32)> {
        self.last_dt = now
            .saturating_duration_since(self.last_update)
            .min(config.max_dt());
        self.last_update = now;

        self.velocity_x = decay_axis(self.velocity_x, config);
        self.velocity_y = decay_axis(self.velocity_y, config);

        let dx = (self.velocity_x * config.move_scale) as i32;
        let dy = (self.velocity_y * config.move_scale) as i32;

        if dx != 0 || dy != 0 {
            Some((dx, dy))
        } else {
            None
        }
    }
}

fn decay_axis(v: f64, config: &PhysicsConfig) -> f64 {
    let v = if v.is_finite() { v * config.friction } else { 0.0 };
    if v.abs() < config.velocity_threshold {
        0.0
    } else {
        v.clamp(-config.max_velocity, config.max_velocity)
    }
}
