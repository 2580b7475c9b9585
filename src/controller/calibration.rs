//! Orientation calibration
//!
//! The client streams `calibration` samples while the phone is held in its
//! rest pose, then sends `calibration_done`. The averages become baselines
//! subtracted from every later `device_motion` sample.

/// Euler angles in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    /// Yaw
    pub alpha: f64,
    /// Pitch
    pub beta: f64,
    /// Roll
    pub gamma: f64,
}

impl Orientation {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    fn add(self, other: Orientation) -> Self {
        Self::new(
            self.alpha + other.alpha,
            self.beta + other.beta,
            self.gamma + other.gamma,
        )
    }

    fn divide(self, divisor: f64) -> Self {
        Self::new(self.alpha / divisor, self.beta / divisor, self.gamma / divisor)
    }
}

/// Where the calibration protocol currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// No run in progress
    Idle,
    /// Collecting samples
    Sampling,
}

/// Running sums plus the finalized baselines
#[derive(Debug, Clone)]
pub struct Calibration {
    sum: Orientation,
    count: u32,
    baselines: Orientation,
    phase: CalibrationPhase,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            sum: Orientation::default(),
            count: 0,
            baselines: Orientation::default(),
            phase: CalibrationPhase::Idle,
        }
    }
}

impl Calibration {
    /// Accumulate one sample
    ///
    /// Returns `true` when this sample started a new run.
    pub fn add_sample(&mut self, sample: Orientation) -> bool {
        let started = self.phase == CalibrationPhase::Idle;
        self.phase = CalibrationPhase::Sampling;
        self.sum = self.sum.add(sample);
        self.count += 1;
        started
    }

    /// Finalize the run
    ///
    /// With at least one sample the averages replace the baselines and are
    /// returned; otherwise baselines stay as they were. Sums always reset.
    pub fn finish(&mut self) -> Option<Orientation> {
        let result = if self.count > 0 {
            self.baselines = self.sum.divide(f64::from(self.count));
            Some(self.baselines)
        } else {
            None
        };

        self.sum = Orientation::default();
        self.count = 0;
        self.phase = CalibrationPhase::Idle;
        result
    }

    /// Subtract the baselines from a raw sample
    pub fn apply(&self, raw: Orientation) -> Orientation {
        Orientation::new(
            raw.alpha - self.baselines.alpha,
            raw.beta - self.baselines.beta,
            raw.gamma - self.baselines.gamma,
        )
    }

    pub fn baselines(&self) -> Orientation {
        self.baselines
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Samples collected in the current run
    pub fn sample_count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_samples() {
        let mut cal = Calibration::default();
        assert!(cal.add_sample(Orientation::new(0.0, 2.0, 0.0)));
        assert!(!cal.add_sample(Orientation::new(0.0, 4.0, 0.0)));
        assert!(!cal.add_sample(Orientation::new(0.0, 6.0, 0.0)));
        assert_eq!(cal.phase(), CalibrationPhase::Sampling);

        let baselines = cal.finish().unwrap();
        assert_eq!(baselines.beta, 4.0);
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(cal.phase(), CalibrationPhase::Idle);
    }

    #[test]
    fn test_identical_samples_reproduce_sample() {
        let sample = Orientation::new(12.25, -3.5, 7.0);
        let mut cal = Calibration::default();
        for _ in 0..8 {
            cal.add_sample(sample);
        }
        assert_eq!(cal.finish(), Some(sample));
    }

    #[test]
    fn test_finish_without_samples_keeps_baselines() {
        let mut cal = Calibration::default();
        cal.add_sample(Orientation::new(1.0, 1.0, 1.0));
        cal.finish();

        assert_eq!(cal.finish(), None);
        assert_eq!(cal.baselines(), Orientation::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_new_run_replaces_baselines() {
        let mut cal = Calibration::default();
        cal.add_sample(Orientation::new(10.0, 10.0, 10.0));
        cal.finish();

        assert!(cal.add_sample(Orientation::new(0.0, 2.0, 0.0)));
        cal.finish();
        assert_eq!(cal.baselines(), Orientation::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_apply_subtracts_baselines() {
        let mut cal = Calibration::default();
        cal.add_sample(Orientation::new(0.0, 0.0, 1.0));
        cal.finish();

        assert_eq!(
            cal.apply(Orientation::new(5.0, 5.0, 359.0)),
            Orientation::new(5.0, 5.0, 358.0)
        );
    }
}
