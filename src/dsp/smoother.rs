//! Exponential parameter smoothing
//!
//! Gain changes are ramped sample by sample toward their target so stepped
//! parameter values never produce audible clicks.

/// Exponential ramp from the current value toward a target
///
/// The per-sample decay coefficient is `alpha = exp(-1 / (tc * sr))`, so
/// `current` converges geometrically toward `target` and approaches it
/// asymptotically — exact equality is never guaranteed, which is fine for
/// audio gains.
#[derive(Debug, Clone)]
pub struct ExpSmoother {
    current: f32,
    target: f32,
    alpha: f32,
    time_constant: f32,
    sample_rate: f32,
}

impl ExpSmoother {
    /// Create a smoother with the given time constant in seconds
    pub fn new(time_constant: f32) -> Self {
        let mut smoother = Self {
            current: 0.0,
            target: 0.0,
            alpha: 0.0,
            time_constant,
            sample_rate: 48000.0,
        };
        smoother.update_alpha();
        smoother
    }

    /// Set the ramp time constant in seconds
    pub fn set_time_constant(&mut self, seconds: f32) {
        self.time_constant = seconds;
        self.update_alpha();
    }

    /// Set the sample rate in Hz
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_alpha();
    }

    /// Change the destination value without resetting the current one
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Destination value
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Current (ramping) value
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advance one sample toward the target and return the new value
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current = self.target + self.alpha * (self.current - self.target);
        self.current
    }

    /// Jump immediately to the target with zero transition
    ///
    /// Used on activation/reset so the ramp never glides up from a stale
    /// (typically silence-initialized) value.
    pub fn clear_to_target(&mut self) {
        self.current = self.target;
    }

    fn update_alpha(&mut self) {
        self.alpha = (-1.0 / (self.time_constant * self.sample_rate)).exp();
    }
}
