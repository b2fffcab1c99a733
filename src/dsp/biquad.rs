//! Second-order IIR filter stage
//!
//! Implements the six filter shapes used by the tone stack, with
//! coefficients from the Audio EQ Cookbook.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use std::f32::consts::PI;

/// Filter type selecting which coefficient formula a [`Biquad`] uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Remove above frequency
    LowPass,
    /// Remove below frequency
    HighPass,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
    /// Bell curve boost/cut
    Peak,
    /// Pass a band around the center frequency (constant 0 dB peak gain)
    BandPass,
}

/// Single biquad filter stage
///
/// Owns five normalized coefficients and a four-register delay line
/// (two input history, two output history). The last type/frequency/Q/gain
/// are retained so a caller can cheaply update one dimension — e.g.
/// [`set_fc`](Biquad::set_fc) alone — without re-supplying the others.
///
/// Coefficients and state are independently mutable: recomputing
/// coefficients while the delay line is non-zero produces a brief but
/// bounded transient, which is an accepted trade-off for glitch-free
/// parameter changes.
///
/// Not safe to share across threads; each instance belongs to exactly one
/// processing context.
#[derive(Debug, Clone)]
pub struct Biquad {
    filter_type: FilterType,
    fc: f32,
    q: f32,
    peak_gain_db: f32,

    // Normalized coefficients (divided by a0)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Delay registers
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Create a filter with the given type, normalized frequency
    /// (`fc = f / sample_rate`, must stay below 0.5), Q, and peak gain in dB
    pub fn new(filter_type: FilterType, fc: f32, q: f32, peak_gain_db: f32) -> Self {
        let mut biquad = Self {
            filter_type,
            fc,
            q,
            peak_gain_db,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        biquad.calc_coefficients();
        biquad
    }

    /// Recompute all five coefficients from a full parameter set
    pub fn set_biquad(&mut self, filter_type: FilterType, fc: f32, q: f32, peak_gain_db: f32) {
        self.filter_type = filter_type;
        self.fc = fc;
        self.q = q;
        self.peak_gain_db = peak_gain_db;
        self.calc_coefficients();
    }

    /// Change the filter type, keeping frequency/Q/gain
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.calc_coefficients();
    }

    /// Change the normalized frequency, keeping the other parameters
    pub fn set_fc(&mut self, fc: f32) {
        self.fc = fc;
        self.calc_coefficients();
    }

    /// Change the Q factor, keeping the other parameters
    pub fn set_q(&mut self, q: f32) {
        self.q = q;
        self.calc_coefficients();
    }

    /// Change the peak gain in dB, keeping the other parameters
    pub fn set_peak_gain(&mut self, gain_db: f32) {
        self.peak_gain_db = gain_db;
        self.calc_coefficients();
    }

    /// Current filter type
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Process a single sample (direct form I)
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Filter a block in place
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Filter `input` into `output`, sample by sample
    pub fn process_block_into(&mut self, output: &mut [f32], input: &[f32]) {
        for (out, &inp) in output.iter_mut().zip(input.iter()) {
            *out = self.process(inp);
        }
    }

    /// Clear the delay registers
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Whether the delay registers are all zero
    pub(crate) fn state_is_zero(&self) -> bool {
        self.x1 == 0.0 && self.x2 == 0.0 && self.y1 == 0.0 && self.y2 == 0.0
    }

    fn calc_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.fc;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);

        // Shelf/peak amplitude
        let a = 10.0_f32.powf(self.peak_gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SAMPLE_RATE: f32 = 48000.0;

    fn sine(frequency: f32, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| (2.0 * PI * frequency * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn rms(buffer: &[f32]) -> f32 {
        let sum_sq: f32 = buffer.iter().map(|s| s * s).sum();
        (sum_sq / buffer.len() as f32).sqrt()
    }

    #[test_case(FilterType::LowShelf; "low shelf")]
    #[test_case(FilterType::HighShelf; "high shelf")]
    #[test_case(FilterType::Peak; "peak")]
    fn test_zero_gain_is_identity(filter_type: FilterType) {
        let mut filter = Biquad::new(filter_type, 1000.0 / SAMPLE_RATE, 0.707, 0.0);

        // Unit impulse response must match the identity filter
        let mut impulse = vec![0.0_f32; 64];
        impulse[0] = 1.0;
        filter.process_block(&mut impulse);

        assert!((impulse[0] - 1.0).abs() < 1e-5, "impulse[0] = {}", impulse[0]);
        for (i, &s) in impulse.iter().enumerate().skip(1) {
            assert!(s.abs() < 1e-5, "impulse[{}] = {}", i, s);
        }
    }

    #[test]
    fn test_low_pass_attenuates_high_frequencies() {
        let mut filter = Biquad::new(FilterType::LowPass, 1000.0 / SAMPLE_RATE, 0.707, 0.0);

        let mut low = sine(200.0, 4800);
        let low_before = rms(&low);
        filter.process_block(&mut low);
        let low_gain = rms(&low) / low_before;

        filter.reset();
        let mut high = sine(8000.0, 4800);
        let high_before = rms(&high);
        filter.process_block(&mut high);
        let high_gain = rms(&high) / high_before;

        assert!(low_gain > 0.9, "passband gain {}", low_gain);
        assert!(high_gain < 0.1, "stopband gain {}", high_gain);
    }

    #[test]
    fn test_high_pass_attenuates_low_frequencies() {
        let mut filter = Biquad::new(FilterType::HighPass, 1000.0 / SAMPLE_RATE, 0.707, 0.0);

        let mut low = sine(100.0, 4800);
        let low_before = rms(&low);
        filter.process_block(&mut low);
        let low_gain = rms(&low) / low_before;

        filter.reset();
        let mut high = sine(8000.0, 4800);
        let high_before = rms(&high);
        filter.process_block(&mut high);
        let high_gain = rms(&high) / high_before;

        assert!(low_gain < 0.1, "stopband gain {}", low_gain);
        assert!(high_gain > 0.9, "passband gain {}", high_gain);
    }

    #[test]
    fn test_band_pass_passes_center_rejects_skirts() {
        let mut filter = Biquad::new(FilterType::BandPass, 1000.0 / SAMPLE_RATE, 2.0, 0.0);

        let mut center = sine(1000.0, 9600);
        let center_before = rms(&center);
        filter.process_block(&mut center);
        let center_gain = rms(&center) / center_before;

        filter.reset();
        let mut low = sine(100.0, 9600);
        let low_before = rms(&low);
        filter.process_block(&mut low);
        let low_gain = rms(&low) / low_before;

        filter.reset();
        let mut high = sine(10000.0, 9600);
        let high_before = rms(&high);
        filter.process_block(&mut high);
        let high_gain = rms(&high) / high_before;

        assert!(center_gain > 0.9, "center gain {}", center_gain);
        assert!(low_gain < 0.2, "low skirt gain {}", low_gain);
        assert!(high_gain < 0.2, "high skirt gain {}", high_gain);
    }

    #[test]
    fn test_peak_boost_raises_center() {
        let mut filter = Biquad::new(FilterType::Peak, 1000.0 / SAMPLE_RATE, 1.0, 12.0);

        let mut center = sine(1000.0, 9600);
        let before = rms(&center);
        filter.process_block(&mut center);
        let gain = rms(&center) / before;

        // 12 dB boost is ~3.98x
        assert!(gain > 3.0 && gain < 5.0, "expected ~4x gain, got {}", gain);
    }

    #[test]
    fn test_partial_update_keeps_other_parameters() {
        let mut a = Biquad::new(FilterType::Peak, 750.0 / SAMPLE_RATE, 1.5, 6.0);
        a.set_fc(2000.0 / SAMPLE_RATE);

        let b = Biquad::new(FilterType::Peak, 2000.0 / SAMPLE_RATE, 1.5, 6.0);

        let mut impulse_a = vec![0.0_f32; 32];
        impulse_a[0] = 1.0;
        a.process_block(&mut impulse_a);

        let mut impulse_b = vec![0.0_f32; 32];
        impulse_b[0] = 1.0;
        let mut b = b;
        b.process_block(&mut impulse_b);

        for (sa, sb) in impulse_a.iter().zip(impulse_b.iter()) {
            assert!((sa - sb).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = Biquad::new(FilterType::LowPass, 0.05, 0.707, 0.0);
        filter.process(1.0);
        filter.process(-0.5);
        assert!(!filter.state_is_zero());

        filter.reset();
        assert!(filter.state_is_zero());
    }
}
