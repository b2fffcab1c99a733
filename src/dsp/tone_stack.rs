//! Tone-shaping chain
//!
//! Aggregates the seven filter stages and two gain ramps that surround the
//! neural model stage, and owns the bypass/position switches that decide
//! where (and whether) the equalizer runs.

use super::biquad::{Biquad, FilterType};
use super::smoother::ExpSmoother;
use crate::params::{db_to_coefficient, percent_to_coefficient, ParamId, ParameterSet};

/// Q factor shared by every fixed-Q stage
pub const COMMON_Q: f32 = 0.707;

/// Depth shelf corner frequency in Hz
const DEPTH_FREQ: f32 = 75.0;

/// Presence shelf corner frequency in Hz
const PRESENCE_FREQ: f32 = 900.0;

/// DC blocker corner frequency in Hz
const DC_BLOCKER_FREQ: f32 = 35.0;

/// Gain ramp time constant in seconds
const GAIN_RAMP_TC: f32 = 1.0;

/// Where the tone chain sits relative to the model stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqPosition {
    #[default]
    Post,
    Pre,
}

/// Behavior of the mid stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MidEqType {
    /// Parametric peak filter within the full shelving chain
    #[default]
    Peak,
    /// Single band-pass voicing that replaces the whole chain
    Bandpass,
}

/// The full tone-shaping state: seven biquads plus the pre/master gain ramps
///
/// Each parameter setter mutates a single underlying filter or smoother;
/// there is no cross-field transaction, so a logical change spanning
/// several controls (e.g. frequency plus gain) is applied one setter at a
/// time, each independently safe.
#[derive(Debug, Clone)]
pub struct ToneStack {
    sample_rate: f32,

    dc_blocker: Biquad,
    in_lpf: Biquad,
    bass: Biquad,
    mid: Biquad,
    treble: Biquad,
    depth: Biquad,
    presence: Biquad,

    pre_gain: ExpSmoother,
    master_gain: ExpSmoother,

    net_bypass: bool,
    eq_bypass: bool,
    eq_pos: EqPosition,
    mid_type: MidEqType,
}

impl Default for ToneStack {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            dc_blocker: Biquad::new(FilterType::HighPass, 0.5, COMMON_Q, 0.0),
            in_lpf: Biquad::new(FilterType::LowPass, 0.5, COMMON_Q, 0.0),
            bass: Biquad::new(FilterType::LowShelf, 0.5, COMMON_Q, 0.0),
            mid: Biquad::new(FilterType::Peak, 0.5, COMMON_Q, 0.0),
            treble: Biquad::new(FilterType::HighShelf, 0.5, COMMON_Q, 0.0),
            depth: Biquad::new(FilterType::HighShelf, 0.5, COMMON_Q, 0.0),
            presence: Biquad::new(FilterType::HighShelf, 0.5, COMMON_Q, 0.0),
            pre_gain: ExpSmoother::new(GAIN_RAMP_TC),
            master_gain: ExpSmoother::new(GAIN_RAMP_TC),
            net_bypass: false,
            eq_bypass: false,
            eq_pos: EqPosition::Post,
            mid_type: MidEqType::Peak,
        }
    }
}

impl ToneStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every stage from the parameter set at a new sample rate
    ///
    /// Only called while processing is inactive; the host guarantees no
    /// concurrent audio callback during a rate change.
    pub fn prepare(&mut self, params: &ParameterSet, sample_rate: f32) {
        self.sample_rate = sample_rate;

        self.dc_blocker.set_fc(DC_BLOCKER_FREQ / sample_rate);

        self.in_lpf
            .set_fc(percent_to_coefficient(params.get(ParamId::InputLpf)) * 0.5);

        self.bass.set_biquad(
            FilterType::LowShelf,
            params.get(ParamId::BassFreq) / sample_rate,
            COMMON_Q,
            params.get(ParamId::BassGain),
        );

        self.mid_type = if params.is_on(ParamId::MidType) {
            MidEqType::Bandpass
        } else {
            MidEqType::Peak
        };
        self.mid.set_biquad(
            match self.mid_type {
                MidEqType::Bandpass => FilterType::BandPass,
                MidEqType::Peak => FilterType::Peak,
            },
            params.get(ParamId::MidFreq) / sample_rate,
            params.get(ParamId::MidQ),
            params.get(ParamId::MidGain),
        );

        self.treble.set_biquad(
            FilterType::HighShelf,
            params.get(ParamId::TrebleFreq) / sample_rate,
            COMMON_Q,
            params.get(ParamId::TrebleGain),
        );

        self.depth.set_biquad(
            FilterType::HighShelf,
            DEPTH_FREQ / sample_rate,
            COMMON_Q,
            params.get(ParamId::Depth),
        );

        self.presence.set_biquad(
            FilterType::HighShelf,
            PRESENCE_FREQ / sample_rate,
            COMMON_Q,
            params.get(ParamId::Presence),
        );

        self.pre_gain.set_sample_rate(sample_rate);
        self.pre_gain
            .set_target(db_to_coefficient(params.get(ParamId::PreGain)));

        self.master_gain.set_sample_rate(sample_rate);
        self.master_gain
            .set_target(db_to_coefficient(params.get(ParamId::MasterGain)));

        self.net_bypass = params.is_on(ParamId::NetBypass);
        self.eq_bypass = params.is_on(ParamId::EqBypass);
        self.eq_pos = if params.is_on(ParamId::EqPosition) {
            EqPosition::Pre
        } else {
            EqPosition::Post
        };
    }

    // Per-parameter setters. Each touches exactly one filter or smoother.

    pub fn set_input_lpf(&mut self, percent: f32) {
        self.in_lpf.set_fc(percent_to_coefficient(percent) * 0.5);
    }

    pub fn set_pre_gain(&mut self, gain_db: f32) {
        self.pre_gain.set_target(db_to_coefficient(gain_db));
    }

    pub fn set_master_gain(&mut self, gain_db: f32) {
        self.master_gain.set_target(db_to_coefficient(gain_db));
    }

    pub fn set_bass_gain(&mut self, gain_db: f32) {
        self.bass.set_peak_gain(gain_db);
    }

    pub fn set_bass_freq(&mut self, freq_hz: f32) {
        self.bass.set_fc(freq_hz / self.sample_rate);
    }

    pub fn set_mid_gain(&mut self, gain_db: f32) {
        self.mid.set_peak_gain(gain_db);
    }

    pub fn set_mid_freq(&mut self, freq_hz: f32) {
        self.mid.set_fc(freq_hz / self.sample_rate);
    }

    pub fn set_mid_q(&mut self, q: f32) {
        self.mid.set_q(q);
    }

    /// Switch the mid stage voicing, recomputing its coefficients from the
    /// retained frequency/Q/gain
    pub fn set_mid_type(&mut self, mid_type: MidEqType) {
        self.mid_type = mid_type;
        self.mid.set_filter_type(match mid_type {
            MidEqType::Bandpass => FilterType::BandPass,
            MidEqType::Peak => FilterType::Peak,
        });
    }

    pub fn set_treble_gain(&mut self, gain_db: f32) {
        self.treble.set_peak_gain(gain_db);
    }

    pub fn set_treble_freq(&mut self, freq_hz: f32) {
        self.treble.set_fc(freq_hz / self.sample_rate);
    }

    pub fn set_depth(&mut self, gain_db: f32) {
        self.depth.set_peak_gain(gain_db);
    }

    pub fn set_presence(&mut self, gain_db: f32) {
        self.presence.set_peak_gain(gain_db);
    }

    pub fn set_net_bypass(&mut self, bypass: bool) {
        self.net_bypass = bypass;
    }

    pub fn set_eq_bypass(&mut self, bypass: bool) {
        self.eq_bypass = bypass;
    }

    pub fn set_eq_position(&mut self, position: EqPosition) {
        self.eq_pos = position;
    }

    pub fn net_bypass(&self) -> bool {
        self.net_bypass
    }

    pub fn eq_bypass(&self) -> bool {
        self.eq_bypass
    }

    pub fn eq_position(&self) -> EqPosition {
        self.eq_pos
    }

    pub fn mid_type(&self) -> MidEqType {
        self.mid_type
    }

    // Block helpers, called by the pipeline in its fixed stage order.

    /// High-frequency roll-off at the chain input
    pub fn apply_input_lpf(&mut self, buffer: &mut [f32]) {
        self.in_lpf.process_block(buffer);
    }

    /// Pre-model gain ramp, one smoother step per sample
    pub fn apply_pre_gain(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.pre_gain.next();
        }
    }

    /// Master gain ramp, one smoother step per sample
    pub fn apply_master_gain(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.master_gain.next();
        }
    }

    /// Unconditional DC removal after the model stage
    pub fn apply_dc_blocker(&mut self, buffer: &mut [f32]) {
        self.dc_blocker.process_block(buffer);
    }

    /// Run the equalizer cascade over the block in place
    ///
    /// In band-pass voicing only the mid filter runs; otherwise the stages
    /// run depth, bass, mid, treble, presence — the fixed order that
    /// reproduces the modeled tone stack's frequency response.
    pub fn apply_tone_controls(&mut self, buffer: &mut [f32]) {
        if self.mid_type == MidEqType::Bandpass {
            self.mid.process_block(buffer);
        } else {
            self.depth.process_block(buffer);
            self.bass.process_block(buffer);
            self.mid.process_block(buffer);
            self.treble.process_block(buffer);
            self.presence.process_block(buffer);
        }
    }

    /// Snap both gain ramps to their targets (activation/reset)
    pub fn clear_gain_ramps(&mut self) {
        self.pre_gain.clear_to_target();
        self.master_gain.clear_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prepared_stack() -> ToneStack {
        let mut tone = ToneStack::new();
        tone.prepare(&ParameterSet::new(), 48000.0);
        tone
    }

    #[test]
    fn test_prepare_sets_gain_targets() {
        let tone = prepared_stack();
        // PREGAIN defaults to -6 dB, MASTER to 0 dB
        assert_relative_eq!(tone.pre_gain.target(), db_to_coefficient(-6.0));
        assert_relative_eq!(tone.master_gain.target(), 1.0);
    }

    #[test]
    fn test_flat_tone_controls_are_transparent() {
        let mut tone = prepared_stack();

        let mut buffer: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let original = buffer.clone();

        // All gains default to 0 dB, so the cascade is the identity
        tone.apply_tone_controls(&mut buffer);

        for (out, inp) in buffer.iter().zip(original.iter()) {
            assert!((out - inp).abs() < 1e-4, "{} vs {}", out, inp);
        }
    }

    #[test]
    fn test_bandpass_mid_type_skips_other_stages() {
        let mut tone = prepared_stack();
        tone.set_mid_type(MidEqType::Bandpass);

        let mut buffer: Vec<f32> = (0..256).map(|i| ((i % 16) as f32 - 8.0) / 8.0).collect();
        tone.apply_tone_controls(&mut buffer);

        // Only the mid filter may have accumulated state
        assert!(tone.bass.state_is_zero());
        assert!(tone.treble.state_is_zero());
        assert!(tone.depth.state_is_zero());
        assert!(tone.presence.state_is_zero());
        assert!(!tone.mid.state_is_zero());
    }

    #[test]
    fn test_mid_type_switch_recomputes_coefficients() {
        let mut tone = prepared_stack();
        assert_eq!(tone.mid.filter_type(), FilterType::Peak);

        tone.set_mid_type(MidEqType::Bandpass);
        assert_eq!(tone.mid.filter_type(), FilterType::BandPass);

        tone.set_mid_type(MidEqType::Peak);
        assert_eq!(tone.mid.filter_type(), FilterType::Peak);
    }

    #[test]
    fn test_pre_gain_ramp_converges() {
        let mut tone = prepared_stack();
        tone.set_pre_gain(0.0);
        tone.clear_gain_ramps();

        let mut buffer = vec![1.0_f32; 64];
        tone.apply_pre_gain(&mut buffer);

        // Ramp already at target: unity everywhere
        for &sample in &buffer {
            assert_relative_eq!(sample, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dc_blocker_removes_offset() {
        let mut tone = prepared_stack();

        let mut buffer = vec![0.5_f32; 48000];
        tone.apply_dc_blocker(&mut buffer);

        // After a second of constant input the output has decayed toward zero
        let tail = &buffer[40000..];
        let mean: f32 = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!(mean.abs() < 0.05, "residual DC {}", mean);
    }

    #[test]
    fn test_bass_boost_raises_low_end() {
        let mut tone = prepared_stack();
        tone.set_bass_gain(8.0);

        let mut low: Vec<f32> = (0..9600)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 48000.0).sin())
            .collect();
        let before: f32 =
            (low.iter().map(|s| s * s).sum::<f32>() / low.len() as f32).sqrt();
        tone.apply_tone_controls(&mut low);
        let after: f32 =
            (low.iter().map(|s| s * s).sum::<f32>() / low.len() as f32).sqrt();

        // 8 dB is ~2.5x
        let gain = after / before;
        assert!(gain > 2.0 && gain < 3.2, "low-end gain {}", gain);
    }
}
