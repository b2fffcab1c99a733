//! Per-block processing pipeline
//!
//! Orchestrates the tone stack and the active neural model into the fixed
//! stage order, and owns the parameter dispatch that keeps each host
//! control wired to exactly one filter or smoother mutation.

use std::sync::Arc;

use crate::dsp::{EqPosition, MidEqType, ToneStack};
use crate::model::{ModelLoader, ModelSlot};
use crate::params::{ParamId, ParameterSet};

/// The real-time processing core
///
/// `process` runs once per audio block under a hard deadline: bounded
/// loops only, no allocation, no blocking, no lock shared with any other
/// thread. Everything else here (parameter setters, activation, sample-
/// rate changes) is control-path work the host serializes against the
/// callback.
#[derive(Debug)]
pub struct AudioPipeline {
    tone: ToneStack,
    params: ParameterSet,
    slot: Arc<ModelSlot>,
    sample_rate: f32,
}

impl AudioPipeline {
    /// Create a pipeline with all parameters at their table defaults
    pub fn new(sample_rate: f32) -> Self {
        let params = ParameterSet::new();
        let mut tone = ToneStack::new();
        tone.prepare(&params, sample_rate);

        Self {
            tone,
            params,
            slot: Arc::new(ModelSlot::new()),
            sample_rate,
        }
    }

    /// Hand out a loader sharing this pipeline's active-model slot
    ///
    /// The loader may be moved to any control thread; publication and
    /// reclamation never block the audio thread.
    pub fn loader(&self) -> ModelLoader {
        ModelLoader::new(Arc::clone(&self.slot))
    }

    /// Whether a model is currently active
    pub fn has_model(&self) -> bool {
        self.slot.has_active()
    }

    /// Current value of a parameter
    pub fn parameter(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Store a parameter value and apply its single mutation
    ///
    /// Safe to call from the audio thread or a control thread, but there
    /// is no cross-parameter transaction: a logical change spanning
    /// several controls (say, mid frequency plus gain) should land before
    /// the next `process` call to avoid a block on half-updated
    /// coefficients.
    pub fn set_parameter(&mut self, id: ParamId, value: f32) {
        self.params.set(id, value);

        match id {
            ParamId::InputLpf => self.tone.set_input_lpf(value),
            ParamId::PreGain => self.tone.set_pre_gain(value),
            ParamId::NetBypass => self.tone.set_net_bypass(value > 0.5),
            ParamId::EqBypass => self.tone.set_eq_bypass(value > 0.5),
            ParamId::EqPosition => self.tone.set_eq_position(if value > 0.5 {
                EqPosition::Pre
            } else {
                EqPosition::Post
            }),
            ParamId::BassGain => self.tone.set_bass_gain(value),
            ParamId::BassFreq => self.tone.set_bass_freq(value),
            ParamId::MidGain => self.tone.set_mid_gain(value),
            ParamId::MidFreq => self.tone.set_mid_freq(value),
            ParamId::MidQ => self.tone.set_mid_q(value),
            ParamId::MidType => self.tone.set_mid_type(if value > 0.5 {
                MidEqType::Bandpass
            } else {
                MidEqType::Peak
            }),
            ParamId::TrebleGain => self.tone.set_treble_gain(value),
            ParamId::TrebleFreq => self.tone.set_treble_freq(value),
            ParamId::Depth => self.tone.set_depth(value),
            ParamId::Presence => self.tone.set_presence(value),
            ParamId::MasterGain => self.tone.set_master_gain(value),
            // Stored state only; consumed by the cabinet convolution stage
            // and the host wrapper, both outside this core.
            ParamId::CabSimBypass | ParamId::GlobalBypass => {}
        }
    }

    /// Prepare for processing after (re)activation
    ///
    /// Snaps both gain ramps to their targets — no glide from a stale
    /// value — and resets the active model's recurrent state to its zero
    /// baseline.
    pub fn activate(&mut self) {
        self.tone.clear_gain_ramps();
        self.slot.reset_active();
    }

    /// Honor a sample-rate change
    ///
    /// Only valid while deactivated; the host guarantees no concurrent
    /// audio callback, so every coefficient is recomputed here without
    /// further synchronization.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.tone.prepare(&self.params, sample_rate);
    }

    /// Process one channel's block in place
    pub fn process(&mut self, buffer: &mut [f32]) {
        // High frequencies roll-off (lowpass)
        self.tone.apply_input_lpf(buffer);

        // Pre-gain
        self.tone.apply_pre_gain(buffer);

        // Equalizer section
        if !self.tone.eq_bypass() && self.tone.eq_position() == EqPosition::Pre {
            self.tone.apply_tone_controls(buffer);
        }

        if !self.tone.net_bypass() {
            self.slot.process_active(buffer);
        }

        // DC blocker filter (highpass)
        self.tone.apply_dc_blocker(buffer);

        // Equalizer section
        if !self.tone.eq_bypass() && self.tone.eq_position() == EqPosition::Post {
            self.tone.apply_tone_controls(buffer);
        }

        // Master volume
        self.tone.apply_master_gain(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::db_to_coefficient;

    fn sine(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    #[test]
    fn test_flat_pipeline_applies_gain_product() {
        let mut pipeline = AudioPipeline::new(48000.0);
        pipeline.set_parameter(ParamId::InputLpf, 99.0);
        pipeline.set_parameter(ParamId::PreGain, -6.0);
        pipeline.set_parameter(ParamId::MasterGain, -3.0);
        pipeline.activate();

        // 1 kHz is far from the DC blocker and the (nearly open) input LPF
        let input = sine(1000.0, 48000.0, 9600);
        let mut output = input.clone();
        pipeline.process(&mut output);

        let expected = db_to_coefficient(-6.0) * db_to_coefficient(-3.0);
        let measured = rms(&output) / rms(&input);
        assert!(
            (measured - expected).abs() < 0.02,
            "expected {:.4}, measured {:.4}",
            expected,
            measured
        );
    }

    #[test]
    fn test_no_model_means_no_model_stage() {
        let mut pipeline = AudioPipeline::new(48000.0);
        assert!(!pipeline.has_model());

        let mut buffer = sine(440.0, 48000.0, 512);
        // Processing an empty slot must not panic or alter the stage order
        pipeline.process(&mut buffer);
    }

    #[test]
    fn test_parameter_round_trip() {
        let mut pipeline = AudioPipeline::new(48000.0);
        assert_eq!(pipeline.parameter(ParamId::MidFreq), 750.0);

        pipeline.set_parameter(ParamId::MidFreq, 1200.0);
        assert_eq!(pipeline.parameter(ParamId::MidFreq), 1200.0);
    }

    #[test]
    fn test_sample_rate_change_keeps_parameters() {
        let mut pipeline = AudioPipeline::new(48000.0);
        pipeline.set_parameter(ParamId::BassGain, 4.0);

        pipeline.set_sample_rate(96000.0);
        assert_eq!(pipeline.sample_rate(), 96000.0);
        assert_eq!(pipeline.parameter(ParamId::BassGain), 4.0);
    }

    #[test]
    fn test_activation_clears_gain_ramps() {
        let mut pipeline = AudioPipeline::new(48000.0);
        pipeline.set_parameter(ParamId::PreGain, 0.0);
        pipeline.set_parameter(ParamId::MasterGain, 0.0);
        pipeline.set_parameter(ParamId::InputLpf, 99.0);
        pipeline.activate();

        // With both ramps already at unity, a mid-band sine passes at
        // unity gain immediately, not after a one-second glide.
        let input = sine(1000.0, 48000.0, 4800);
        let mut output = input.clone();
        pipeline.process(&mut output);

        let gain = rms(&output) / rms(&input);
        assert!((gain - 1.0).abs() < 0.02, "gain {}", gain);
    }
}
