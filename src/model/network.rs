//! Neural network architectures
//!
//! The closed set of inference networks the loader can instantiate, plus
//! the [`DynamicModel`] wrapper that carries the input-skip flag and output
//! gain alongside the network itself.
//!
//! All weight layouts follow the keras JSON dumps these models are trained
//! in: recurrent kernels are stored row-per-hidden-unit with the gates
//! concatenated along the column axis.

use crate::error::{NeurampError, Result};

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Single-layer LSTM cell with one input sample per step
///
/// Gate order along the concatenated axis is keras': input, forget,
/// candidate, output.
#[derive(Debug, Clone)]
pub struct LstmCell {
    hidden_size: usize,
    /// Input kernel, `4H` (input width is 1)
    w: Vec<f32>,
    /// Recurrent kernel, `H` rows of `4H`
    u: Vec<Vec<f32>>,
    /// Bias, `4H`
    bias: Vec<f32>,
    /// Hidden state, `H`
    h: Vec<f32>,
    /// Cell state, `H`
    c: Vec<f32>,
    /// Gate pre-activations, `4H`; allocated once so `forward` never does
    scratch: Vec<f32>,
}

impl LstmCell {
    /// Build a cell from keras-layout weights, validating shapes
    pub fn new(kernel: Vec<Vec<f32>>, recurrent: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        if bias.is_empty() || bias.len() % 4 != 0 {
            return Err(NeurampError::MalformedWeights {
                reason: format!("LSTM bias length {} is not a multiple of 4", bias.len()),
            });
        }
        let hidden_size = bias.len() / 4;

        if kernel.len() != 1 || kernel[0].len() != 4 * hidden_size {
            return Err(NeurampError::MalformedWeights {
                reason: format!(
                    "LSTM kernel shape {}x{} does not match 1x{}",
                    kernel.len(),
                    kernel.first().map_or(0, Vec::len),
                    4 * hidden_size
                ),
            });
        }
        if recurrent.len() != hidden_size
            || recurrent.iter().any(|row| row.len() != 4 * hidden_size)
        {
            return Err(NeurampError::MalformedWeights {
                reason: format!(
                    "LSTM recurrent kernel does not match {}x{}",
                    hidden_size,
                    4 * hidden_size
                ),
            });
        }

        let w = kernel.into_iter().next().unwrap_or_default();
        Ok(Self {
            hidden_size,
            w,
            u: recurrent,
            bias,
            h: vec![0.0; hidden_size],
            c: vec![0.0; hidden_size],
            scratch: vec![0.0; 4 * hidden_size],
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Advance one step and return the new hidden state
    pub fn forward(&mut self, x: f32) -> &[f32] {
        let hs = self.hidden_size;

        for (g, acts) in self.scratch.iter_mut().enumerate() {
            *acts = self.w[g] * x + self.bias[g];
        }
        for (k, row) in self.u.iter().enumerate() {
            let hk = self.h[k];
            for (g, acts) in self.scratch.iter_mut().enumerate() {
                *acts += row[g] * hk;
            }
        }

        for j in 0..hs {
            let i = sigmoid(self.scratch[j]);
            let f = sigmoid(self.scratch[hs + j]);
            let g = self.scratch[2 * hs + j].tanh();
            let o = sigmoid(self.scratch[3 * hs + j]);

            self.c[j] = f * self.c[j] + i * g;
            self.h[j] = o * self.c[j].tanh();
        }

        &self.h
    }

    /// Zero the recurrent baseline
    pub fn reset(&mut self) {
        self.h.iter_mut().for_each(|v| *v = 0.0);
        self.c.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Single-layer GRU cell with one input sample per step
///
/// Keras reset-after formulation: gate order update, reset, candidate,
/// with separate input and recurrent bias rows.
#[derive(Debug, Clone)]
pub struct GruCell {
    hidden_size: usize,
    /// Input kernel, `3H`
    w: Vec<f32>,
    /// Recurrent kernel, `H` rows of `3H`
    u: Vec<Vec<f32>>,
    /// Input bias, `3H`
    bias_input: Vec<f32>,
    /// Recurrent bias, `3H`
    bias_recurrent: Vec<f32>,
    /// Hidden state, `H`
    h: Vec<f32>,
    /// Input-side pre-activations, `3H`
    scratch_in: Vec<f32>,
    /// Recurrent-side pre-activations, `3H`
    scratch_rec: Vec<f32>,
}

impl GruCell {
    /// Build a cell from keras-layout weights, validating shapes
    pub fn new(kernel: Vec<Vec<f32>>, recurrent: Vec<Vec<f32>>, bias: Vec<Vec<f32>>) -> Result<Self> {
        if bias.len() != 2 || bias[0].len() != bias[1].len() {
            return Err(NeurampError::MalformedWeights {
                reason: "GRU bias must hold two equal-length rows".to_string(),
            });
        }
        let stacked = bias[0].len();
        if stacked == 0 || stacked % 3 != 0 {
            return Err(NeurampError::MalformedWeights {
                reason: format!("GRU bias row length {} is not a multiple of 3", stacked),
            });
        }
        let hidden_size = stacked / 3;

        if kernel.len() != 1 || kernel[0].len() != 3 * hidden_size {
            return Err(NeurampError::MalformedWeights {
                reason: format!(
                    "GRU kernel shape {}x{} does not match 1x{}",
                    kernel.len(),
                    kernel.first().map_or(0, Vec::len),
                    3 * hidden_size
                ),
            });
        }
        if recurrent.len() != hidden_size
            || recurrent.iter().any(|row| row.len() != 3 * hidden_size)
        {
            return Err(NeurampError::MalformedWeights {
                reason: format!(
                    "GRU recurrent kernel does not match {}x{}",
                    hidden_size,
                    3 * hidden_size
                ),
            });
        }

        let mut bias = bias.into_iter();
        let bias_input = bias.next().unwrap_or_default();
        let bias_recurrent = bias.next().unwrap_or_default();
        let w = kernel.into_iter().next().unwrap_or_default();
        Ok(Self {
            hidden_size,
            w,
            u: recurrent,
            bias_input,
            bias_recurrent,
            h: vec![0.0; hidden_size],
            scratch_in: vec![0.0; 3 * hidden_size],
            scratch_rec: vec![0.0; 3 * hidden_size],
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Advance one step and return the new hidden state
    pub fn forward(&mut self, x: f32) -> &[f32] {
        let hs = self.hidden_size;

        for (g, acts) in self.scratch_in.iter_mut().enumerate() {
            *acts = self.w[g] * x + self.bias_input[g];
        }
        for (g, acts) in self.scratch_rec.iter_mut().enumerate() {
            *acts = self.bias_recurrent[g];
        }
        for (k, row) in self.u.iter().enumerate() {
            let hk = self.h[k];
            for (g, acts) in self.scratch_rec.iter_mut().enumerate() {
                *acts += row[g] * hk;
            }
        }

        for j in 0..hs {
            let z = sigmoid(self.scratch_in[j] + self.scratch_rec[j]);
            let r = sigmoid(self.scratch_in[hs + j] + self.scratch_rec[hs + j]);
            let n = (self.scratch_in[2 * hs + j] + r * self.scratch_rec[2 * hs + j]).tanh();

            self.h[j] = z * self.h[j] + (1.0 - z) * n;
        }

        &self.h
    }

    /// Zero the recurrent baseline
    pub fn reset(&mut self) {
        self.h.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Dense head collapsing the hidden state to one output sample
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Vec<f32>,
    bias: f32,
}

impl DenseLayer {
    /// Build the head from keras-layout weights (`H x 1` kernel, length-1 bias)
    pub fn new(kernel: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        if bias.len() != 1 {
            return Err(NeurampError::MalformedWeights {
                reason: format!("dense bias length {} is not 1", bias.len()),
            });
        }
        if kernel.is_empty() || kernel.iter().any(|row| row.len() != 1) {
            return Err(NeurampError::MalformedWeights {
                reason: "dense kernel must be Hx1".to_string(),
            });
        }

        Ok(Self {
            weights: kernel.into_iter().map(|row| row[0]).collect(),
            bias: bias[0],
        })
    }

    /// Expected hidden-state width
    pub fn input_size(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn forward(&self, hidden: &[f32]) -> f32 {
        self.weights
            .iter()
            .zip(hidden.iter())
            .map(|(w, h)| w * h)
            .sum::<f32>()
            + self.bias
    }
}

/// The closed set of supported network architectures
///
/// Each variant owns its layer weights and hidden state. `WideInput`
/// stands in for architectures whose input window is wider than one
/// sample: they are recognized as a distinct case but not yet executed —
/// processing them is a silent no-op, not an error.
#[derive(Debug, Clone)]
pub enum Network {
    LstmDense { cell: LstmCell, head: DenseLayer },
    GruDense { cell: GruCell, head: DenseLayer },
    WideInput { input_size: usize },
}

impl Network {
    /// Samples of input consumed per step
    pub fn input_size(&self) -> usize {
        match self {
            Network::LstmDense { .. } | Network::GruDense { .. } => 1,
            Network::WideInput { input_size } => *input_size,
        }
    }

    /// Zero all recurrent state
    pub fn reset(&mut self) {
        match self {
            Network::LstmDense { cell, .. } => cell.reset(),
            Network::GruDense { cell, .. } => cell.reset(),
            Network::WideInput { .. } => {}
        }
    }
}

/// A fully constructed inference model
///
/// Created once from a parsed document and never partially mutated; the
/// active instance is owned by the [`ModelSlot`](super::ModelSlot) and
/// freed only after being superseded and confirmed unused.
#[derive(Debug, Clone)]
pub struct DynamicModel {
    pub network: Network,
    /// The network was trained with the dry input added to its output
    pub input_skip: bool,
    /// Linear gain applied after inference
    pub output_gain: f32,
}

impl DynamicModel {
    /// Run inference over the block in place
    ///
    /// The architecture variant is resolved once, outside the per-sample
    /// loop, so the hot loop carries no dispatch.
    pub fn apply(&mut self, buffer: &mut [f32]) {
        let output_gain = self.output_gain;

        match &mut self.network {
            Network::LstmDense { cell, head } => {
                if self.input_skip {
                    for sample in buffer.iter_mut() {
                        *sample += head.forward(cell.forward(*sample)) * output_gain;
                    }
                } else {
                    for sample in buffer.iter_mut() {
                        *sample = head.forward(cell.forward(*sample)) * output_gain;
                    }
                }
            }
            Network::GruDense { cell, head } => {
                if self.input_skip {
                    for sample in buffer.iter_mut() {
                        *sample += head.forward(cell.forward(*sample)) * output_gain;
                    }
                } else {
                    for sample in buffer.iter_mut() {
                        *sample = head.forward(cell.forward(*sample)) * output_gain;
                    }
                }
            }
            // Multi-sample input windows are recognized but not processed
            Network::WideInput { .. } => {}
        }
    }

    /// Zero the network's recurrent state
    pub fn reset(&mut self) {
        self.network.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn zero_lstm(hidden: usize, dense_bias: f32) -> DynamicModel {
        let cell = LstmCell::new(
            vec![vec![0.0; 4 * hidden]],
            vec![vec![0.0; 4 * hidden]; hidden],
            vec![0.0; 4 * hidden],
        )
        .unwrap();
        let head = DenseLayer::new(vec![vec![0.0]; hidden], vec![dense_bias]).unwrap();
        DynamicModel {
            network: Network::LstmDense { cell, head },
            input_skip: false,
            output_gain: 1.0,
        }
    }

    #[test]
    fn test_zero_weight_lstm_outputs_dense_bias() {
        // With all-zero weights the hidden state stays at zero, so the
        // output is exactly the dense bias.
        let mut model = zero_lstm(4, 0.5);
        let mut buffer = vec![0.3_f32, -0.7, 1.0, 0.0];
        model.apply(&mut buffer);
        for &sample in &buffer {
            assert_relative_eq!(sample, 0.5);
        }
    }

    #[test]
    fn test_input_skip_adds_to_dry_signal() {
        let mut model = zero_lstm(4, 0.5);
        model.input_skip = true;
        model.output_gain = 2.0;

        let mut buffer = vec![0.3_f32, -0.7];
        model.apply(&mut buffer);
        assert_relative_eq!(buffer[0], 0.3 + 0.5 * 2.0);
        assert_relative_eq!(buffer[1], -0.7 + 0.5 * 2.0);
    }

    #[test]
    fn test_output_gain_scales_replacement_output() {
        let mut model = zero_lstm(2, 1.0);
        model.output_gain = 0.25;

        let mut buffer = vec![0.9_f32; 8];
        model.apply(&mut buffer);
        for &sample in &buffer {
            assert_relative_eq!(sample, 0.25);
        }
    }

    #[test]
    fn test_lstm_forward_known_values() {
        // One hidden unit, handpicked weights: i/f/g/o pre-activations are
        // w*x + b with zero recurrent contribution on the first step.
        let cell = LstmCell::new(
            vec![vec![1.0, 1.0, 1.0, 1.0]],
            vec![vec![0.0, 0.0, 0.0, 0.0]],
            vec![0.0, 0.0, 0.0, 0.0],
        );
        let mut cell = cell.unwrap();

        let h = cell.forward(1.0);
        // i = o = f = sigmoid(1), g = tanh(1), c = i*g, h = o*tanh(c)
        let sig1 = 1.0 / (1.0 + (-1.0_f32).exp());
        let c = sig1 * 1.0_f32.tanh();
        let expected = sig1 * c.tanh();
        assert_relative_eq!(h[0], expected, epsilon = 1e-6);
    }

    #[test]
    fn test_gru_forward_known_values() {
        let mut cell = GruCell::new(
            vec![vec![1.0, 1.0, 1.0]],
            vec![vec![0.0, 0.0, 0.0]],
            vec![vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0]],
        )
        .unwrap();

        let h = cell.forward(1.0);
        // z = r = sigmoid(1), n = tanh(1 + r*0), h = z*0 + (1-z)*n
        let sig1 = 1.0 / (1.0 + (-1.0_f32).exp());
        let expected = (1.0 - sig1) * 1.0_f32.tanh();
        assert_relative_eq!(h[0], expected, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_restores_zero_baseline() {
        let mut cell = LstmCell::new(
            vec![vec![0.5; 8]],
            vec![vec![0.1; 8]; 2],
            vec![0.2; 8],
        )
        .unwrap();

        let first = cell.forward(0.7).to_vec();
        cell.forward(0.7);
        cell.reset();
        let after_reset = cell.forward(0.7).to_vec();

        for (a, b) in first.iter().zip(after_reset.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_wide_input_is_a_no_op() {
        let mut model = DynamicModel {
            network: Network::WideInput { input_size: 16 },
            input_skip: false,
            output_gain: 3.0,
        };

        let mut buffer = vec![0.1_f32, 0.2, 0.3];
        let original = buffer.clone();
        model.apply(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_shape_validation_rejects_mismatch() {
        // Recurrent kernel for the wrong hidden size
        let err = LstmCell::new(
            vec![vec![0.0; 8]],
            vec![vec![0.0; 8]; 3],
            vec![0.0; 8],
        );
        assert!(err.is_err());

        let err = DenseLayer::new(vec![vec![0.0, 0.0]], vec![0.0]);
        assert!(err.is_err());
    }
}
