//! Model document parsing
//!
//! The on-disk model description: a JSON object carrying the input shape,
//! optional skip/gain attributes, and a layer list whose type sequence
//! identifies the architecture. Any rejection here happens before
//! construction, so a bad document can never disturb the active model.

use serde::Deserialize;
use serde_json::Value;

use super::network::{DenseLayer, DynamicModel, GruCell, LstmCell, Network};
use crate::error::{NeurampError, Result};
use crate::params::db_to_coefficient;

/// Parsed model file, prior to validation
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDocument {
    /// Input tensor shape; the last element is the per-step input width
    #[serde(default)]
    pub in_shape: Option<Vec<Option<i64>>>,

    /// 1 when the model was trained with the dry input added to the output
    #[serde(default)]
    pub in_skip: Option<i64>,

    /// Output gain in dB
    #[serde(default)]
    pub out_gain: Option<f32>,

    #[serde(default)]
    pub layers: Vec<LayerDocument>,
}

/// One layer entry in the document
#[derive(Debug, Clone, Deserialize)]
pub struct LayerDocument {
    #[serde(rename = "type")]
    pub layer_type: String,

    #[serde(default)]
    pub shape: Value,

    /// Weight arrays in keras dump order
    #[serde(default)]
    pub weights: Vec<Value>,
}

impl ModelDocument {
    /// Validate the document and construct the model it describes
    pub fn build(&self) -> Result<DynamicModel> {
        let input_skip = match self.in_skip {
            Some(value) if value > 1 => {
                return Err(NeurampError::UnsupportedInputSkip { value });
            }
            Some(value) => value != 0,
            None => false,
        };

        let output_gain = self.out_gain.map_or(1.0, db_to_coefficient);

        let width = self
            .in_shape
            .as_ref()
            .and_then(|shape| shape.last().copied())
            .flatten()
            .ok_or(NeurampError::MissingInputShape)?;
        if width > 1 {
            return Err(NeurampError::UnsupportedInputWidth { width });
        }

        let network = self.detect_network()?;

        Ok(DynamicModel {
            network,
            input_skip,
            output_gain,
        })
    }

    /// Identify the architecture from the layer-type sequence and
    /// construct it from the document's weights
    fn detect_network(&self) -> Result<Network> {
        let kinds: Vec<String> = self
            .layers
            .iter()
            .map(|layer| layer.layer_type.to_ascii_lowercase())
            .collect();
        let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();

        match kinds.as_slice() {
            ["lstm", "dense"] => {
                let [kernel, recurrent, bias] = recurrent_weights(&self.layers[0])?;
                let cell = LstmCell::new(matrix(&kernel)?, matrix(&recurrent)?, vector(&bias)?)?;
                let head = dense_head(&self.layers[1])?;
                check_head_width(head.input_size(), cell.hidden_size())?;
                Ok(Network::LstmDense { cell, head })
            }
            ["gru", "dense"] => {
                let [kernel, recurrent, bias] = recurrent_weights(&self.layers[0])?;
                let cell = GruCell::new(matrix(&kernel)?, matrix(&recurrent)?, matrix(&bias)?)?;
                let head = dense_head(&self.layers[1])?;
                check_head_width(head.input_size(), cell.hidden_size())?;
                Ok(Network::GruDense { cell, head })
            }
            _ => Err(NeurampError::UnknownArchitecture),
        }
    }
}

fn recurrent_weights(layer: &LayerDocument) -> Result<[Value; 3]> {
    if layer.weights.len() != 3 {
        return Err(NeurampError::MalformedWeights {
            reason: format!(
                "{} layer has {} weight arrays, expected kernel/recurrent/bias",
                layer.layer_type,
                layer.weights.len()
            ),
        });
    }
    let mut weights = layer.weights.iter().cloned();
    Ok([
        weights.next().unwrap_or_default(),
        weights.next().unwrap_or_default(),
        weights.next().unwrap_or_default(),
    ])
}

fn dense_head(layer: &LayerDocument) -> Result<DenseLayer> {
    if layer.weights.len() != 2 {
        return Err(NeurampError::MalformedWeights {
            reason: format!(
                "dense layer has {} weight arrays, expected kernel/bias",
                layer.weights.len()
            ),
        });
    }
    DenseLayer::new(matrix(&layer.weights[0])?, vector(&layer.weights[1])?)
}

fn check_head_width(head_inputs: usize, hidden_size: usize) -> Result<()> {
    if head_inputs != hidden_size {
        return Err(NeurampError::MalformedWeights {
            reason: format!(
                "dense head expects {} inputs but the cell produces {}",
                head_inputs, hidden_size
            ),
        });
    }
    Ok(())
}

fn matrix(value: &Value) -> Result<Vec<Vec<f32>>> {
    serde_json::from_value(value.clone()).map_err(|e| NeurampError::MalformedWeights {
        reason: format!("expected a 2D float array: {}", e),
    })
}

fn vector(value: &Value) -> Result<Vec<f32>> {
    serde_json::from_value(value.clone()).map_err(|e| NeurampError::MalformedWeights {
        reason: format!("expected a 1D float array: {}", e),
    })
}
