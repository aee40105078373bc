//! Built-in int8 dense-network engine.
//!
//! Runs the fully-connected classifier the power-source model is made of
//! (Dense → ReLU → Dense → ReLU → Dense) directly on int8 tensors, so the
//! firmware needs no interpreter runtime.  The weights arrive as a
//! postcard blob written to NVS by the provisioning tool; the blob carries
//! the schema version checked by [`bind`](super::bind).
//!
//! Per layer, with `xq` the int8 input and `w` the int8 weights:
//!
//! ```text
//! acc[o] = bias[o] + Σ_i (xq[i] - input_zero_point) * w[o][i]      (i64, saturating)
//! y[o]   = clamp(round(acc[o] * multiplier) + output_zero_point)   (i8)
//! y[o]   = max(y[o], output_zero_point)                             if relu
//! ```

use serde::{Deserialize, Serialize};

use super::{InferenceEngine, ModelSchema};
use crate::error::{ConfigFault, InferenceError};
use crate::features::quantizer::{QMAX, QMIN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: u16,
    pub outputs: u16,
    pub input_zero_point: i32,
    pub output_zero_point: i32,
    /// `input_scale * weight_scale / output_scale`.
    pub multiplier: f32,
    pub relu: bool,
    /// Row-major `outputs × inputs`.
    pub weights: Vec<i8>,
    pub bias: Vec<i32>,
}

/// Serialized model as stored in flash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBlob {
    pub version: u32,
    pub layers: Vec<DenseLayer>,
}

impl ModelBlob {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigFault> {
        postcard::to_allocvec(self).map_err(|_| ConfigFault::ModelBlob)
    }

    fn validate(&self) -> Result<(), ConfigFault> {
        let first = self.layers.first().ok_or(ConfigFault::ModelBlob)?;
        let mut width = first.inputs;
        for layer in &self.layers {
            let n_in = usize::from(layer.inputs);
            let n_out = usize::from(layer.outputs);
            if layer.inputs != width
                || n_out == 0
                || layer.weights.len() != n_in * n_out
                || layer.bias.len() != n_out
                || !(QMIN..=QMAX).contains(&layer.input_zero_point)
                || !(QMIN..=QMAX).contains(&layer.output_zero_point)
                || !(layer.multiplier.is_finite() && layer.multiplier > 0.0)
            {
                return Err(ConfigFault::ModelBlob);
            }
            width = layer.outputs;
        }
        Ok(())
    }
}

/// Interpreter for a validated [`ModelBlob`].
#[derive(Debug, Clone)]
pub struct DenseModel {
    blob: ModelBlob,
    scratch_in: Vec<i8>,
    scratch_out: Vec<i8>,
}

impl DenseModel {
    pub fn new(blob: ModelBlob) -> Result<Self, ConfigFault> {
        blob.validate()?;
        let widest = blob
            .layers
            .iter()
            .map(|l| usize::from(l.inputs.max(l.outputs)))
            .max()
            .unwrap_or(0);
        Ok(Self {
            blob,
            scratch_in: vec![0; widest],
            scratch_out: vec![0; widest],
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigFault> {
        let blob: ModelBlob = postcard::from_bytes(bytes).map_err(|_| ConfigFault::ModelBlob)?;
        Self::new(blob)
    }
}

fn run_layer(layer: &DenseLayer, input: &[i8], output: &mut [i8]) {
    let n_in = usize::from(layer.inputs);
    for (o, out) in output.iter_mut().enumerate() {
        let row = &layer.weights[o * n_in..(o + 1) * n_in];
        let acc = row
            .iter()
            .zip(input)
            .fold(i64::from(layer.bias[o]), |acc, (&w, &x)| {
                let term = (i64::from(x) - i64::from(layer.input_zero_point)) * i64::from(w);
                acc.saturating_add(term)
            });
        // Saturating float-to-int cast; the clamp below bounds the result.
        let scaled = (acc as f32 * layer.multiplier).round() as i32;
        let mut y = scaled.saturating_add(layer.output_zero_point);
        if layer.relu {
            y = y.max(layer.output_zero_point);
        }
        *out = y.clamp(QMIN, QMAX) as i8;
    }
}

impl InferenceEngine for DenseModel {
    fn schema(&self) -> ModelSchema {
        let first = &self.blob.layers[0];
        let last = &self.blob.layers[self.blob.layers.len() - 1];
        ModelSchema {
            version: self.blob.version,
            input_len: usize::from(first.inputs),
            output_len: usize::from(last.outputs),
        }
    }

    fn invoke(&mut self, input: &[i8], output: &mut [i8]) -> Result<(), InferenceError> {
        let schema = self.schema();
        if input.len() != schema.input_len || output.len() != schema.output_len {
            return Err(InferenceError::BufferLength);
        }

        self.scratch_in[..input.len()].copy_from_slice(input);
        let mut width = input.len();
        for layer in &self.blob.layers {
            let n_out = usize::from(layer.outputs);
            run_layer(layer, &self.scratch_in[..width], &mut self.scratch_out[..n_out]);
            core::mem::swap(&mut self.scratch_in, &mut self.scratch_out);
            width = n_out;
        }
        output.copy_from_slice(&self.scratch_in[..width]);
        Ok(())
    }
}
