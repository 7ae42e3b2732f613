//! Time-pooled dense head stored as JSON.
//!
//! ```json
//! { "mel_bands": 128, "activation": "sigmoid",
//!   "weights": [[...256 floats...], ...], "bias": [...] }
//! ```
//!
//! Each Mel band is pooled over time into its mean and standard deviation,
//! giving `2 * mel_bands` inputs; every output is `sigmoid(w · x + b)` (or the
//! raw affine value for `linear`).

use std::path::Path;

use ndarray::{ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use super::Model;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DenseModel {
    pub mel_bands: usize,
    #[serde(default)]
    pub activation: Activation,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl DenseModel {
    pub fn from_json(json: &str) -> Result<Self> {
        let model: DenseModel = serde_json::from_str(json)
            .map_err(|e| Error::ModelLoad(format!("invalid model JSON: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn input_len(&self) -> usize {
        self.mel_bands * 2
    }

    pub fn output_len(&self) -> usize {
        self.bias.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.mel_bands == 0 {
            return Err(Error::ModelLoad("mel_bands must be positive".into()));
        }
        if self.weights.len() != self.bias.len() {
            return Err(Error::ModelLoad(format!(
                "{} weight rows but {} biases",
                self.weights.len(),
                self.bias.len()
            )));
        }
        let expected = self.input_len();
        if let Some((i, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != expected)
        {
            return Err(Error::ModelLoad(format!(
                "weight row {} has {} entries, expected {}",
                i,
                row.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Per-band mean followed by per-band standard deviation.
    fn pool(&self, input: &ArrayView3<'_, f32>) -> Vec<f32> {
        let mut pooled = vec![0.0f32; self.input_len()];
        for band in 0..self.mel_bands {
            let lane = input.index_axis(Axis(2), band);
            pooled[band] = lane.mean().unwrap_or(0.0);
            pooled[self.mel_bands + band] = lane.std(0.0);
        }
        pooled
    }
}

impl Model for DenseModel {
    fn predict(&self, input: ArrayView3<'_, f32>) -> Result<Vec<f32>> {
        let (batch, frames, bands) = input.dim();
        if bands != self.mel_bands {
            return Err(Error::ModelInference(format!(
                "model expects {} mel bands, input has {}",
                self.mel_bands, bands
            )));
        }
        if batch * frames == 0 {
            return Err(Error::ModelInference("input tensor has no frames".into()));
        }

        let pooled = self.pool(&input);
        Ok(self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z: f32 = row.iter().zip(&pooled).map(|(w, x)| w * x).sum::<f32>() + b;
                self.activation.apply(z)
            })
            .collect())
    }
}
