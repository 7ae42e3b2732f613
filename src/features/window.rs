use ndarray::{ArrayView1, Axis};

use super::frame::FrameSet;
use crate::error::{Error, Result};

/// Precomputed Hann coefficients for one frame size.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    coefficients: Vec<f32>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}

/// Symmetric Hann window: `0.5 * (1 - cos(2πi / (N - 1)))`.
pub fn hann_window(size: usize) -> Window {
    let coefficients = if size == 1 {
        vec![1.0]
    } else {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64;
                (0.5 * (1.0 - phase.cos())) as f32
            })
            .collect()
    };
    Window { coefficients }
}

/// Multiply every frame element-wise by `window`.
pub fn apply_window(frames: &FrameSet, window: &Window) -> Result<FrameSet> {
    if frames.frame_size() != window.len() {
        return Err(Error::DimensionMismatch {
            stage: "window",
            expected: frames.frame_size(),
            actual: window.len(),
        });
    }
    let coefficients = ArrayView1::from(window.coefficients()).insert_axis(Axis(0));
    let windowed = frames.as_array() * &coefficients;
    Ok(FrameSet::from_parts(windowed, frames.hop_size()))
}
