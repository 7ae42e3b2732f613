//! Triangular Mel filter bank.
//!
//! Filters are spaced evenly on the HTK Mel scale between 0 Hz and Nyquist.
//! The bank depends only on `(sample_rate, frame_size, mel_bands)` and is
//! cached by the pipeline under that key.

use ndarray::{Array2, Array3, ArrayView2, Axis};

use super::spectrum::num_bins;
use crate::error::{Error, Result};

pub fn mel_from_hz(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn hz_from_mel(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

#[derive(Clone, Debug)]
pub struct MelFilterBank {
    sample_rate: u32,
    frame_size: usize,
    /// `(mel_bands, frame_size/2 + 1)`
    weights: Array2<f32>,
}

impl MelFilterBank {
    pub fn build(sample_rate: u32, frame_size: usize, mel_bands: usize) -> Result<Self> {
        if sample_rate == 0 || frame_size == 0 || mel_bands == 0 {
            return Err(Error::InvalidConfig(format!(
                "mel filter bank needs positive sample_rate, frame_size and mel_bands \
                 (got {}, {}, {})",
                sample_rate, frame_size, mel_bands
            )));
        }

        let bins = num_bins(frame_size);
        let mel_min = mel_from_hz(0.0);
        let mel_max = mel_from_hz(sample_rate as f64 / 2.0);
        let points = mel_bands + 2;
        let step = (mel_max - mel_min) / (points - 1) as f64;

        let bin_points: Vec<usize> = (0..points)
            .map(|i| {
                let hz = hz_from_mel(mel_min + step * i as f64);
                (hz * frame_size as f64 / sample_rate as f64 + 0.5).floor().max(0.0) as usize
            })
            .collect();

        let mut weights = Array2::<f32>::zeros((mel_bands, bins));
        for (band, mut row) in weights.axis_iter_mut(Axis(0)).enumerate() {
            let left = bin_points[band];
            let center = bin_points[band + 1];
            let right = bin_points[band + 2];

            if center > left {
                for j in left..center.min(bins) {
                    row[j] = (j - left) as f32 / (center - left) as f32;
                }
            }
            if right > center {
                for j in center..right.min(bins) {
                    row[j] = (right - j) as f32 / (right - center) as f32;
                }
            }
            // Collapsed edges leave a single-bin spike at the center.
            if (left == center || center == right) && center < bins {
                row[center] = 1.0;
            }
        }

        log::debug!(
            "Built mel filter bank: {} bands x {} bins ({}Hz, N={})",
            mel_bands,
            bins,
            sample_rate,
            frame_size
        );

        Ok(Self {
            sample_rate,
            frame_size,
            weights,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn mel_bands(&self) -> usize {
        self.weights.nrows()
    }

    pub fn num_bins(&self) -> usize {
        self.weights.ncols()
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    /// Project a power spectrum `(batch, frames, bins)` onto the bank,
    /// giving `(batch, frames, mel_bands)`.
    pub fn project(&self, power: &Array3<f32>) -> Result<Array3<f32>> {
        let (batch, frames, bins) = power.dim();
        if bins != self.num_bins() {
            return Err(Error::DimensionMismatch {
                stage: "mel projection",
                expected: self.num_bins(),
                actual: bins,
            });
        }

        let mut out = Array3::<f32>::zeros((batch, frames, self.mel_bands()));
        for (spectra, mut mel) in power.outer_iter().zip(out.outer_iter_mut()) {
            mel.assign(&spectra.dot(&self.weights.t()));
        }
        Ok(out)
    }
}
