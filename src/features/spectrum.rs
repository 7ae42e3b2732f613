use std::sync::Arc;

use ndarray::Array3;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::frame::FrameSet;
use crate::error::{Error, Result};

/// Non-redundant bins of a real FFT of length `frame_size`.
pub fn num_bins(frame_size: usize) -> usize {
    frame_size / 2 + 1
}

pub fn plan_fft(frame_size: usize) -> Arc<dyn Fft<f32>> {
    let mut planner = FftPlanner::<f32>::new();
    planner.plan_fft_forward(frame_size)
}

/// Power spectrum `(1, frames, frame_size/2 + 1)` of already windowed frames.
pub fn power_spectrum(frames: &FrameSet) -> Result<Array3<f32>> {
    let fft = plan_fft(frames.frame_size());
    power_spectrum_with(frames, fft.as_ref())
}

/// Same as [`power_spectrum`] with a caller-supplied FFT plan.
pub fn power_spectrum_with(frames: &FrameSet, fft: &dyn Fft<f32>) -> Result<Array3<f32>> {
    let frame_size = frames.frame_size();
    if fft.len() != frame_size {
        return Err(Error::DimensionMismatch {
            stage: "fft",
            expected: frame_size,
            actual: fft.len(),
        });
    }

    let bins = num_bins(frame_size);
    let num_frames = frames.num_frames();

    // Frames are independent; each worker owns its buffer and shares the plan.
    let rows: Vec<Vec<f32>> = (0..num_frames)
        .into_par_iter()
        .map(|f| {
            let mut buffer: Vec<Complex<f32>> = frames
                .frame(f)
                .iter()
                .map(|&s| Complex::new(s, 0.0))
                .collect();
            fft.process(&mut buffer);
            buffer[..bins].iter().map(|c| c.norm_sqr()).collect()
        })
        .collect();

    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    let actual = flat.len();
    Array3::from_shape_vec((1, num_frames, bins), flat).map_err(|_| Error::DimensionMismatch {
        stage: "spectrum",
        expected: num_frames * bins,
        actual,
    })
}
