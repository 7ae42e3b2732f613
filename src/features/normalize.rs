use ndarray::Array3;

use crate::error::{Error, Result};

/// Offset added before the log so silent bands stay finite.
pub const LOG_OFFSET: f32 = 1e-6;
/// Added to the variance before the square root.
pub const VARIANCE_EPSILON: f64 = 1e-8;

/// Log-compress a linear Mel spectrogram and standardize it to zero mean and
/// unit variance. Statistics are computed jointly over every frame and band.
pub fn normalize(mel_linear: &Array3<f32>) -> Result<Array3<f32>> {
    if mel_linear.is_empty() {
        return Err(Error::EmptyInput);
    }

    let log_mel = mel_linear.mapv(|x| (x + LOG_OFFSET).ln());

    let n = log_mel.len() as f64;
    let mean = log_mel.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance = log_mel
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std_dev = (variance + VARIANCE_EPSILON).sqrt();

    log::debug!(
        "Normalizing {} values: mean={:.4}, std={:.4}",
        log_mel.len(),
        mean,
        std_dev
    );

    Ok(log_mel.mapv(|x| ((x as f64 - mean) / std_dev) as f32))
}
