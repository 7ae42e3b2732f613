use crate::error::{Error, Result};

use super::signal::AudioSignal;

/// Resample every channel of `signal` to `target_rate`.
///
/// Signals already at the target rate are returned unchanged.
#[cfg(feature = "resample")]
pub fn resample(signal: &AudioSignal, target_rate: u32) -> Result<AudioSignal> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if target_rate == 0 {
        return Err(Error::InvalidConfig("target sample rate must be positive".into()));
    }
    if signal.sample_rate() == target_rate || signal.is_empty() {
        return Ok(signal.clone());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / signal.sample_rate() as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        signal.len(),
        signal.channel_count(),
    )
    .map_err(|e| Error::InvalidConfig(format!("Failed to create resampler: {}", e)))?;

    let input: Vec<Vec<f32>> = (0..signal.channel_count())
        .filter_map(|i| signal.channel(i).map(<[f32]>::to_vec))
        .collect();
    let output = resampler
        .process(&input, None)
        .map_err(|e| Error::Resample(e.to_string()))?;

    log::debug!(
        "Resampled {}Hz -> {}Hz ({} -> {} samples)",
        signal.sample_rate(),
        target_rate,
        signal.len(),
        output.first().map_or(0, Vec::len)
    );

    AudioSignal::new(output, target_rate)
}

#[cfg(not(feature = "resample"))]
pub fn resample(signal: &AudioSignal, target_rate: u32) -> Result<AudioSignal> {
    if signal.sample_rate() == target_rate {
        return Ok(signal.clone());
    }
    Err(Error::InvalidConfig(format!(
        "resampling {}Hz -> {}Hz requires the 'resample' feature. \
         Rebuild with: cargo build --features resample",
        signal.sample_rate(),
        target_rate
    )))
}
