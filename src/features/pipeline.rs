use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use ndarray::Array3;
use rustfft::Fft;
use serde::Deserialize;

use super::frame::frame;
use super::mel::MelFilterBank;
use super::normalize::normalize;
use super::spectrum::{plan_fft, power_spectrum_with};
use super::window::{apply_window, hann_window, Window};
use crate::audio::AudioSignal;
use crate::error::{Error, Result};

/// Framing and Mel parameters for one extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_mel_bands")]
    pub mel_bands: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            hop_length: default_hop_length(),
            mel_bands: default_mel_bands(),
        }
    }
}

pub fn default_frame_size() -> usize { 2048 }
pub fn default_hop_length() -> usize { 512 }
pub fn default_mel_bands() -> usize { 128 }

/// Insert-once memo table. Values are immutable after insertion and handed
/// out as `Arc`s, so readers never hold the lock while computing.
struct Memo<K, V: ?Sized> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Copy, V: ?Sized> Memo<K, V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_try_insert(&self, key: K, build: impl FnOnce() -> Result<Arc<V>>) -> Result<Arc<V>> {
        if let Ok(entries) = self.entries.read() {
            if let Some(value) = entries.get(&key) {
                return Ok(Arc::clone(value));
            }
        }
        let value = build()?;
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(Arc::clone(entries.entry(key).or_insert(value)))
    }

    fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// Turns an [`AudioSignal`] into the normalized log-Mel tensor
/// `(1, frames, mel_bands)` consumed by the model.
///
/// Windows, FFT plans and filter banks depend only on configuration and are
/// memoized here; every other tensor is allocated per call.
pub struct FeatureExtractor {
    config: FeatureConfig,
    windows: Memo<usize, Window>,
    plans: Memo<usize, dyn Fft<f32>>,
    filter_banks: Memo<(u32, usize, usize), MelFilterBank>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        if config.frame_size == 0 || config.mel_bands == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame_size and mel_bands must be positive (got {}, {})",
                config.frame_size, config.mel_bands
            )));
        }
        if config.hop_length == 0 || config.hop_length > config.frame_size {
            return Err(Error::InvalidConfig(format!(
                "hop_length must be in 1..={}, got {}",
                config.frame_size, config.hop_length
            )));
        }
        Ok(Self {
            config,
            windows: Memo::new(),
            plans: Memo::new(),
            filter_banks: Memo::new(),
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Number of frames `extract` will produce for `len` samples.
    pub fn frames_for(&self, len: usize) -> usize {
        super::frame::frame_count(len, self.config.frame_size, self.config.hop_length)
    }

    pub fn window(&self) -> Result<Arc<Window>> {
        let size = self.config.frame_size;
        self.windows
            .get_or_try_insert(size, || Ok(Arc::new(hann_window(size))))
    }

    pub fn filter_bank(&self, sample_rate: u32) -> Result<Arc<MelFilterBank>> {
        let FeatureConfig {
            frame_size,
            mel_bands,
            ..
        } = self.config;
        self.filter_banks
            .get_or_try_insert((sample_rate, frame_size, mel_bands), || {
                MelFilterBank::build(sample_rate, frame_size, mel_bands).map(Arc::new)
            })
    }

    fn fft_plan(&self) -> Result<Arc<dyn Fft<f32>>> {
        let size = self.config.frame_size;
        self.plans.get_or_try_insert(size, || Ok(plan_fft(size)))
    }

    /// Run framing, windowing, power spectrum, Mel projection and
    /// normalization over channel 0 of `signal`.
    pub fn extract(&self, signal: &AudioSignal) -> Result<Array3<f32>> {
        let samples = signal.primary()?;
        let FeatureConfig {
            frame_size,
            hop_length,
            mel_bands,
        } = self.config;

        let frames = frame(samples, frame_size, hop_length)?;
        log::debug!(
            "Framed {} samples into {} frames (N={}, hop={})",
            samples.len(),
            frames.num_frames(),
            frame_size,
            hop_length
        );

        let window = self.window()?;
        let windowed = apply_window(&frames, &window)?;
        drop(frames);

        let power = power_spectrum_with(&windowed, self.fft_plan()?.as_ref())?;
        drop(windowed);

        let bank = self.filter_bank(signal.sample_rate())?;
        let mel = bank.project(&power)?;
        drop(power);

        let normalized = normalize(&mel)?;
        let num_frames = normalized.dim().1;

        normalized
            .into_shape_with_order((1, num_frames, mel_bands))
            .map_err(|_| Error::DimensionMismatch {
                stage: "reshape",
                expected: mel_bands,
                actual: mel.dim().2,
            })
    }

    /// Number of filter banks currently memoized.
    pub fn cached_filter_banks(&self) -> usize {
        self.filter_banks.len()
    }

    pub fn clear_caches(&self) {
        self.windows.clear();
        self.plans.clear();
        self.filter_banks.clear();
    }
}
