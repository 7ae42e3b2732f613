//! melscope - log-Mel feature extraction and model-driven audio analysis
//!
//! A decoded signal is framed, Hann-windowed, transformed to a power
//! spectrum, projected onto a Mel filter bank and standardized into a
//! `(1, frames, mel_bands)` tensor. A [`Model`] maps that tensor to a
//! prediction vector, which [`ResultDecoder`] turns into an
//! [`AnalysisResult`] (tempo, key, mode, energy, danceability, valence,
//! arousal).
//!
//! ```no_run
//! use melscope::{AnalyzerConfig, AudioAnalyzer, DenseModelLoader, ModelSource};
//!
//! # fn main() -> anyhow::Result<()> {
//! let loader = DenseModelLoader::new(ModelSource::parse("models/audio.json"));
//! let mut analyzer = AudioAnalyzer::new(AnalyzerConfig::default(), loader)?;
//! analyzer.initialize()?;
//!
//! let signal = melscope::audio::decode_audio("track.flac".as_ref())?;
//! let result = analyzer.analyze(&signal)?;
//! println!("{:.1} BPM, {} {}", result.bpm, result.key_name(), result.scale_name());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod audio;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod result;

pub use analyzer::{AnalyzerConfig, AudioAnalyzer};
pub use audio::AudioSignal;
pub use error::{Error, Result};
pub use features::{FeatureConfig, FeatureExtractor};
pub use model::source::DenseModelLoader;
pub use model::{Model, ModelLoader, ModelSource};
pub use result::{AnalysisResult, DecoderConfig, ResultDecoder};
