//! Decoding of the model's prediction vector into named audio features.
//!
//! Decoding is lenient: positions the model did not produce, or produced as
//! NaN/Inf, fall back to fixed defaults instead of failing. A tempo that
//! scales to zero or below also falls back to [`DEFAULT_BPM`].
//! The layout and the BPM scale belong to whichever model is deployed, so
//! both live in [`DecoderConfig`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: f32 = 120.0;
pub const DEFAULT_SCORE: f32 = 0.5;
/// Raw tempo output is a fraction of this maximum tempo.
pub const DEFAULT_BPM_SCALE: f32 = 200.0;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub bpm: f32,
    /// Pitch class, 0 = C .. 11 = B
    pub key: u8,
    /// Mode, 0 = major, 1 = minor
    pub scale: u8,
    pub energy: f32,
    pub danceability: f32,
    pub valence: f32,
    pub arousal: f32,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            key: 0,
            scale: 0,
            energy: DEFAULT_SCORE,
            danceability: DEFAULT_SCORE,
            valence: DEFAULT_SCORE,
            arousal: DEFAULT_SCORE,
        }
    }
}

impl AnalysisResult {
    pub fn key_name(&self) -> &'static str {
        PITCH_CLASSES[(self.key % 12) as usize]
    }

    pub fn scale_name(&self) -> &'static str {
        if self.scale == 0 {
            "major"
        } else {
            "minor"
        }
    }
}

/// Index of each feature in the prediction vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PredictionLayout {
    pub bpm: usize,
    pub key: usize,
    pub scale: usize,
    pub energy: usize,
    pub danceability: usize,
    pub valence: usize,
    pub arousal: usize,
}

impl Default for PredictionLayout {
    fn default() -> Self {
        Self {
            bpm: 0,
            key: 1,
            scale: 2,
            energy: 3,
            danceability: 4,
            valence: 5,
            arousal: 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_bpm_scale")]
    pub bpm_scale: f32,
    #[serde(default)]
    pub layout: PredictionLayout,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            bpm_scale: default_bpm_scale(),
            layout: PredictionLayout::default(),
        }
    }
}

fn default_bpm_scale() -> f32 { DEFAULT_BPM_SCALE }

#[derive(Clone, Debug, Default)]
pub struct ResultDecoder {
    config: DecoderConfig,
}

impl ResultDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, predictions: &[f32]) -> AnalysisResult {
        let layout = &self.config.layout;
        let get = |index: usize| predictions.get(index).copied().filter(|v| v.is_finite());

        let defaults = AnalysisResult::default();
        if predictions.len() <= max_index(layout) {
            log::warn!(
                "Prediction vector has {} values, expected at least {}; using defaults for the rest",
                predictions.len(),
                max_index(layout) + 1
            );
        }

        AnalysisResult {
            bpm: get(layout.bpm)
                .map(|v| v * self.config.bpm_scale)
                .filter(|&bpm| bpm > 0.0)
                .unwrap_or(defaults.bpm),
            key: get(layout.key).map_or(defaults.key, |v| v.round().clamp(0.0, 11.0) as u8),
            scale: get(layout.scale).map_or(defaults.scale, |v| v.round().clamp(0.0, 1.0) as u8),
            energy: get(layout.energy).map_or(defaults.energy, unit),
            danceability: get(layout.danceability).map_or(defaults.danceability, unit),
            valence: get(layout.valence).map_or(defaults.valence, unit),
            arousal: get(layout.arousal).map_or(defaults.arousal, unit),
        }
    }
}

fn unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

fn max_index(layout: &PredictionLayout) -> usize {
    [
        layout.bpm,
        layout.key,
        layout.scale,
        layout.energy,
        layout.danceability,
        layout.valence,
        layout.arousal,
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vector_yields_defaults() {
        let result = ResultDecoder::default().decode(&[]);
        assert_eq!(
            result,
            AnalysisResult {
                bpm: 120.0,
                key: 0,
                scale: 0,
                energy: 0.5,
                danceability: 0.5,
                valence: 0.5,
                arousal: 0.5,
            }
        );
    }

    #[test]
    fn bpm_is_scaled_by_max_tempo() {
        let decoder = ResultDecoder::default();
        assert!((decoder.decode(&[0.6]).bpm - 120.0).abs() < 1e-4);
        for x in [0.05f32, 0.25, 0.5, 0.9, 1.0] {
            assert!((decoder.decode(&[x, 0.0, 0.0]).bpm - x * 200.0).abs() < 1e-4);
        }
    }

    #[test]
    fn non_positive_tempo_falls_back_to_default() {
        let decoder = ResultDecoder::default();
        let result = decoder.decode(&[-0.3, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
        assert!(result.bpm > 0.0);
        assert_eq!(result.bpm, DEFAULT_BPM);
        assert_eq!(decoder.decode(&[0.0]).bpm, DEFAULT_BPM);
    }

    #[test]
    fn full_vector_maps_positions() {
        let result = ResultDecoder::default().decode(&[0.5, 7.0, 1.0, 0.9, 0.8, 0.2, 0.1]);
        assert!((result.bpm - 100.0).abs() < 1e-4);
        assert_eq!(result.key, 7);
        assert_eq!(result.key_name(), "G");
        assert_eq!(result.scale, 1);
        assert_eq!(result.scale_name(), "minor");
        assert_eq!(result.energy, 0.9);
        assert_eq!(result.danceability, 0.8);
        assert_eq!(result.valence, 0.2);
        assert_eq!(result.arousal, 0.1);
    }

    #[test]
    fn partial_vector_fills_the_tail() {
        let result = ResultDecoder::default().decode(&[0.7, 2.0, 0.0, 0.3]);
        assert_eq!(result.key, 2);
        assert_eq!(result.energy, 0.3);
        assert_eq!(result.danceability, 0.5);
        assert_eq!(result.arousal, 0.5);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let result = ResultDecoder::default().decode(&[0.5, 14.2, 3.0, 1.7, -0.4, 0.5, 0.5]);
        assert_eq!(result.key, 11);
        assert_eq!(result.scale, 1);
        assert_eq!(result.energy, 1.0);
        assert_eq!(result.danceability, 0.0);
    }

    #[test]
    fn non_finite_values_use_defaults() {
        let result = ResultDecoder::default().decode(&[f32::NAN, f32::INFINITY, 0.0, f32::NAN]);
        assert_eq!(result.bpm, 120.0);
        assert_eq!(result.key, 0);
        assert_eq!(result.energy, 0.5);
    }

    #[test]
    fn custom_layout_and_scale() {
        let decoder = ResultDecoder::new(DecoderConfig {
            bpm_scale: 250.0,
            layout: PredictionLayout {
                bpm: 6,
                arousal: 0,
                ..PredictionLayout::default()
            },
        });
        let result = decoder.decode(&[0.25, 0.0, 0.0, 0.5, 0.5, 0.5, 0.4]);
        assert!((result.bpm - 100.0).abs() < 1e-4);
        assert_eq!(result.arousal, 0.25);
    }
}
