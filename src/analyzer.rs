//! Analysis engine lifecycle: `initialize`, `analyze`, `dispose`.

use std::borrow::Cow;

use ndarray::Array3;

use crate::audio::{resample, AudioSignal};
use crate::error::{Error, Result};
use crate::features::{FeatureConfig, FeatureExtractor};
use crate::model::{Model, ModelLoader};
use crate::result::{AnalysisResult, DecoderConfig, ResultDecoder};

/// Frames in the zero tensor pushed through the model during warm-up.
pub const DEFAULT_WARMUP_FRAMES: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    pub features: FeatureConfig,
    pub decoder: DecoderConfig,
    /// Frames in the warm-up tensor; 0 skips warm-up.
    pub warmup_frames: usize,
    /// Resample input to this rate before extraction.
    pub sample_rate: Option<u32>,
    /// Average all channels instead of taking channel 0.
    pub mixdown: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            decoder: DecoderConfig::default(),
            warmup_frames: DEFAULT_WARMUP_FRAMES,
            sample_rate: None,
            mixdown: false,
        }
    }
}

pub struct AudioAnalyzer {
    config: AnalyzerConfig,
    extractor: FeatureExtractor,
    decoder: ResultDecoder,
    loader: Box<dyn ModelLoader>,
    model: Option<Box<dyn Model>>,
}

impl AudioAnalyzer {
    pub fn new(config: AnalyzerConfig, loader: impl ModelLoader + 'static) -> Result<Self> {
        let extractor = FeatureExtractor::new(config.features)?;
        let decoder = ResultDecoder::new(config.decoder);
        Ok(Self {
            config,
            extractor,
            decoder,
            loader: Box::new(loader),
            model: None,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Load the model and run one warm-up prediction. Calling this again on
    /// an initialized analyzer does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }

        let model = self.loader.load()?;

        if self.config.warmup_frames > 0 {
            let warmup = Array3::<f32>::zeros((
                1,
                self.config.warmup_frames,
                self.config.features.mel_bands,
            ));
            let out = model.predict(warmup.view())?;
            log::debug!("Warm-up prediction returned {} values", out.len());
        }

        self.model = Some(model);
        log::info!("Analysis engine initialized");
        Ok(())
    }

    /// Apply the configured mixdown and resampling to `signal`.
    pub fn prepare<'a>(&self, signal: &'a AudioSignal) -> Result<Cow<'a, AudioSignal>> {
        let mut prepared = Cow::Borrowed(signal);
        if self.config.mixdown && signal.channel_count() > 1 {
            prepared = Cow::Owned(prepared.mixdown());
        }
        if let Some(rate) = self.config.sample_rate {
            if prepared.sample_rate() != rate {
                prepared = Cow::Owned(resample(&prepared, rate)?);
            }
        }
        Ok(prepared)
    }

    /// The model-input tensor for `signal`. Does not need the model.
    pub fn features(&self, signal: &AudioSignal) -> Result<Array3<f32>> {
        let prepared = self.prepare(signal)?;
        self.extractor.extract(&prepared)
    }

    pub fn analyze(&self, signal: &AudioSignal) -> Result<AnalysisResult> {
        let model = self.model.as_ref().ok_or(Error::NotInitialized)?;

        let tensor = self.features(signal)?;
        log::debug!("Feature tensor {:?}", tensor.dim());

        let predictions = model.predict(tensor.view())?;
        drop(tensor);

        Ok(self.decoder.decode(&predictions))
    }

    /// Release the model and every memoized table. The analyzer can be
    /// initialized again afterwards.
    pub fn dispose(&mut self) {
        if self.model.take().is_some() {
            log::info!("Analysis engine disposed");
        }
        self.extractor.clear_caches();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a fixed vector and records every input shape it sees.
    struct FixedModel {
        output: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl Model for FixedModel {
        fn predict(&self, _input: ArrayView3<'_, f32>) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FailingModel;

    impl Model for FailingModel {
        fn predict(&self, _input: ArrayView3<'_, f32>) -> Result<Vec<f32>> {
            Err(Error::ModelInference("backend crashed".into()))
        }
    }

    fn small_config() -> AnalyzerConfig {
        AnalyzerConfig {
            features: FeatureConfig {
                frame_size: 256,
                hop_length: 128,
                mel_bands: 16,
            },
            warmup_frames: 4,
            ..AnalyzerConfig::default()
        }
    }

    fn fixed_loader(
        output: Vec<f32>,
        loads: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    ) -> impl ModelLoader {
        move || -> Result<Box<dyn Model>> {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedModel {
                output: output.clone(),
                calls: Arc::clone(&calls),
            }))
        }
    }

    fn tone(len: usize, sample_rate: u32) -> AudioSignal {
        let samples = (0..len).map(|i| (i as f32 * 0.05).sin()).collect();
        AudioSignal::from_mono(samples, sample_rate).unwrap()
    }

    #[test]
    fn analyze_before_initialize_fails() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer =
            AudioAnalyzer::new(small_config(), fixed_loader(vec![], loads, calls)).unwrap();
        let err = analyzer.analyze(&tone(1024, 8000)).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        assert!(err.is_engine_error());
    }

    #[test]
    fn initialize_loads_once_and_warms_up() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut analyzer = AudioAnalyzer::new(
            small_config(),
            fixed_loader(vec![0.6], Arc::clone(&loads), Arc::clone(&calls)),
        )
        .unwrap();

        analyzer.initialize().unwrap();
        analyzer.initialize().unwrap();
        assert!(analyzer.is_initialized());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn analyze_decodes_model_output() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut analyzer = AudioAnalyzer::new(
            small_config(),
            fixed_loader(vec![0.6, 9.0, 1.0, 0.7], loads, Arc::clone(&calls)),
        )
        .unwrap();
        analyzer.initialize().unwrap();

        let result = analyzer.analyze(&tone(2048, 8000)).unwrap();
        assert!((result.bpm - 120.0).abs() < 1e-4);
        assert_eq!(result.key, 9);
        assert_eq!(result.scale, 1);
        assert_eq!(result.energy, 0.7);
        assert_eq!(result.valence, 0.5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn short_audio_is_a_data_error() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut analyzer =
            AudioAnalyzer::new(small_config(), fixed_loader(vec![], loads, calls)).unwrap();
        analyzer.initialize().unwrap();
        let err = analyzer.analyze(&tone(100, 8000)).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
        assert!(err.is_data_error());
    }

    #[test]
    fn inference_errors_propagate_unchanged() {
        let config = AnalyzerConfig {
            warmup_frames: 0,
            ..small_config()
        };
        let mut analyzer = AudioAnalyzer::new(config, || -> Result<Box<dyn Model>> {
            Ok(Box::new(FailingModel))
        })
        .unwrap();
        analyzer.initialize().unwrap();
        let err = analyzer.analyze(&tone(1024, 8000)).unwrap_err();
        assert!(matches!(err, Error::ModelInference(ref msg) if msg == "backend crashed"));
    }

    #[test]
    fn failing_warmup_leaves_engine_uninitialized() {
        let mut analyzer = AudioAnalyzer::new(small_config(), || -> Result<Box<dyn Model>> {
            Ok(Box::new(FailingModel))
        })
        .unwrap();
        assert!(analyzer.initialize().is_err());
        assert!(!analyzer.is_initialized());
    }

    #[test]
    fn load_failure_surfaces() {
        let mut analyzer = AudioAnalyzer::new(small_config(), || -> Result<Box<dyn Model>> {
            Err(Error::ModelLoad("no such model".into()))
        })
        .unwrap();
        assert!(matches!(analyzer.initialize(), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn dispose_allows_reinitialization() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut analyzer = AudioAnalyzer::new(
            small_config(),
            fixed_loader(vec![0.5], Arc::clone(&loads), calls),
        )
        .unwrap();
        analyzer.initialize().unwrap();
        analyzer.analyze(&tone(1024, 8000)).unwrap();

        analyzer.dispose();
        assert!(!analyzer.is_initialized());
        assert!(matches!(
            analyzer.analyze(&tone(1024, 8000)),
            Err(Error::NotInitialized)
        ));

        analyzer.initialize().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn features_do_not_need_a_model() {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer =
            AudioAnalyzer::new(small_config(), fixed_loader(vec![], Arc::clone(&loads), calls))
                .unwrap();
        let tensor = analyzer.features(&tone(1024, 8000)).unwrap();
        assert_eq!(tensor.dim(), (1, 7, 16));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mixdown_uses_all_channels() {
        let config = AnalyzerConfig {
            mixdown: true,
            ..small_config()
        };
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = AudioAnalyzer::new(config, fixed_loader(vec![], loads, calls)).unwrap();

        let left = tone(1024, 8000);
        let silent = vec![0.0f32; 1024];
        let stereo =
            AudioSignal::new(vec![left.primary().unwrap().to_vec(), silent], 8000).unwrap();
        let prepared = analyzer.prepare(&stereo).unwrap();
        assert_eq!(prepared.channel_count(), 1);
        let expected: Vec<f32> = left.primary().unwrap().iter().map(|s| s / 2.0).collect();
        assert_eq!(prepared.primary().unwrap(), expected.as_slice());
    }
}
