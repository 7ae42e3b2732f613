use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analyzer::{AnalyzerConfig, DEFAULT_WARMUP_FRAMES};
use crate::error::{Error, Result};
use crate::features::FeatureConfig;
use crate::result::DecoderConfig;

const CONFIG_FILE: &str = "melscope.toml";

/// On-disk configuration (`melscope.toml`).
///
/// ```toml
/// [features]
/// frame_size = 2048
/// hop_length = 512
/// mel_bands = 128
///
/// [input]
/// sample_rate = 44100
/// mixdown = true
///
/// [model]
/// source = "https://example.com/models/audio.json"
/// warmup_frames = 100
///
/// [decoder]
/// bpm_scale = 200.0
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub mixdown: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: None,
            cache_dir: None,
            warmup_frames: default_warmup_frames(),
        }
    }
}

fn default_warmup_frames() -> usize { DEFAULT_WARMUP_FRAMES }

impl Config {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            features: self.features,
            decoder: self.decoder,
            warmup_frames: self.model.warmup_frames,
            sample_rate: self.input.sample_rate,
            mixdown: self.input.mixdown,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))
}

/// Explicit path, else `./melscope.toml`, `~/.config/melscope/config.toml`,
/// or the platform config directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("melscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("melscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
