use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "melscope", about = "Log-Mel feature extraction and audio analysis")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Model JSON file or http(s) URL
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory for downloaded models
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Samples per analysis frame (FFT size)
    #[arg(long, default_value_t = 2048)]
    pub frame_size: usize,

    /// Samples between consecutive frame starts
    #[arg(long, default_value_t = 512)]
    pub hop_length: usize,

    /// Number of Mel bands
    #[arg(long, default_value_t = 128)]
    pub mel_bands: usize,

    /// Resample input to this rate before extraction (needs the `resample` feature)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Average all channels instead of analyzing the first one
    #[arg(long)]
    pub mixdown: bool,

    /// Tempo corresponding to a raw model output of 1.0
    #[arg(long, default_value_t = 200.0)]
    pub bpm_scale: f32,

    /// Only compute the feature tensor; no model is loaded
    #[arg(long)]
    pub features_only: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (default: ./melscope.toml, then ~/.config/melscope/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
