mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use cli::Cli;
use melscope::config::{self, Config};
use melscope::features::pipeline::{default_frame_size, default_hop_length, default_mel_bands};
use melscope::result::DEFAULT_BPM_SCALE;
use melscope::{AnalysisResult, AudioAnalyzer, DenseModelLoader, Model, ModelSource};

#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisResult>,
    /// Shape of the feature tensor, `[1, frames, mel_bands]`
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<[usize; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
}

impl FileReport {
    fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            duration_secs: None,
            analysis: None,
            features: None,
            error: None,
            error_kind: None,
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("Failed to load config from {}: {}", path.display(), err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    apply_cli(&cli, &mut cfg);

    let analyzer_config = cfg.analyzer_config();
    log::info!(
        "Features: frame {} hop {} mel bands {}",
        analyzer_config.features.frame_size,
        analyzer_config.features.hop_length,
        analyzer_config.features.mel_bands
    );

    let analyzer = if cli.features_only {
        AudioAnalyzer::new(analyzer_config, || -> melscope::Result<Box<dyn Model>> {
            Err(melscope::Error::ModelLoad("no model in feature-only mode".into()))
        })?
    } else {
        let source = cfg.model.source.as_deref().context(
            "No model given. Pass --model, set [model] source in the config, or use --features-only",
        )?;
        let mut loader = DenseModelLoader::new(ModelSource::parse(source));
        if let Some(dir) = cfg.model.cache_dir.clone() {
            loader = loader.with_cache_dir(dir);
        }
        let mut analyzer = AudioAnalyzer::new(analyzer_config, loader)?;
        analyzer
            .initialize()
            .context("Failed to initialize analysis engine")?;
        analyzer
    };

    let pb = ProgressBar::new(cli.inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let reports: Vec<FileReport> = cli
        .inputs
        .par_iter()
        .map(|path| {
            let report = process_file(&analyzer, path, cli.features_only);
            pb.inc(1);
            report
        })
        .collect();
    pb.finish_and_clear();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    let mut analyzer = analyzer;
    analyzer.dispose();

    let failed = reports.iter().filter(|r| r.failed()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, reports.len());
    }
    Ok(())
}

/// Flags left at their defaults keep the config file's value.
fn apply_cli(cli: &Cli, cfg: &mut Config) {
    if cli.frame_size != default_frame_size() {
        cfg.features.frame_size = cli.frame_size;
    }
    if cli.hop_length != default_hop_length() {
        cfg.features.hop_length = cli.hop_length;
    }
    if cli.mel_bands != default_mel_bands() {
        cfg.features.mel_bands = cli.mel_bands;
    }
    if cli.bpm_scale != DEFAULT_BPM_SCALE {
        cfg.decoder.bpm_scale = cli.bpm_scale;
    }
    if cli.mixdown {
        cfg.input.mixdown = true;
    }
    if cli.sample_rate.is_some() {
        cfg.input.sample_rate = cli.sample_rate;
    }
    if cli.model.is_some() {
        cfg.model.source = cli.model.clone();
    }
    if cli.cache_dir.is_some() {
        cfg.model.cache_dir = cli.cache_dir.clone();
    }
}

fn process_file(analyzer: &AudioAnalyzer, path: &Path, features_only: bool) -> FileReport {
    let mut report = FileReport::new(path);
    if let Err(err) = run_file(analyzer, path, features_only, &mut report) {
        let kind = classify(&err);
        log::error!("{} ({} error): {:#}", path.display(), kind, err);
        report.error = Some(format!("{:#}", err));
        report.error_kind = Some(kind);
    }
    report
}

fn run_file(
    analyzer: &AudioAnalyzer,
    path: &Path,
    features_only: bool,
    report: &mut FileReport,
) -> Result<()> {
    let signal = melscope::audio::decode_audio(path)?;
    report.duration_secs = Some(signal.duration_secs());
    log::debug!(
        "{}: {} channels, {} Hz, {:.2}s",
        path.display(),
        signal.channel_count(),
        signal.sample_rate(),
        signal.duration_secs()
    );
    if features_only {
        let (batch, frames, bands) = analyzer.features(&signal)?.dim();
        report.features = Some([batch, frames, bands]);
    } else {
        report.analysis = Some(analyzer.analyze(&signal)?);
    }
    Ok(())
}

fn classify(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<melscope::Error>() {
        Some(e) if e.is_data_error() => "data",
        Some(e) if e.is_engine_error() => "engine",
        Some(_) => "pipeline",
        None => "decode",
    }
}

fn print_report(report: &FileReport) {
    let name = report.file.display();
    if let Some(ref err) = report.error {
        println!("{}: error: {}", name, err);
    } else if let Some(ref r) = report.analysis {
        println!(
            "{}: {:.1} BPM, {} {}, energy {:.2}, danceability {:.2}, valence {:.2}, arousal {:.2}",
            name,
            r.bpm,
            r.key_name(),
            r.scale_name(),
            r.energy,
            r.danceability,
            r.valence,
            r.arousal
        );
    } else if let Some([_, frames, bands]) = report.features {
        println!(
            "{}: {} frames x {} mel bands ({:.2}s)",
            name,
            frames,
            bands,
            report.duration_secs.unwrap_or(0.0)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_only_non_default_flags() {
        let mut cfg: Config = toml::from_str(
            "[features]\nmel_bands = 64\nhop_length = 256\n[model]\nsource = \"cfg.json\"\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["melscope", "--hop-length", "1024", "--mixdown", "a.wav"]);
        apply_cli(&cli, &mut cfg);
        assert_eq!(cfg.features.mel_bands, 64);
        assert_eq!(cfg.features.hop_length, 1024);
        assert!(cfg.input.mixdown);
        assert_eq!(cfg.model.source.as_deref(), Some("cfg.json"));

        let cli = Cli::parse_from(["melscope", "--model", "cli.json", "a.wav"]);
        apply_cli(&cli, &mut cfg);
        assert_eq!(cfg.model.source.as_deref(), Some("cli.json"));
    }

    #[test]
    fn errors_are_classified_by_kind() {
        let data = anyhow::Error::from(melscope::Error::EmptyInput);
        assert_eq!(classify(&data), "data");
        let engine = anyhow::Error::from(melscope::Error::NotInitialized);
        assert_eq!(classify(&engine), "engine");
        assert_eq!(classify(&anyhow::anyhow!("bad header")), "decode");
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let analyzer = AudioAnalyzer::new(
            melscope::AnalyzerConfig::default(),
            || -> melscope::Result<Box<dyn Model>> {
                Err(melscope::Error::ModelLoad("unused".into()))
            },
        )
        .unwrap();
        let report = process_file(&analyzer, Path::new("/no/such/file.wav"), true);
        assert!(report.failed());
        assert_eq!(report.error_kind, Some("decode"));
    }
}
