use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{DenseModel, Model, ModelLoader};
use crate::error::{Error, Result};

/// Where a model artifact lives: a local file or an HTTP(S) URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    Path(PathBuf),
    Url(String),
}

impl ModelSource {
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            ModelSource::Url(input.to_string())
        } else {
            ModelSource::Path(PathBuf::from(input))
        }
    }

    /// Resolve to a local file, downloading URL sources into `cache_dir`
    /// (or the default cache) on first use.
    pub fn resolve(&self, cache_dir: Option<&Path>) -> Result<PathBuf> {
        match self {
            ModelSource::Path(path) => {
                if !path.exists() {
                    return Err(Error::ModelLoad(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                log::info!("Using model from path: {}", path.display());
                Ok(path.clone())
            }
            ModelSource::Url(url) => {
                let dir = match cache_dir {
                    Some(dir) => dir.to_path_buf(),
                    None => model_cache_dir()?,
                };
                std::fs::create_dir_all(&dir).map_err(|e| {
                    Error::ModelLoad(format!(
                        "failed to create model cache dir {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                let cached_path = dir.join(cache_file_name(url));

                if cached_path.exists() {
                    log::info!("Using cached model: {}", cached_path.display());
                    return Ok(cached_path);
                }

                log::info!("Downloading model from {}...", url);
                download_model(url, &cached_path)?;
                log::info!("Model saved to {}", cached_path.display());
                Ok(cached_path)
            }
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Url(url) => f.write_str(url),
        }
    }
}

/// Loads a [`DenseModel`] artifact from a [`ModelSource`].
#[derive(Clone, Debug)]
pub struct DenseModelLoader {
    pub source: ModelSource,
    pub cache_dir: Option<PathBuf>,
}

impl DenseModelLoader {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            cache_dir: None,
        }
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }
}

impl ModelLoader for DenseModelLoader {
    fn load(&self) -> Result<Box<dyn Model>> {
        let path = self.source.resolve(self.cache_dir.as_deref())?;
        let model = DenseModel::load(&path)?;
        log::info!(
            "Loaded dense model: {} bands -> {} outputs ({:?})",
            model.mel_bands,
            model.output_len(),
            model.activation
        );
        Ok(Box::new(model))
    }
}

fn model_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| Error::ModelLoad("cannot determine cache directory".into()))?;
    Ok(base.join("melscope").join("models"))
}

/// Last path segment of the URL without query or fragment, or `model.json`.
fn cache_file_name(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    trimmed
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .unwrap_or("model.json")
        .to_string()
}

fn download_model(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::ModelLoad(format!("failed to download {}: {}", url, e)))?;

    let mut body = Vec::new();
    response
        .read_to_end(&mut body)
        .map_err(|e| Error::ModelLoad(format!("failed to read response from {}: {}", url, e)))?;

    store_download(&body, dest)
}

/// Write `body` next to `dest` and move it into place, so only complete
/// downloads ever appear under the cached name.
fn store_download(body: &[u8], dest: &Path) -> Result<()> {
    let partial = dest.with_extension("part");
    std::fs::write(&partial, body).map_err(|e| {
        Error::ModelLoad(format!("failed to write {}: {}", partial.display(), e))
    })?;
    std::fs::rename(&partial, dest).map_err(|e| {
        Error::ModelLoad(format!(
            "failed to move {} to {}: {}",
            partial.display(),
            dest.display(),
            e
        ))
    })
}
