use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error(
        "model {name} not found at {path} or in {cache}; export one with \
         `yolo export model=yolov8n.pt format=onnx` or pass --model-url"
    )]
    NotFound {
        name: String,
        path: PathBuf,
        cache: PathBuf,
    },
    #[error("model path {0} has no file name")]
    NoFileName(PathBuf),
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `(bytes_downloaded, total_bytes)`; total is 0 without a Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates the detection model.
///
/// Looks at `model` as given, then for a file of the same name in the model
/// cache, then downloads `url` into the cache if one was supplied.
pub fn resolve(
    model: &Path,
    url: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if model.is_file() {
        return Ok(model.to_path_buf());
    }
    resolve_in(&model_cache_dir()?, model, url, progress)
}

fn resolve_in(
    cache_dir: &Path,
    model: &Path,
    url: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if model.is_file() {
        return Ok(model.to_path_buf());
    }
    let name = model
        .file_name()
        .ok_or_else(|| ModelResolveError::NoFileName(model.to_path_buf()))?;
    let cached = cache_dir.join(name);
    if cached.is_file() {
        log::info!("Using cached model {}", cached.display());
        return Ok(cached);
    }

    let Some(url) = url else {
        return Err(ModelResolveError::NotFound {
            name: name.to_string_lossy().into_owned(),
            path: model.to_path_buf(),
            cache: cache_dir.to_path_buf(),
        });
    };

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading model from {url}");
    download(url, &cached, progress)?;
    Ok(cached)
}

/// Per-user model cache: `Tripwire/models` under the platform data dir on
/// macOS and the cache dir elsewhere.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    let base = if cfg!(target_os = "macos") {
        dirs::data_dir()
    } else {
        dirs::cache_dir()
    };
    base.map(|d| d.join("Tripwire").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` to `<dest>.part` and renames it into place. The partial
/// file is removed on failure.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = stream_to(url, &part, progress).and_then(|()| {
        fs::rename(&part, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn stream_to(url: &str, part: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: part.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let total = response.content_length().unwrap_or(0);

    let mut file = fs::File::create(part).map_err(write_err)?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        written += n as u64;
        if let Some(cb) = &progress {
            cb(written, total);
        }
    }
    file.flush().map_err(write_err)
}
