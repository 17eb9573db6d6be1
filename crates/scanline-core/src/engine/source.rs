//! Still-image input streams: frame discovery and loading with a timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::ImageReader;
use tokio::time::timeout;
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::image_wrapper::ImageWrapper;

use super::FrameEngineOptions;

/// Load every frame `src` describes.
///
/// A single image unless `sequence` is set, in which case `src` names a
/// directory whose supported images form the stream in path order.
pub(crate) async fn load_frames(
    src: &str,
    sequence: bool,
    size: Option<u32>,
    options: &FrameEngineOptions,
) -> Result<Vec<ImageWrapper>, EngineError> {
    let root = PathBuf::from(src);
    let paths = if sequence {
        discover(&root, &options.supported_formats)
    } else {
        vec![root.clone()]
    };

    if paths.is_empty() {
        return Err(EngineError::InputStream {
            message: format!("no supported images found in {}", root.display()),
        });
    }

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        frames.push(load_frame(path, size, options.decode_timeout_ms).await?);
    }
    Ok(frames)
}

/// Decode one image off the async runtime, bounded by `timeout_ms`.
pub(crate) async fn load_frame(
    path: PathBuf,
    size: Option<u32>,
    timeout_ms: u64,
) -> Result<ImageWrapper, EngineError> {
    if !path.is_file() {
        return Err(EngineError::InputStream {
            message: format!("image not found: {}", path.display()),
        });
    }

    let blocking_path = path.clone();
    let decoded = timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(move || decode_sync(&blocking_path, size)),
    )
    .await;

    match decoded {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(EngineError::Decode {
            path,
            message: format!("Task join error: {}", e),
        }),
        Err(_) => Err(EngineError::Timeout { path, timeout_ms }),
    }
}

fn decode_sync(path: &Path, size: Option<u32>) -> Result<ImageWrapper, EngineError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| EngineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot open image: {}", e),
        })?;
    let image = reader.decode().map_err(|e| EngineError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(match size {
        Some(max_side) => ImageWrapper::from_dynamic_scaled(&image, max_side),
        None => ImageWrapper::from_dynamic(&image),
    })
}

/// Supported image files under `dir`, sorted by path.
fn discover(dir: &Path, supported: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_supported(path, supported))
        .collect();

    files.sort();
    files
}

fn is_supported(path: &Path, supported: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| supported.iter().any(|fmt| fmt.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
