//! Decoding engine for still-image input streams.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::InputStreamType;
use crate::context::CanvasContainer;
use crate::error::EngineError;
use crate::events::Topic;
use crate::image_wrapper::ImageWrapper;
use crate::instance::Instance;
use crate::registry::{BarcodeReader, ReaderRegistry, ReaderSpec};
use crate::types::ScanResult;

use super::{source, DecodingEngine, EngineFactory};

/// Tunables for [`FrameEngine`].
#[derive(Debug, Clone)]
pub struct FrameEngineOptions {
    /// Per-frame decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// File extensions picked up in sequence mode
    pub supported_formats: Vec<String>,
}

impl Default for FrameEngineOptions {
    fn default() -> Self {
        Self {
            decode_timeout_ms: 5000,
            supported_formats: ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "pgm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Runs registered readers over one or more still frames.
///
/// Each `start` walks the loaded frames in order, publishing `processed` for
/// every frame and `detected` for frames where a reader succeeded. Pausing
/// keeps the position; a completed pass rewinds so the next `start` replays.
/// Loading new frames cancels any pass still walking the old ones.
pub struct FrameEngine {
    registry: Arc<ReaderRegistry>,
    options: FrameEngineOptions,
    frames: Mutex<Arc<Vec<Arc<ImageWrapper>>>>,
    cursor: Arc<AtomicUsize>,
    /// Bumped whenever a pass is superseded
    generation: Arc<AtomicU64>,
    active: Mutex<Option<Vec<ReaderSpec>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FrameEngine {
    pub fn new(registry: Arc<ReaderRegistry>) -> Self {
        Self::with_options(registry, FrameEngineOptions::default())
    }

    pub fn with_options(registry: Arc<ReaderRegistry>, options: FrameEngineOptions) -> Self {
        Self {
            registry,
            options,
            frames: Mutex::new(Arc::new(Vec::new())),
            cursor: Arc::new(AtomicUsize::new(0)),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Factory producing one engine per instance, all sharing `registry`.
    pub fn factory(registry: Arc<ReaderRegistry>, options: FrameEngineOptions) -> impl EngineFactory {
        move || -> Arc<dyn DecodingEngine> {
            Arc::new(FrameEngine::with_options(registry.clone(), options.clone()))
        }
    }

    /// Number of frames currently loaded.
    pub fn frame_count(&self) -> usize {
        lock(&self.frames).len()
    }

    fn install(&self, instance: &Instance, frames: Vec<ImageWrapper>) {
        self.abort_task();
        if let Some(first) = frames.first() {
            let canvas = CanvasContainer::new(first.width(), first.height());
            instance.with_context(|ctx| ctx.set_canvas_container(canvas));
        }
        *lock(&self.frames) = Arc::new(frames.into_iter().map(Arc::new).collect());
        self.cursor.store(0, Ordering::SeqCst);
    }

    /// Cancel the running pass, if any. A pass mid-step sees the new
    /// generation and publishes nothing further.
    fn abort_task(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl DecodingEngine for FrameEngine {
    fn name(&self) -> &str {
        "frame"
    }

    async fn init_input_stream(&self, instance: &Arc<Instance>) -> Result<(), EngineError> {
        let stream = instance.config().input_stream;
        if stream.stream_type != InputStreamType::ImageStream {
            return Err(EngineError::Unsupported(format!(
                "{:?} input needs a capture backend; only ImageStream is available",
                stream.stream_type
            )));
        }
        let src = stream.src.ok_or_else(|| EngineError::InputStream {
            message: "inputStream.src is required for ImageStream".to_string(),
        })?;

        let frames = source::load_frames(&src, stream.sequence, stream.size, &self.options).await?;
        tracing::debug!("Loaded {} frame(s) from {}", frames.len(), src);
        self.install(instance, frames);
        Ok(())
    }

    fn initialize_data(
        &self,
        instance: &Arc<Instance>,
        image: ImageWrapper,
    ) -> Result<(), EngineError> {
        self.install(instance, vec![image]);
        Ok(())
    }

    fn start(&self, instance: &Arc<Instance>) -> Result<(), EngineError> {
        let frames = lock(&self.frames).clone();
        if frames.is_empty() {
            return Err(EngineError::InputStream {
                message: "no frames loaded".to_string(),
            });
        }
        if self.cursor.load(Ordering::SeqCst) >= frames.len() {
            self.cursor.store(0, Ordering::SeqCst);
        }

        let config = instance.config();
        let specs = lock(&self.active)
            .clone()
            .unwrap_or_else(|| config.decoder.readers.clone());
        let readers = self.registry.select(&specs);
        if readers.is_empty() {
            tracing::warn!("No registered readers selected; frames will not decode");
        }

        self.abort_task();
        let pass = FramePass {
            instance: Arc::downgrade(instance),
            frames,
            cursor: self.cursor.clone(),
            generation: self.generation.clone(),
            id: self.generation.load(Ordering::SeqCst),
            readers,
            delay: config
                .frequency
                .filter(|&fps| fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                *lock(&self.task) = Some(handle.spawn(pass.run()));
            }
            Err(_) => pass.run_blocking(),
        }
        Ok(())
    }

    fn stop(&self, _instance: &Arc<Instance>) {
        self.abort_task();
        self.cursor.store(0, Ordering::SeqCst);
    }

    fn set_readers(&self, readers: &[ReaderSpec]) {
        *lock(&self.active) = Some(readers.to_vec());
    }

    fn register_reader(&self, name: &str, reader: Arc<dyn BarcodeReader>) {
        self.registry.register(name, reader);
    }
}

/// One walk over the loaded frames.
struct FramePass {
    instance: Weak<Instance>,
    frames: Arc<Vec<Arc<ImageWrapper>>>,
    cursor: Arc<AtomicUsize>,
    generation: Arc<AtomicU64>,
    /// Generation this pass belongs to
    id: u64,
    readers: Vec<(Arc<dyn BarcodeReader>, Value)>,
    delay: Option<Duration>,
}

impl FramePass {
    async fn run(self) {
        while self.step() {
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
        }
    }

    fn run_blocking(self) {
        while self.step() {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
        }
    }

    /// Process the frame under the cursor. Returns false when the pass is over.
    fn step(&self) -> bool {
        let Some(instance) = self.instance.upgrade() else {
            return false;
        };
        if instance.is_stopped() || self.is_superseded() {
            return false;
        }
        let index = self.cursor.load(Ordering::SeqCst);
        let Some(frame) = self.frames.get(index) else {
            self.cursor.store(0, Ordering::SeqCst);
            return false;
        };
        self.cursor.store(index + 1, Ordering::SeqCst);
        process_frame(&instance, index, frame, &self.readers);
        index + 1 < self.frames.len()
    }

    fn is_superseded(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.id
    }
}

fn process_frame(
    instance: &Instance,
    index: usize,
    frame: &Arc<ImageWrapper>,
    readers: &[(Arc<dyn BarcodeReader>, Value)],
) {
    let code_result = readers
        .iter()
        .find_map(|(reader, options)| reader.decode(frame, options));

    let collector = instance.with_context(|ctx| {
        ctx.set_canvas_container(CanvasContainer {
            width: frame.width(),
            height: frame.height(),
            frame: Some(frame.clone()),
        });
        ctx.result_collector()
    });
    tracing::trace!(
        "Frame {} ({}x{}) processed, decoded: {}",
        index,
        frame.width(),
        frame.height(),
        code_result.is_some()
    );

    let result = match code_result {
        Some(code) => {
            if let Some(collector) = collector {
                collector.add_result(&code, Some(frame.as_ref()));
            }
            ScanResult::decoded(index, code)
        }
        None => ScanResult::empty(index),
    };

    instance.events().publish(Topic::Processed, &result);
    if result.is_detected() {
        instance.events().publish(Topic::Detected, &result);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
