//! Scanline Core - session orchestration for barcode scanning engines.
//!
//! Scanline sits on top of a decoding engine and owns everything around it:
//! configuration resolution, instance lifecycle, result events, reader and
//! collector registration, and a one-shot "decode this image" workflow.
//! Image processing and symbology decoding belong to the engine and the
//! readers registered with it.
//!
//! # Architecture
//!
//! ```text
//! Scanner ── default Instance ── Context (config, flags, canvas, collector)
//!    │              ├── EventBus  ◀── processed / detected ── DecodingEngine
//!    │              └── DecodingEngine (from EngineFactory)
//!    └── decode_single ── ephemeral Instance (same shape, discarded after use)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scanline_core::{FrameEngine, FrameEngineOptions, ReaderRegistry, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> scanline_core::Result<()> {
//!     let registry = Arc::new(ReaderRegistry::new());
//!     let scanner = Scanner::new(FrameEngine::factory(registry, FrameEngineOptions::default()));
//!
//!     let result = scanner
//!         .decode_single(&serde_json::json!({ "src": "./label.png" }), None)
//!         .await?;
//!     println!("{:?}", result.code_result);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod collector;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod image_wrapper;
pub mod instance;
pub mod registry;
pub mod single;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

// Re-exports for convenient access
pub use collector::{BoundedResultCollector, CollectorConfig, ResultCollector};
pub use config::Config;
pub use context::{CanvasContainer, Context};
pub use engine::{DecodingEngine, EngineFactory, FrameEngine, FrameEngineOptions};
pub use error::{
    ConfigError, EngineError, LifecycleError, Result, ScanError, ValidationError,
};
pub use events::{EventHandler, Subscriber, Topic};
pub use image_wrapper::ImageWrapper;
pub use instance::{InitCallback, Instance, LifecycleState};
pub use registry::{BarcodeReader, ReaderRegistry, ReaderSpec, KNOWN_READERS};
pub use single::{ResultCallback, RuntimeEnv};
pub use types::{CodeResult, Point, ScanResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Public facade bound to one default instance.
///
/// All session operations (`init`, `start`, subscriptions, registration)
/// target the default instance. `decode_single` runs on a fresh instance that
/// shares nothing with it.
pub struct Scanner {
    default: Arc<Instance>,
    factory: Arc<dyn EngineFactory>,
    env: RuntimeEnv,
    next_id: AtomicU64,
}

impl Scanner {
    /// Create a scanner whose instances get engines from `factory`.
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self::with_env(factory, RuntimeEnv::from_env())
    }

    /// Create a scanner with an explicit runtime environment.
    pub fn with_env(factory: impl EngineFactory + 'static, env: RuntimeEnv) -> Self {
        let factory: Arc<dyn EngineFactory> = Arc::new(factory);
        let default = Instance::new(0, factory.create());
        tracing::debug!("Scanline v{} ready (development: {})", VERSION, env.development);
        Self {
            default,
            factory,
            env,
            next_id: AtomicU64::new(1),
        }
    }

    /// The default instance.
    pub fn instance(&self) -> &Arc<Instance> {
        &self.default
    }

    /// A new, uninitialized instance independent of the default one.
    pub fn create_instance(&self) -> Arc<Instance> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Instance::new(id, self.factory.create())
    }

    /// Initialize the default instance. See [`Instance::init`].
    pub async fn init(
        &self,
        config: &Value,
        callback: Option<InitCallback>,
        image: Option<ImageWrapper>,
    ) -> Result<()> {
        self.default.init(config, callback, image).await
    }

    /// Initialize `target` instead of the default instance.
    pub async fn init_instance(
        &self,
        target: &Arc<Instance>,
        config: &Value,
        callback: Option<InitCallback>,
        image: Option<ImageWrapper>,
    ) -> Result<()> {
        target.init(config, callback, image).await
    }

    pub fn start(&self) -> Result<()> {
        self.default.start()
    }

    pub fn stop(&self) {
        self.default.stop()
    }

    /// Ask the processing loop to idle. Unlike [`stop`](Self::stop), nothing is released.
    pub fn pause(&self) {
        self.default.pause()
    }

    pub fn on_detected(&self, callback: Option<Subscriber>) {
        self.subscribe(Topic::Detected, callback);
    }

    pub fn off_detected(&self, callback: Option<&Subscriber>) {
        self.default.events().unsubscribe(Topic::Detected, callback);
    }

    pub fn on_processed(&self, callback: Option<Subscriber>) {
        self.subscribe(Topic::Processed, callback);
    }

    pub fn off_processed(&self, callback: Option<&Subscriber>) {
        self.default.events().unsubscribe(Topic::Processed, callback);
    }

    /// Replace the active reader selection. An empty list is ignored.
    pub fn set_readers(&self, readers: &[ReaderSpec]) {
        if let Err(e) = self.default.set_readers(readers) {
            tracing::warn!("{}", e);
        }
    }

    /// Register a reader under `name`. A blank name or missing reader is ignored.
    pub fn register_reader(&self, name: &str, reader: Option<Arc<dyn BarcodeReader>>) {
        if let Err(e) = self.default.register_reader(name, reader) {
            tracing::warn!("{}", e);
        }
    }

    /// Attach a collector to the default instance. `None` is ignored.
    pub fn register_result_collector(&self, collector: Option<Arc<dyn ResultCollector>>) {
        self.default.register_result_collector(collector);
    }

    /// The default instance's canvas, once the engine has set one.
    pub fn canvas(&self) -> Option<CanvasContainer> {
        self.default.canvas()
    }

    /// Decode a single image on a fresh instance.
    ///
    /// `config` is a partial configuration; its top-level `src` names the
    /// image. Resolves with the payload of the first `processed` event.
    pub async fn decode_single(
        &self,
        config: &Value,
        callback: Option<ResultCallback>,
    ) -> Result<ScanResult> {
        let instance = self.create_instance();
        single::decode_single(instance, config, &self.env, callback).await
    }

    fn subscribe(&self, topic: Topic, callback: Option<Subscriber>) {
        match callback {
            Some(subscriber) => self.default.events().subscribe(topic, &subscriber),
            None => tracing::warn!("{}", ValidationError::MissingCallback(topic)),
        }
    }
}
