//! Decoding-engine collaborator.
//!
//! The engine owns the processing loop: it opens the input stream, runs
//! readers on each frame and publishes `processed`/`detected` on the
//! instance's event bus. The orchestration layer only asks it to initialize,
//! start and stop.
//!
//! Every [`Instance`] gets its own engine from an [`EngineFactory`].
//! [`FrameEngine`] is the bundled implementation for still-image streams.

mod frame;
pub(crate) mod source;

pub use frame::{FrameEngine, FrameEngineOptions};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::image_wrapper::ImageWrapper;
use crate::instance::Instance;
use crate::registry::{BarcodeReader, ReaderSpec};

/// Operations the orchestration layer needs from a decoding engine.
///
/// Uses `async_trait` because instances hold engines as `Arc<dyn DecodingEngine>`.
#[async_trait]
pub trait DecodingEngine: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Open the input stream described by the instance's config.
    async fn init_input_stream(&self, instance: &Arc<Instance>) -> Result<(), EngineError>;

    /// Use `image` as the only frame instead of opening a stream.
    fn initialize_data(
        &self,
        instance: &Arc<Instance>,
        image: ImageWrapper,
    ) -> Result<(), EngineError>;

    /// Start (or resume) the processing loop.
    fn start(&self, instance: &Arc<Instance>) -> Result<(), EngineError>;

    /// Stop the processing loop and release the input stream.
    fn stop(&self, instance: &Arc<Instance>);

    /// Replace the active reader selection.
    fn set_readers(&self, readers: &[ReaderSpec]);

    /// Register a reader implementation under `name`.
    fn register_reader(&self, name: &str, reader: Arc<dyn BarcodeReader>);
}

/// Produces a fresh engine for each new instance.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Arc<dyn DecodingEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Arc<dyn DecodingEngine> + Send + Sync,
{
    fn create(&self) -> Arc<dyn DecodingEngine> {
        self()
    }
}
