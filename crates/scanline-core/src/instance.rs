//! Instances and their lifecycle.
//!
//! An [`Instance`] bundles one [`Context`], one [`EventBus`] and one decoding
//! engine. Its lifecycle is
//!
//! ```text
//! Uninitialized → Initializing → Ready → Running ⇄ Stopped
//! ```
//!
//! `init` may be repeated once it has settled; a second `init` while the first
//! is still pending is rejected with [`LifecycleError::InitInProgress`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::collector::ResultCollector;
use crate::config::{resolve, Config};
use crate::context::{CanvasContainer, Context};
use crate::engine::DecodingEngine;
use crate::error::{LifecycleError, Result, ScanError, ValidationError};
use crate::events::EventBus;
use crate::image_wrapper::ImageWrapper;
use crate::registry::{validate_readers, validate_registration, BarcodeReader, ReaderSpec};

/// Lifecycle position of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Stopped,
}

/// Completion hook for `init`, called once with the same outcome the future yields.
pub type InitCallback = Box<dyn FnOnce(Option<&ScanError>) + Send>;

/// One orchestration unit.
pub struct Instance {
    id: u64,
    context: Mutex<Context>,
    events: EventBus,
    engine: Arc<dyn DecodingEngine>,
    state: Mutex<LifecycleState>,
}

impl Instance {
    /// Create an uninitialized instance driving `engine`.
    pub fn new(id: u64, engine: Arc<dyn DecodingEngine>) -> Arc<Self> {
        tracing::debug!("Created instance {} ({} engine)", id, engine.name());
        Arc::new(Self {
            id,
            context: Mutex::new(Context::new()),
            events: EventBus::new(),
            engine,
            state: Mutex::new(LifecycleState::Uninitialized),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The bus the engine publishes frame results on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn engine(&self) -> &Arc<dyn DecodingEngine> {
        &self.engine
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    /// Run `f` with exclusive access to the context.
    ///
    /// Do not call back into the instance from `f`.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        let mut context = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut context)
    }

    /// Snapshot of the resolved configuration.
    pub fn config(&self) -> Config {
        self.with_context(|ctx| ctx.config().clone())
    }

    pub fn is_stopped(&self) -> bool {
        self.with_context(|ctx| ctx.is_stopped())
    }

    pub fn canvas(&self) -> Option<CanvasContainer> {
        self.with_context(|ctx| ctx.canvas_container().cloned())
    }

    /// Resolve `overrides` against the defaults and bring up the input.
    ///
    /// With `image`, that buffer becomes the only frame and no I/O happens.
    /// Without it, the engine opens the stream described by the config.
    /// `callback`, if given, sees the same outcome the returned future yields.
    pub async fn init(
        self: &Arc<Self>,
        overrides: &Value,
        callback: Option<InitCallback>,
        image: Option<ImageWrapper>,
    ) -> Result<()> {
        let outcome = self.run_init(overrides, image).await;
        if let Err(e) = &outcome {
            tracing::warn!("Instance {} failed to initialize: {}", self.id, e);
        }
        if let Some(callback) = callback {
            callback(outcome.as_ref().err());
        }
        outcome
    }

    async fn run_init(self: &Arc<Self>, overrides: &Value, image: Option<ImageWrapper>) -> Result<()> {
        let mut guard = self.begin_init()?;
        let outcome = self.init_stages(overrides, image).await;
        guard.finish(outcome.is_ok());
        outcome
    }

    async fn init_stages(
        self: &Arc<Self>,
        overrides: &Value,
        image: Option<ImageWrapper>,
    ) -> Result<()> {
        let config = resolve(&Config::default(), [overrides])?;
        self.with_context(|ctx| ctx.set_config(config));

        match image {
            Some(image) => {
                tracing::debug!(
                    "Instance {}: initializing from {}x{} image buffer",
                    self.id,
                    image.width(),
                    image.height()
                );
                self.with_context(|ctx| ctx.set_on_ui_thread(false));
                self.engine.initialize_data(self, image)?;
            }
            None => {
                tracing::debug!("Instance {}: opening input stream", self.id);
                self.engine.init_input_stream(self).await?;
            }
        }
        Ok(())
    }

    fn begin_init(&self) -> Result<InitGuard<'_>> {
        let mut state = self.lock_state();
        if *state == LifecycleState::Initializing {
            return Err(LifecycleError::InitInProgress { instance: self.id }.into());
        }
        *state = LifecycleState::Initializing;
        Ok(InitGuard {
            instance: self,
            settled: false,
        })
    }

    /// Start the processing loop.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.lock_state();
            match *state {
                LifecycleState::Ready | LifecycleState::Running | LifecycleState::Stopped => {}
                other => {
                    return Err(LifecycleError::NotReady {
                        instance: self.id,
                        state: other,
                    }
                    .into())
                }
            }
            *state = LifecycleState::Running;
        }
        self.with_context(|ctx| ctx.set_stopped(false));
        tracing::debug!("Instance {}: starting", self.id);

        // the engine may publish, and subscribers may stop us, before this returns
        if let Err(e) = self.engine.start(self) {
            self.set_state(LifecycleState::Stopped);
            return Err(e.into());
        }
        Ok(())
    }

    /// Stop the processing loop and release the input.
    pub fn stop(self: &Arc<Self>) {
        self.with_context(|ctx| ctx.set_stopped(true));
        self.engine.stop(self);
        {
            let mut state = self.lock_state();
            if matches!(*state, LifecycleState::Ready | LifecycleState::Running) {
                *state = LifecycleState::Stopped;
            }
        }
        tracing::debug!("Instance {}: stopped", self.id);
    }

    /// Signal the processing loop to idle without releasing anything.
    pub fn pause(&self) {
        self.with_context(|ctx| ctx.set_stopped(true));
        tracing::debug!("Instance {}: paused", self.id);
    }

    /// Replace the active reader selection.
    pub fn set_readers(&self, readers: &[ReaderSpec]) -> std::result::Result<(), ValidationError> {
        validate_readers(readers)?;
        self.engine.set_readers(readers);
        Ok(())
    }

    /// Register a reader with the engine.
    pub fn register_reader(
        &self,
        name: &str,
        reader: Option<Arc<dyn BarcodeReader>>,
    ) -> std::result::Result<(), ValidationError> {
        let reader = validate_registration(name, reader)?;
        self.engine.register_reader(name, reader);
        Ok(())
    }

    /// Attach a result collector. `None` is ignored.
    pub fn register_result_collector(&self, collector: Option<Arc<dyn ResultCollector>>) {
        if let Some(collector) = collector {
            self.with_context(|ctx| ctx.set_result_collector(collector));
        }
    }

    fn set_state(&self, next: LifecycleState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets a pending init if its future is dropped before settling.
struct InitGuard<'a> {
    instance: &'a Instance,
    settled: bool,
}

impl InitGuard<'_> {
    fn finish(&mut self, ok: bool) {
        self.settled = true;
        self.instance.set_state(if ok {
            LifecycleState::Ready
        } else {
            LifecycleState::Uninitialized
        });
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.instance.set_state(LifecycleState::Uninitialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{BoundedResultCollector, CollectorConfig};
    use crate::testing::{MockEngine, StreamBehavior};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn instance_with(engine: Arc<MockEngine>) -> Arc<Instance> {
        Instance::new(1, engine)
    }

    #[tokio::test]
    async fn test_init_with_image_buffer() {
        let engine = Arc::new(MockEngine::new());
        let instance = instance_with(engine.clone());
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        instance
            .init(
                &json!({ "numOfWorkers": 8 }),
                Some(Box::new(move |err| {
                    assert!(err.is_none());
                    flag.store(true, Ordering::SeqCst);
                })),
                Some(ImageWrapper::filled(8, 8, 0)),
            )
            .await
            .unwrap();

        assert!(called.load(Ordering::SeqCst));
        assert!(!instance.with_context(|ctx| ctx.on_ui_thread()));
        assert_eq!(instance.config().num_of_workers, 0);
        assert_eq!(instance.state(), LifecycleState::Ready);
        assert_eq!(engine.calls(), vec!["initialize_data"]);
    }

    #[tokio::test]
    async fn test_init_without_buffer_opens_stream() {
        let engine = Arc::new(MockEngine::new());
        let instance = instance_with(engine.clone());

        instance.init(&json!({}), None, None).await.unwrap();

        assert!(instance.with_context(|ctx| ctx.on_ui_thread()));
        assert_eq!(engine.calls(), vec!["init_input_stream"]);
    }

    #[tokio::test]
    async fn test_init_stream_failure_reaches_callback_and_future() {
        let engine = Arc::new(MockEngine::with_stream(StreamBehavior::Fail));
        let instance = instance_with(engine);
        let saw_error = Arc::new(AtomicBool::new(false));
        let flag = saw_error.clone();

        let result = instance
            .init(
                &json!({}),
                Some(Box::new(move |err| flag.store(err.is_some(), Ordering::SeqCst))),
                None,
            )
            .await;

        assert!(matches!(result, Err(ScanError::Engine(_))));
        assert!(saw_error.load(Ordering::SeqCst));
        assert_eq!(instance.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_init_rejects_bad_config() {
        let instance = instance_with(Arc::new(MockEngine::new()));
        let result = instance
            .init(&json!({ "inputStream": { "type": "Hologram" } }), None, None)
            .await;
        assert!(matches!(result, Err(ScanError::Config(_))));
    }

    #[tokio::test]
    async fn test_reentrant_init_is_rejected() {
        let engine = Arc::new(MockEngine::with_stream(StreamBehavior::Gate));
        let instance = instance_with(engine.clone());

        let pending = {
            let instance = instance.clone();
            tokio::spawn(async move { instance.init(&json!({}), None, None).await })
        };
        engine.wait_until_stream_requested().await;
        assert_eq!(instance.state(), LifecycleState::Initializing);

        let second = instance.init(&json!({}), None, None).await;
        assert!(matches!(
            second,
            Err(ScanError::Lifecycle(LifecycleError::InitInProgress { .. }))
        ));

        engine.open_gate();
        pending.await.unwrap().unwrap();
        assert_eq!(instance.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_dropped_init_resets_state() {
        let engine = Arc::new(MockEngine::with_stream(StreamBehavior::Gate));
        let instance = instance_with(engine.clone());

        let pending = {
            let instance = instance.clone();
            tokio::spawn(async move { instance.init(&json!({}), None, None).await })
        };
        engine.wait_until_stream_requested().await;
        pending.abort();
        let _ = pending.await;

        assert_eq!(instance.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_start_before_init_fails() {
        let instance = instance_with(Arc::new(MockEngine::new()));
        let err = instance.start().unwrap_err();
        assert!(matches!(
            err,
            ScanError::Lifecycle(LifecycleError::NotReady {
                state: LifecycleState::Uninitialized,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_start_and_stop_delegate() {
        let engine = Arc::new(MockEngine::new());
        let instance = instance_with(engine.clone());
        instance.init(&json!({}), None, None).await.unwrap();

        instance.start().unwrap();
        assert_eq!(instance.state(), LifecycleState::Running);
        assert!(!instance.is_stopped());

        instance.stop();
        assert_eq!(instance.state(), LifecycleState::Stopped);
        assert!(instance.is_stopped());
        assert_eq!(engine.calls(), vec!["init_input_stream", "start", "stop"]);
    }

    #[tokio::test]
    async fn test_pause_sets_flag_without_teardown() {
        let engine = Arc::new(MockEngine::new());
        let instance = instance_with(engine.clone());
        instance.init(&json!({}), None, None).await.unwrap();
        instance.start().unwrap();

        instance.pause();

        assert!(instance.is_stopped());
        assert_eq!(instance.state(), LifecycleState::Running);
        assert!(!engine.calls().contains(&"stop".to_string()));
    }

    #[tokio::test]
    async fn test_start_clears_pause() {
        let instance = instance_with(Arc::new(MockEngine::new()));
        instance.init(&json!({}), None, None).await.unwrap();
        instance.start().unwrap();
        instance.pause();
        instance.start().unwrap();
        assert!(!instance.is_stopped());
    }

    #[test]
    fn test_result_collector_registration() {
        let instance = instance_with(Arc::new(MockEngine::new()));
        instance.register_result_collector(None);
        assert!(instance.with_context(|ctx| ctx.result_collector().is_none()));

        let collector = Arc::new(BoundedResultCollector::new(CollectorConfig::default()));
        instance.register_result_collector(Some(collector));
        assert!(instance.with_context(|ctx| ctx.result_collector().is_some()));
    }
}
