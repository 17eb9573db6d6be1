//! Per-instance session state.

use std::fmt;
use std::sync::Arc;

use crate::collector::ResultCollector;
use crate::config::Config;
use crate::image_wrapper::ImageWrapper;

/// Handle to the surface the engine renders frames onto.
///
/// Callers only ever read it; the engine replaces it as frames change.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasContainer {
    /// Frame size in pixels
    pub width: u32,
    pub height: u32,
    /// Most recent frame, if the engine keeps one
    pub frame: Option<Arc<ImageWrapper>>,
}

impl CanvasContainer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: None,
        }
    }
}

/// Mutable state of one instance.
pub struct Context {
    config: Config,
    on_ui_thread: bool,
    stopped: bool,
    canvas_container: Option<CanvasContainer>,
    result_collector: Option<Arc<dyn ResultCollector>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            config: Config::default(),
            on_ui_thread: true,
            stopped: false,
            canvas_container: None,
            result_collector: None,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// False once a pre-decoded image buffer replaced the live stream.
    pub fn on_ui_thread(&self) -> bool {
        self.on_ui_thread
    }

    pub(crate) fn set_on_ui_thread(&mut self, on_ui_thread: bool) {
        self.on_ui_thread = on_ui_thread;
    }

    /// Cooperative stop signal polled by the processing loop.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub fn canvas_container(&self) -> Option<&CanvasContainer> {
        self.canvas_container.as_ref()
    }

    /// Replace the canvas handle. Engines call this when frame geometry changes.
    pub fn set_canvas_container(&mut self, canvas: CanvasContainer) {
        self.canvas_container = Some(canvas);
    }

    pub fn result_collector(&self) -> Option<Arc<dyn ResultCollector>> {
        self.result_collector.clone()
    }

    pub(crate) fn set_result_collector(&mut self, collector: Arc<dyn ResultCollector>) {
        self.result_collector = Some(collector);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("on_ui_thread", &self.on_ui_thread)
            .field("stopped", &self.stopped)
            .field("canvas_container", &self.canvas_container)
            .field("result_collector", &self.result_collector.is_some())
            .finish()
    }
}
