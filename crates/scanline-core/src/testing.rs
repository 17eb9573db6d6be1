//! Scriptable engine for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::engine::DecodingEngine;
use crate::error::EngineError;
use crate::events::Topic;
use crate::image_wrapper::ImageWrapper;
use crate::instance::Instance;
use crate::registry::{BarcodeReader, ReaderSpec};
use crate::types::ScanResult;

/// How `init_input_stream` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamBehavior {
    Ready,
    Fail,
    /// Block until `open_gate` is called
    Gate,
}

/// Records every call and optionally publishes a canned result on `start`.
pub(crate) struct MockEngine {
    stream: StreamBehavior,
    emit: Option<ScanResult>,
    calls: Mutex<Vec<String>>,
    readers: Mutex<Vec<String>>,
    requested: Notify,
    gate: Notify,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::with_stream(StreamBehavior::Ready)
    }

    pub(crate) fn with_stream(stream: StreamBehavior) -> Self {
        Self {
            stream,
            emit: None,
            calls: Mutex::new(Vec::new()),
            readers: Mutex::new(Vec::new()),
            requested: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Publish `result` on `processed` (and `detected` when it decoded) from `start`.
    pub(crate) fn emitting(result: ScanResult) -> Self {
        Self {
            emit: Some(result),
            ..Self::new()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn readers(&self) -> Vec<String> {
        self.readers.lock().unwrap().clone()
    }

    pub(crate) async fn wait_until_stream_requested(&self) {
        self.requested.notified().await;
    }

    pub(crate) fn open_gate(&self) {
        self.gate.notify_one();
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl DecodingEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init_input_stream(&self, _instance: &Arc<Instance>) -> Result<(), EngineError> {
        self.record("init_input_stream");
        self.requested.notify_one();
        match self.stream {
            StreamBehavior::Ready => Ok(()),
            StreamBehavior::Fail => Err(EngineError::InputStream {
                message: "camera refused".to_string(),
            }),
            StreamBehavior::Gate => {
                self.gate.notified().await;
                Ok(())
            }
        }
    }

    fn initialize_data(
        &self,
        _instance: &Arc<Instance>,
        _image: ImageWrapper,
    ) -> Result<(), EngineError> {
        self.record("initialize_data");
        Ok(())
    }

    fn start(&self, instance: &Arc<Instance>) -> Result<(), EngineError> {
        self.record("start");
        if let Some(result) = &self.emit {
            instance.events().publish(Topic::Processed, result);
            if result.is_detected() {
                instance.events().publish(Topic::Detected, result);
            }
        }
        Ok(())
    }

    fn stop(&self, _instance: &Arc<Instance>) {
        self.record("stop");
    }

    fn set_readers(&self, readers: &[ReaderSpec]) {
        self.record("set_readers");
        *self.readers.lock().unwrap() = readers.iter().map(|r| r.format.clone()).collect();
    }

    fn register_reader(&self, name: &str, _reader: Arc<dyn BarcodeReader>) {
        self.record("register_reader");
        self.readers.lock().unwrap().push(name.to_string());
    }
}
