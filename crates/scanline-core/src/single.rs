//! Decode exactly one image on a throwaway instance.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::config::merge;
use crate::error::{Result, ScanError};
use crate::events::{Subscriber, Topic};
use crate::instance::Instance;
use crate::types::ScanResult;

/// Hook called with the result of a single-shot decode.
pub type ResultCallback = Box<dyn FnOnce(&ScanResult) + Send>;

/// Environment the single-shot worker heuristic depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Development build: debug requests get the in-process path
    pub development: bool,
}

impl RuntimeEnv {
    /// Read `SCANLINE_ENV`; `development` enables development mode.
    pub fn from_env() -> Self {
        let development = std::env::var("SCANLINE_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);
        Self { development }
    }
}

/// Build the override tree for a single-image decode.
///
/// Starts from still-image defaults with `src` lifted from the caller's
/// top-level `src`, then merges the caller's tree on top.
pub fn single_image_overrides(config: &Value, env: &RuntimeEnv) -> Value {
    let debug = config.get("debug").and_then(Value::as_bool).unwrap_or(false);
    let workers = if env.development && debug { 0 } else { 1 };

    let mut overrides = json!({
        "inputStream": {
            "type": "ImageStream",
            "sequence": false,
            "size": 800,
            "src": config.get("src").cloned().unwrap_or(Value::Null),
        },
        "numOfWorkers": workers,
        "locator": {
            "halfSample": false,
        },
    });
    merge(&mut overrides, config);
    overrides
}

/// Run one decode on `instance`, which must be fresh and owned by this call.
pub(crate) async fn decode_single(
    instance: Arc<Instance>,
    config: &Value,
    env: &RuntimeEnv,
    callback: Option<ResultCallback>,
) -> Result<ScanResult> {
    let overrides = single_image_overrides(config, env);
    let (tx, rx) = oneshot::channel();

    // the instance owns this subscription, so only hold it weakly
    let target = Arc::downgrade(&instance);
    let pending = Mutex::new(Some((tx, callback)));
    instance.events().once(
        Topic::Processed,
        &Subscriber::callable(move |result: &ScanResult| {
            let Some((tx, callback)) = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            else {
                return;
            };
            if let Some(instance) = target.upgrade() {
                instance.stop();
            }
            if let Some(callback) = callback {
                callback(result);
            }
            let _ = tx.send(result.clone());
        }),
    );

    instance.init(&overrides, None, None).await?;
    instance.start()?;

    let result = rx.await.map_err(|_| ScanError::Interrupted)?;
    tracing::debug!(
        "Single-shot decode on instance {} finished, decoded: {}",
        instance.id(),
        result.is_detected()
    );
    Ok(result)
}
