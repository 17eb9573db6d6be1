//! End-to-end scans through the facade with the bundled still-image engine.

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GrayImage, Luma};
use scanline_core::collector::BlacklistEntry;
use scanline_core::{
    BarcodeReader, BoundedResultCollector, CodeResult, CollectorConfig, EventHandler,
    FrameEngine, FrameEngineOptions, ImageWrapper, ReaderRegistry, ReaderSpec, RuntimeEnv,
    ScanResult, Scanner, Subscriber,
};
use serde_json::{json, Value};

/// Reads the top-left pixel value as the code.
struct PixelReader;

impl BarcodeReader for PixelReader {
    fn format(&self) -> &str {
        "pixel"
    }

    fn decode(&self, frame: &ImageWrapper, _options: &Value) -> Option<CodeResult> {
        frame
            .get(0, 0)
            .filter(|&v| v > 0)
            .map(|v| CodeResult::new(v.to_string(), "pixel"))
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<ScanResult>>,
}

impl EventHandler for Recorder {
    fn handle(&self, result: &ScanResult) {
        self.seen.lock().unwrap().push(result.clone());
    }
}

fn write_frame(dir: &Path, name: &str, value: u8) {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([value])))
        .save(dir.join(name))
        .unwrap();
}

fn scanner() -> Scanner {
    let registry = Arc::new(ReaderRegistry::new());
    registry.register("pixel_reader", Arc::new(PixelReader));
    Scanner::with_env(
        FrameEngine::factory(registry, FrameEngineOptions::default()),
        RuntimeEnv::default(),
    )
}

#[tokio::test]
async fn test_sequence_scan_on_default_instance() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "01.png", 7);
    write_frame(dir.path(), "02.png", 0);
    write_frame(dir.path(), "03.png", 42);
    write_frame(dir.path(), "04.png", 7);

    let scanner = scanner();
    scanner.set_readers(&[ReaderSpec::new("pixel_reader")]);
    let collector = Arc::new(BoundedResultCollector::new(CollectorConfig {
        blacklist: vec![BlacklistEntry::new("42", "pixel")],
        ..CollectorConfig::default()
    }));
    scanner.register_result_collector(Some(collector.clone()));

    let detected = Arc::new(Recorder::default());
    scanner.on_detected(Some(Subscriber::handler(detected.clone())));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    scanner.on_processed(Some(Subscriber::callable(move |r| {
        let _ = tx.send(r.clone());
    })));

    scanner
        .init(
            &json!({
                "inputStream": {
                    "type": "ImageStream",
                    "sequence": true,
                    "src": dir.path().to_str().unwrap(),
                }
            }),
            None,
            None,
        )
        .await
        .unwrap();
    scanner.start().unwrap();

    let mut frames = Vec::new();
    for _ in 0..4 {
        frames.push(rx.recv().await.unwrap().frame);
    }
    assert_eq!(frames, vec![Some(0), Some(1), Some(2), Some(3)]);

    let codes: Vec<String> = detected
        .seen
        .lock()
        .unwrap()
        .iter()
        .filter_map(|r| r.code_result.as_ref().map(|c| c.code.clone()))
        .collect();
    assert_eq!(codes, vec!["7", "42", "7"]);

    let collected: Vec<String> = collector
        .results()
        .into_iter()
        .map(|r| r.code_result.code)
        .collect();
    assert_eq!(collected, vec!["7", "7"]);
    assert_eq!(scanner.canvas().map(|c| (c.width, c.height)), Some((8, 8)));

    scanner.stop();
}

#[tokio::test]
async fn test_single_shots_do_not_share_state() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "a.png", 3);
    write_frame(dir.path(), "b.png", 9);

    let scanner = scanner();
    let request = |name: &str| {
        json!({
            "src": dir.path().join(name).to_str().unwrap(),
            "decoder": { "readers": ["pixel_reader"] }
        })
    };

    let (a, b) = (request("a.png"), request("b.png"));
    let (first, second) = tokio::join!(
        scanner.decode_single(&a, None),
        scanner.decode_single(&b, None),
    );

    assert_eq!(first.unwrap().code_result.unwrap().code, "3");
    assert_eq!(second.unwrap().code_result.unwrap().code, "9");
    assert_eq!(
        scanner.instance().state(),
        scanline_core::LifecycleState::Uninitialized
    );
}

#[tokio::test]
async fn test_single_shot_missing_file_rejects() {
    let scanner = scanner();
    let err = scanner
        .decode_single(&json!({ "src": "/definitely/not/here.png" }), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("image not found"));
}
