//! Linear-probe classifier tests
//!
//! Builds a tiny model directory on the fly so no downloads are needed.

use candle_core::{DType, Device, Tensor};
use fishai_classifiers::{ImageClassifier, LinearProbeClassifier, ModelConfig, Predictor};
use fishai_core::Error;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const LABELS: [&str; 3] = ["cod", "eel", "salmon"];
const IMAGE_SIZE: usize = 4;

/// Zero weights make the output depend only on the bias.
fn write_model(dir: &Path, input_dim: usize) {
    let manifest = serde_json::json!({
        "name": "test-probe",
        "labels": LABELS,
        "image_size": IMAGE_SIZE,
    });
    std::fs::write(dir.join("config.json"), manifest.to_string()).unwrap();

    let device = Device::Cpu;
    let mut tensors = HashMap::new();
    tensors.insert(
        "classifier.weight".to_string(),
        Tensor::zeros((LABELS.len(), input_dim), DType::F32, &device).unwrap(),
    );
    tensors.insert(
        "classifier.bias".to_string(),
        Tensor::new(&[0.0f32, 2.0, 1.0], &device).unwrap(),
    );
    candle_core::safetensors::save(&tensors, dir.join("model.safetensors")).unwrap();
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 12, image::Rgb([30, 90, 160]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn load(dir: &Path) -> LinearProbeClassifier {
    LinearProbeClassifier::load(&ModelConfig::from_local(dir)).unwrap()
}

#[tokio::test]
async fn test_softmax_over_vocabulary() {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), 3 * IMAGE_SIZE * IMAGE_SIZE);
    let classifier = load(dir.path());

    assert_eq!(classifier.name(), "test-probe");
    assert_eq!(classifier.labels(), LABELS);

    let result = classifier.classify(&png_bytes()).await.unwrap();
    assert_eq!(result.scores.len(), 3);
    assert_eq!(result.model.as_deref(), Some("test-probe"));

    let sum: f32 = result.scores.iter().map(|(_, p)| p).sum();
    assert!((sum - 1.0).abs() < 1e-5);
    assert_eq!(result.argmax().map(|(l, _)| l), Some("eel"));
}

#[tokio::test]
async fn test_predictor_over_real_model() {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), 3 * IMAGE_SIZE * IMAGE_SIZE);
    let predictor = Predictor::new(Arc::new(load(dir.path())), 2);

    let record = predictor.predict("net haul.png", &png_bytes(), 2).await.unwrap();
    let labels: Vec<_> = record.predictions().iter().map(|p| p.label()).collect();
    assert_eq!(labels, ["eel", "salmon"]);
    assert_eq!(record.description, "Likely eel (67% confidence)");
    assert_eq!(record.file_name, "net_haul.png");
}

#[tokio::test]
async fn test_garbage_bytes_are_decode_errors() {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), 3 * IMAGE_SIZE * IMAGE_SIZE);
    let classifier = load(dir.path());

    let err = classifier.classify(b"definitely not an image").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
}

#[test]
fn test_mismatched_weights_are_model_unavailable() {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), 7);

    let err = LinearProbeClassifier::load(&ModelConfig::from_local(dir.path()))
        .err()
        .unwrap();
    assert!(matches!(err, Error::ModelUnavailable(_)), "got {err:?}");
}

#[test]
fn test_missing_weights_are_model_unavailable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), r#"{"labels": ["cod"]}"#).unwrap();

    let err = LinearProbeClassifier::load(&ModelConfig::from_local(dir.path()))
        .err()
        .unwrap();
    assert!(matches!(err, Error::ModelUnavailable(_)));
}
