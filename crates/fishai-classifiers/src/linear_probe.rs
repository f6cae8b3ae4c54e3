//! Candle linear-probe image classifier
//!
//! Runs a single linear layer over the normalized pixels of a fixed-size RGB
//! thumbnail and softmaxes the logits. The weights are produced by the
//! offline fine-tuning export (`classifier.weight`, `classifier.bias`).

use crate::classifier::{ClassificationResult, ImageClassifier};
use crate::model_loader::{ModelArtifact, ModelConfig};
use async_trait::async_trait;
use candle_core::{Device, Module, Tensor};
use candle_nn::Linear;
use fishai_core::{Error, Result};
use image::{imageops::FilterType, DynamicImage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Linear classifier head over raw pixels
pub struct LinearProbeClassifier {
    inner: Arc<ProbeModel>,
}

struct ProbeModel {
    name: String,
    labels: Vec<String>,
    image_size: u32,
    head: Linear,
    device: Device,
}

impl LinearProbeClassifier {
    /// Load the classifier from a model directory or Hugging Face repo
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let artifact = ModelArtifact::resolve(config)?;
        Self::from_artifact(&artifact)
    }

    /// Build the classifier from already resolved artifacts
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        let device = Device::Cpu;
        let manifest = &artifact.manifest;
        let vb = artifact.var_builder(&device)?;

        let head = candle_nn::linear(
            manifest.input_dim(),
            manifest.labels.len(),
            vb.pp("classifier"),
        )
        .map_err(|e| {
            Error::model_unavailable(format!(
                "weights do not match a {}x{} linear head: {}",
                manifest.labels.len(),
                manifest.input_dim(),
                e
            ))
        })?;

        info!(
            "Loaded classifier '{}' with {} labels",
            manifest.name,
            manifest.labels.len()
        );

        Ok(Self {
            inner: Arc::new(ProbeModel {
                name: manifest.name.clone(),
                labels: manifest.labels.clone(),
                image_size: manifest.image_size,
                head,
                device,
            }),
        })
    }
}

impl ProbeModel {
    fn probabilities(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let image = image::load_from_memory(bytes).map_err(|e| Error::decode(e.to_string()))?;
        let pixels = preprocess(&image, self.image_size);

        let input = Tensor::from_vec(pixels, (1, self.head_input_dim()), &self.device)
            .map_err(candle_err)?;
        let logits = self.head.forward(&input).map_err(candle_err)?;
        let probs = candle_nn::ops::softmax(&logits, 1).map_err(candle_err)?;
        probs
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(candle_err)
    }

    fn head_input_dim(&self) -> usize {
        3 * (self.image_size as usize) * (self.image_size as usize)
    }
}

fn candle_err(e: candle_core::Error) -> Error {
    Error::classifier(e.to_string())
}

/// Resize to `size`x`size` and flatten to ImageNet-normalized CHW
pub fn preprocess(image: &DynamicImage, size: u32) -> Vec<f32> {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let num_pixels = (size * size) as usize;
    let mut normalized = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            normalized[c * num_pixels + i] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    normalized
}

#[async_trait]
impl ImageClassifier for LinearProbeClassifier {
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult> {
        let model = Arc::clone(&self.inner);
        let bytes = image.to_vec();
        let start = Instant::now();

        let probabilities = tokio::task::spawn_blocking(move || model.probabilities(&bytes))
            .await
            .map_err(|e| Error::internal(format!("inference task failed: {}", e)))??;

        let latency_us = start.elapsed().as_micros() as u64;
        debug!("Inference took {}us", latency_us);

        Ok(
            ClassificationResult::from_probabilities(&self.inner.labels, &probabilities)
                .with_model(self.inner.name.clone())
                .with_latency_us(latency_us),
        )
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn labels(&self) -> &[String] {
        &self.inner.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn preprocess_is_chw() {
        let mut img = RgbImage::new(2, 2);
        for p in img.pixels_mut() {
            *p = image::Rgb([255, 0, 0]);
        }
        let out = preprocess(&DynamicImage::ImageRgb8(img), 2);
        assert_eq!(out.len(), 12);
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((out[0] - red).abs() < 1e-5);
        assert!((out[4] - green).abs() < 1e-5);
    }
}
