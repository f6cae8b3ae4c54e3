//! Classifier trait and common types

use async_trait::async_trait;
use fishai_core::Result;

/// Trait for all image classifiers
///
/// Implementations are loaded once at startup and shared across requests, so
/// `classify` must not keep request-scoped mutable state.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Score the encoded image against every label in the vocabulary
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// The fixed, ordered label vocabulary
    fn labels(&self) -> &[String];
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// `(label, probability)` for every vocabulary entry, in vocabulary order
    pub scores: Vec<(String, f32)>,

    /// Model name or version
    pub model: Option<String>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(scores: Vec<(String, f32)>) -> Self {
        Self {
            scores,
            model: None,
            latency_us: 0,
        }
    }

    /// Pair `probabilities` with `labels` in vocabulary order
    pub fn from_probabilities(labels: &[String], probabilities: &[f32]) -> Self {
        Self::new(
            labels
                .iter()
                .cloned()
                .zip(probabilities.iter().copied())
                .collect(),
        )
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the measured latency
    pub fn with_latency_us(mut self, latency_us: u64) -> Self {
        self.latency_us = latency_us;
        self
    }

    /// Label with the highest probability, first in vocabulary order on ties
    pub fn argmax(&self) -> Option<(&str, f32)> {
        self.scores
            .iter()
            .enumerate()
            .max_by(|(ia, (_, a)), (ib, (_, b))| a.total_cmp(b).then(ib.cmp(ia)))
            .map(|(_, (label, score))| (label.as_str(), *score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_labels_in_order() {
        let labels = vec!["cod".to_string(), "eel".to_string()];
        let result = ClassificationResult::from_probabilities(&labels, &[0.25, 0.75]);
        assert_eq!(result.scores[0], ("cod".to_string(), 0.25));
        assert_eq!(result.argmax(), Some(("eel", 0.75)));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let result = ClassificationResult::from_probabilities(&labels, &[0.5, 0.5]);
        assert_eq!(result.argmax(), Some(("a", 0.5)));
    }
}
