//! Top-K prediction over a shared classifier

use crate::classifier::ImageClassifier;
use fishai_core::{ClassificationRecord, Error, Prediction, Result, ValidationError};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Turns classifier output into classification records
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn ImageClassifier>,
    default_k: usize,
}

impl Predictor {
    /// Create a predictor returning `default_k` predictions unless told otherwise
    pub fn new(classifier: Arc<dyn ImageClassifier>, default_k: usize) -> Self {
        Self {
            classifier,
            default_k: default_k.max(1),
        }
    }

    /// The shared classifier
    pub fn classifier(&self) -> &Arc<dyn ImageClassifier> {
        &self.classifier
    }

    /// Configured number of predictions per record
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Size of the classifier vocabulary
    pub fn vocabulary_size(&self) -> usize {
        self.classifier.labels().len()
    }

    /// Classify `image` and build a record with its `k` best labels.
    ///
    /// `k` is clamped to `[1, vocabulary size]`. The returned record has no
    /// `image_url`; persisting the upload is the caller's job.
    pub async fn predict(
        &self,
        file_name: &str,
        image: &[u8],
        k: usize,
    ) -> Result<ClassificationRecord> {
        if image.is_empty() {
            return Err(ValidationError::EmptyBody.into());
        }

        let result = self.classifier.classify(image).await?;
        let predictions = top_k(&result.scores, k)?;
        let record = ClassificationRecord::new(file_name, predictions)
            .map_err(|e| Error::classifier(e.to_string()))?;

        debug!(
            id = %record.id,
            model = result.model.as_deref().unwrap_or(self.classifier.name()),
            latency_us = result.latency_us,
            "{}",
            record.description
        );
        Ok(record)
    }
}

/// Select the `k` highest scores, best first.
///
/// Uses a partial selection so only the selected entries are sorted. Equal
/// scores keep vocabulary order. Every score must be finite and in `[0, 1]`.
pub fn top_k(scores: &[(String, f32)], k: usize) -> Result<Vec<Prediction>> {
    if scores.is_empty() {
        return Err(Error::classifier("classifier returned no scores"));
    }
    if let Some((label, score)) = scores
        .iter()
        .find(|(_, s)| !s.is_finite() || !(0.0..=1.0).contains(s))
    {
        return Err(Error::classifier(format!(
            "score {score} for `{label}` is not a probability"
        )));
    }

    let k = k.clamp(1, scores.len());
    let rank = |a: &usize, b: &usize| -> Ordering {
        scores[*b].1.total_cmp(&scores[*a].1).then(a.cmp(b))
    };

    let mut order: Vec<usize> = (0..scores.len()).collect();
    if k < order.len() {
        order.select_nth_unstable_by(k - 1, rank);
        order.truncate(k);
    }
    order.sort_unstable_by(rank);

    order
        .into_iter()
        .map(|i| {
            let (label, score) = &scores[i];
            Prediction::new(label.clone(), *score).map_err(|e| Error::classifier(e.to_string()))
        })
        .collect()
}
