//! Core types for FishAI

use crate::error::ValidationError;
use crate::sanitize::sanitize_file_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single ranked label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredictionRepr")]
pub struct Prediction {
    label: String,
    confidence: f32,
}

impl Prediction {
    /// Create a prediction, rejecting empty labels and confidences outside `[0, 1]`
    pub fn new(label: impl Into<String>, confidence: f32) -> Result<Self, ValidationError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ValidationError::InvalidPrediction(
                "label must not be empty".to_string(),
            ));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::InvalidPrediction(format!(
                "confidence {confidence} for `{label}` is outside [0, 1]"
            )));
        }
        Ok(Self { label, confidence })
    }

    /// Class label from the classifier vocabulary
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Probability in `[0, 1]`
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// One-line summary, e.g. `Likely salmon (93% confidence)`
    ///
    /// The percentage is computed in `f64` and rounded half to even.
    pub fn describe(&self) -> String {
        let percent = round_half_even(f64::from(self.confidence) * 100.0);
        format!("Likely {} ({}% confidence)", self.label, percent as u32)
    }
}

fn round_half_even(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        x.round()
    }
}

#[derive(Deserialize)]
struct PredictionRepr {
    label: String,
    confidence: f32,
}

impl TryFrom<PredictionRepr> for Prediction {
    type Error = ValidationError;

    fn try_from(repr: PredictionRepr) -> Result<Self, Self::Error> {
        Prediction::new(repr.label, repr.confidence)
    }
}

/// Provenance record for one classification request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RecordRepr")]
pub struct ClassificationRecord {
    /// Unique identifier, also used as the stored upload's prefix
    pub id: String,

    /// Sanitized display name of the upload
    pub file_name: String,

    /// Summary of the top prediction
    pub description: String,

    #[serde(rename = "objects")]
    predictions: Vec<Prediction>,

    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,

    /// Retrieval path of the stored upload, set once the bytes are persisted
    pub image_url: Option<String>,
}

impl ClassificationRecord {
    /// Build a record from ranked predictions.
    ///
    /// Generates the id and timestamp, sanitizes `file_name`, and derives the
    /// description from the first prediction. `predictions` must be non-empty
    /// and already ordered best-first.
    pub fn new(file_name: &str, predictions: Vec<Prediction>) -> Result<Self, ValidationError> {
        let description = predictions
            .first()
            .map(Prediction::describe)
            .ok_or_else(|| {
                ValidationError::InvalidPrediction("record needs at least one prediction".into())
            })?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: sanitize_file_name(file_name),
            description,
            predictions,
            created_at: Utc::now(),
            image_url: None,
        })
    }

    /// Ranked predictions, best first
    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// Highest-ranked prediction
    pub fn top(&self) -> &Prediction {
        // Non-empty by construction.
        &self.predictions[0]
    }

    /// Name of the stored upload: `{id}-{file_name}`
    pub fn upload_name(&self) -> String {
        format!("{}-{}", self.id, self.file_name)
    }

    /// Attach the retrieval path of the persisted upload
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordRepr {
    id: String,
    file_name: String,
    description: String,
    objects: Vec<Prediction>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    image_url: Option<String>,
}

impl TryFrom<RecordRepr> for ClassificationRecord {
    type Error = ValidationError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        if repr.objects.is_empty() {
            return Err(ValidationError::InvalidPrediction(format!(
                "record {} has no predictions",
                repr.id
            )));
        }
        if repr.id.is_empty() {
            return Err(ValidationError::InvalidPrediction(
                "record id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: repr.id,
            file_name: repr.file_name,
            description: repr.description,
            predictions: repr.objects,
            created_at: repr.created_at,
            image_url: repr.image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassificationRecord {
        ClassificationRecord::new(
            "trout.jpg",
            vec![
                Prediction::new("trout", 0.874).unwrap(),
                Prediction::new("salmon", 0.1).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn prediction_rejects_out_of_range() {
        assert!(Prediction::new("cod", 1.01).is_err());
        assert!(Prediction::new("cod", -0.1).is_err());
        assert!(Prediction::new("cod", f32::NAN).is_err());
        assert!(Prediction::new("  ", 0.5).is_err());
        assert!(Prediction::new("cod", 0.0).is_ok());
        assert!(Prediction::new("cod", 1.0).is_ok());
    }

    #[test]
    fn description_uses_rounded_top_confidence() {
        let record = sample();
        assert_eq!(record.description, "Likely trout (87% confidence)");
        assert_eq!(record.top().label(), "trout");
    }

    #[test]
    fn description_rounds_half_to_even() {
        let percent = |c: f32| Prediction::new("cod", c).unwrap().describe();
        assert_eq!(percent(0.125), "Likely cod (12% confidence)");
        assert_eq!(percent(0.625), "Likely cod (62% confidence)");
        assert_eq!(percent(0.135), "Likely cod (14% confidence)");
        assert_eq!(percent(0.285), "Likely cod (28% confidence)");
        assert_eq!(percent(0.005), "Likely cod (0% confidence)");
        assert_eq!(percent(1.0), "Likely cod (100% confidence)");
    }

    #[test]
    fn record_requires_predictions() {
        assert!(ClassificationRecord::new("x.jpg", vec![]).is_err());
    }

    #[test]
    fn record_sanitizes_name_and_generates_unique_ids() {
        let a = ClassificationRecord::new("../a b.png", vec![Prediction::new("eel", 1.0).unwrap()])
            .unwrap();
        let b = ClassificationRecord::new("../a b.png", vec![Prediction::new("eel", 1.0).unwrap()])
            .unwrap();
        assert_eq!(a.file_name, "._a_b.png");
        assert_ne!(a.id, b.id);
        assert_eq!(a.upload_name(), format!("{}-._a_b.png", a.id));
        assert!(a.image_url.is_none());
    }

    #[test]
    fn json_uses_camel_case_and_objects() {
        let record = sample().with_image_url("/api/uploads/x");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("fileName").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["imageUrl"], "/api/uploads/x");
        assert_eq!(value["objects"][0]["label"], "trout");

        let back: ClassificationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn deserialization_validates_fields() {
        let bad_confidence = serde_json::json!({
            "id": "1",
            "fileName": "a.jpg",
            "description": "d",
            "objects": [{"label": "cod", "confidence": 3.0}],
            "createdAt": "2024-01-01T00:00:00Z",
            "imageUrl": null
        });
        assert!(serde_json::from_value::<ClassificationRecord>(bad_confidence).is_err());

        let no_objects = serde_json::json!({
            "id": "1",
            "fileName": "a.jpg",
            "description": "d",
            "objects": [],
            "createdAt": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<ClassificationRecord>(no_objects).is_err());
    }
}
