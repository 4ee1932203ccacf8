use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{AqiCategory, FeatureVector};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the pretrained classifier service.
///
/// The classifier is opaque from this crate's perspective: a fixed-order
/// feature vector goes in, a bare integer class index comes out. The
/// index-to-category decode table lives in `models::AqiCategory`, not here.
pub struct RemoteClassifier {
    client: Client,
    predict_url: String,
    timeout: Duration,
}

impl RemoteClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            predict_url: config.model_api_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Classifies a feature vector into an AQI category.
    ///
    /// One attempt, no retries, no partial results. Every failure mode
    /// (transport, bad status, missing or out-of-range prediction) surfaces
    /// as `ModelUnready`.
    pub async fn classify(&self, features: &FeatureVector) -> Result<AqiCategory, PipelineError> {
        tracing::info!("Classifying features {:?}", features.values());

        let response = self
            .client
            .post(&self.predict_url)
            .timeout(self.timeout)
            .json(&json!({ "features": features.as_slice() }))
            .send()
            .await
            .map_err(|e| {
                PipelineError::ModelUnready(format!("Classifier request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Classifier returned error {}: {}", status, error_text);
            return Err(PipelineError::ModelUnready(format!(
                "Classifier returned status {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            PipelineError::ModelUnready(format!("Failed to parse classifier response: {}", e))
        })?;

        let index = body
            .get("prediction")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                PipelineError::ModelUnready(
                    "classifier response missing integer 'prediction' field".to_string(),
                )
            })?;

        let category = AqiCategory::from_class_index(index)?;
        tracing::info!("Classifier index {} decoded to {}", index, category.label());
        Ok(category)
    }
}
