use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{AqiCategory, PollutantReading, UserProfile};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Fixed user-facing sentence returned whenever advisory text cannot be
/// produced. This boundary never propagates an error to the orchestrator.
pub const FALLBACK_ADVISORY: &str = "Air quality guidance is temporarily unavailable. \
When in doubt, limit prolonged outdoor exertion and follow local health advisories.";

/// Builds a templated prompt from the classification result and delegates to
/// the external text generator, normalizing its response shape.
pub struct AdvisoryGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl AdvisoryGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.generator_base_url.clone(),
            api_key: config.generator_api_key.clone(),
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    /// Produces a personalized health recommendation for the given
    /// classification. Any transport or generation error is caught here and
    /// converted to `FALLBACK_ADVISORY`.
    pub async fn advise(
        &self,
        category: AqiCategory,
        reading: &PollutantReading,
        place_name: &str,
        profile: &UserProfile,
    ) -> String {
        let prompt = build_prompt(category, reading, place_name, profile);

        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Advisory generation failed, using fallback: {}", e);
                FALLBACK_ADVISORY.to_string()
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = reqwest::Url::parse_with_params(
            &format!(
                "{}/v1beta/models/gemini-1.5-flash:generateContent",
                self.base_url
            ),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|e| {
            PipelineError::GenerationFailure(format!("Failed to build generator URL: {}", e))
        })?;

        tracing::info!("Requesting advisory text ({} char prompt)", prompt.len());

        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                PipelineError::GenerationFailure(format!("Generator request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::GenerationFailure(format!(
                "Generator returned status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            PipelineError::GenerationFailure(format!("Failed to parse generator response: {}", e))
        })?;

        extract_text(&body).ok_or_else(|| {
            PipelineError::GenerationFailure(
                "generator response carried no text payload".to_string(),
            )
        })
    }
}

/// Deterministic prompt template embedding the classification, the pollutant
/// numbers, and the place name. The personalization section appears only when
/// the profile carries at least one non-default value.
pub fn build_prompt(
    category: AqiCategory,
    reading: &PollutantReading,
    place_name: &str,
    profile: &UserProfile,
) -> String {
    let mut prompt = format!(
        "Current air quality in {place} is classified as {category}. \
Pollutant concentrations (ug/m3): CO {co:.1}, Ozone {ozone:.1}, NO2 {no2:.1}, PM2.5 {pm25:.1}. \
Write a short, practical health recommendation for someone in {place} right now.",
        place = place_name,
        category = category.label(),
        co = reading.co,
        ozone = reading.ozone,
        no2 = reading.no2,
        pm25 = reading.pm25,
    );

    if profile.has_personal_context() {
        prompt.push_str(&format!(
            " The reader has the following context: medical condition: {}; preferred activity: {}.",
            profile.medical_condition(),
            profile.activity_preference(),
        ));
        if let Some(age) = profile.age {
            prompt.push_str(&format!(" Age: {}.", age));
        }
    }

    prompt.push_str(" Answer in plain prose, no markdown, at most four sentences.");
    prompt
}

/// Extracts the first non-empty text payload from a generator response.
///
/// The result may surface as a direct `text` value or as a sequence of
/// text-bearing parts under the first candidate; the direct form is tried
/// first.
pub fn extract_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("text").and_then(Value::as_str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    body.get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| {
            parts.iter().find_map(|part| {
                part.get("text")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
            })
        })
}
