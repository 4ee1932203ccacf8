use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{Coordinates, PollutantReading};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Retrieves the most recent pollutant sample for a coordinate pair from the
/// OpenWeatherMap Air Pollution API.
pub struct PollutantFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl PollutantFetcher {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.pollution_base_url.clone(),
            api_key: config.openweather_api_key.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Fetches the latest reading for `coords`.
    ///
    /// Data completeness is not guaranteed at this layer: missing component
    /// keys default to 0.0 and unexpected extra components are dropped. An
    /// empty sample list or malformed body fails with `Unavailable`.
    pub async fn fetch(&self, coords: Coordinates) -> Result<PollutantReading, PipelineError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/data/2.5/air_pollution", self.base_url),
            &[
                ("lat", coords.latitude.to_string().as_str()),
                ("lon", coords.longitude.to_string().as_str()),
                ("appid", self.api_key.as_str()),
            ],
        )
        .map_err(|e| PipelineError::Unavailable(format!("Failed to build pollution URL: {}", e)))?;

        tracing::info!(
            "Fetching pollutant data for ({}, {})",
            coords.latitude,
            coords.longitude
        );

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Unavailable(format!("Pollution request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Pollution provider returned status {}", status);
            return Err(PipelineError::Unavailable(format!(
                "Pollution provider returned status {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            PipelineError::Unavailable(format!("Failed to parse pollution response: {}", e))
        })?;

        let components = body
            .get("list")
            .and_then(Value::as_array)
            .and_then(|samples| samples.first())
            .and_then(|sample| sample.get("components"))
            .ok_or_else(|| {
                PipelineError::Unavailable("pollution provider returned no samples".to_string())
            })?;

        Ok(reading_from_components(components))
    }
}

/// Maps the provider's component short codes onto the crate's field names.
/// Missing keys default to 0.0; negative values clamp to 0.0.
fn reading_from_components(components: &Value) -> PollutantReading {
    let component = |key: &str| {
        components
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .max(0.0)
    };

    PollutantReading {
        co: component("co"),
        ozone: component("o3"),
        no2: component("no2"),
        pm25: component("pm2_5"),
    }
}
