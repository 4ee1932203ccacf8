use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::Coordinates;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// A forward-geocoded place: coordinates plus the provider's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub coordinates: Coordinates,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GeoEntry {
    name: String,
    lat: f64,
    lon: f64,
}

/// Forward/reverse geocoding against the OpenWeatherMap Geocoding API, with
/// read-through TTL caches so repeated identical lookups within a session do
/// not hit the provider again.
pub struct GeoResolver {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    /// Forward lookups change rarely; long TTL.
    forward_cache: Cache<String, GeocodedPlace>,
    /// Reverse lookups sit next to fresh pollutant fetches; short TTL.
    reverse_cache: Cache<String, String>,
}

impl GeoResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.geocoding_base_url.clone(),
            api_key: config.openweather_api_key.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            forward_cache: Cache::builder()
                .time_to_live(Duration::from_secs(config.forward_cache_ttl_secs))
                .max_capacity(1_000)
                .build(),
            reverse_cache: Cache::builder()
                .time_to_live(Duration::from_secs(config.reverse_cache_ttl_secs))
                .max_capacity(1_000)
                .build(),
        }
    }

    /// Resolves a free-text place name to coordinates and a display name.
    ///
    /// The first provider match wins. Blank input and empty result sets both
    /// fail with `NotFound`.
    pub async fn forward(&self, name: &str) -> Result<GeocodedPlace, PipelineError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::NotFound(
                "place name is empty".to_string(),
            ));
        }

        let cache_key = trimmed.to_lowercase();
        if let Some(cached) = self.forward_cache.get(&cache_key).await {
            tracing::debug!("Forward geocode cache hit for '{}'", trimmed);
            return Ok(cached);
        }

        let url = reqwest::Url::parse_with_params(
            &format!("{}/geo/1.0/direct", self.base_url),
            &[
                ("q", trimmed),
                ("limit", "1"),
                ("appid", self.api_key.as_str()),
            ],
        )
        .map_err(|e| PipelineError::NotFound(format!("Failed to build geocoding URL: {}", e)))?;

        tracing::info!("Forward geocoding '{}'", trimmed);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::NotFound(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Geocoding provider returned status {}", status);
            return Err(PipelineError::NotFound(format!(
                "Geocoding provider returned status {}",
                status
            )));
        }

        let entries: Vec<GeoEntry> = response.json().await.map_err(|e| {
            PipelineError::NotFound(format!("Failed to parse geocoding response: {}", e))
        })?;

        let entry = entries.into_iter().next().ok_or_else(|| {
            PipelineError::NotFound(format!("no geocoding match for '{}'", trimmed))
        })?;

        let place = GeocodedPlace {
            coordinates: Coordinates::new(entry.lat, entry.lon)?,
            name: entry.name,
        };

        self.forward_cache.insert(cache_key, place.clone()).await;
        Ok(place)
    }

    /// Resolves coordinates to the nearest named place.
    pub async fn reverse(&self, coords: Coordinates) -> Result<String, PipelineError> {
        let cache_key = format!("{:.4},{:.4}", coords.latitude, coords.longitude);
        if let Some(cached) = self.reverse_cache.get(&cache_key).await {
            tracing::debug!("Reverse geocode cache hit for {}", cache_key);
            return Ok(cached);
        }

        let url = reqwest::Url::parse_with_params(
            &format!("{}/geo/1.0/reverse", self.base_url),
            &[
                ("lat", coords.latitude.to_string().as_str()),
                ("lon", coords.longitude.to_string().as_str()),
                ("limit", "1"),
                ("appid", self.api_key.as_str()),
            ],
        )
        .map_err(|e| PipelineError::NotFound(format!("Failed to build geocoding URL: {}", e)))?;

        tracing::info!(
            "Reverse geocoding ({}, {})",
            coords.latitude,
            coords.longitude
        );

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::NotFound(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::NotFound(format!(
                "Geocoding provider returned status {}",
                response.status()
            )));
        }

        let entries: Vec<GeoEntry> = response.json().await.map_err(|e| {
            PipelineError::NotFound(format!("Failed to parse geocoding response: {}", e))
        })?;

        let name = entries
            .into_iter()
            .next()
            .map(|entry| entry.name)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("no named place near {}", cache_key))
            })?;

        self.reverse_cache.insert(cache_key, name.clone()).await;
        Ok(name)
    }
}
