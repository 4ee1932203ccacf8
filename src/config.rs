use serde::Deserialize;

/// Default per-call timeout for geocoding, pollution, classifier and POI
/// lookups, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Text generation is allowed a much longer window than the data providers.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// OpenWeatherMap key shared by the geocoding and air-pollution APIs.
    pub openweather_api_key: String,
    pub geocoding_base_url: String,
    pub pollution_base_url: String,
    /// Classifier endpoint (FastAPI-style predict service).
    pub model_api_url: String,
    /// Overpass interpreter base URL.
    pub overpass_base_url: String,
    /// Text generator base URL and key.
    pub generator_base_url: String,
    pub generator_api_key: String,
    pub request_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    /// TTLs for the read-through geocoding caches, in seconds.
    pub forward_cache_ttl_secs: u64,
    pub reverse_cache_ttl_secs: u64,
    pub hospital_radius_km: f64,
    pub hospital_limit: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY")
                .map_err(|_| {
                    anyhow::anyhow!("OPENWEATHER_API_KEY environment variable required")
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("OPENWEATHER_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            geocoding_base_url: url_var(
                "GEOCODING_BASE_URL",
                "http://api.openweathermap.org",
            )?,
            pollution_base_url: url_var(
                "POLLUTION_BASE_URL",
                "http://api.openweathermap.org",
            )?,
            model_api_url: url_var("MODEL_API_URL", "http://localhost:8000/predict")?,
            overpass_base_url: url_var(
                "OVERPASS_BASE_URL",
                "https://overpass-api.de",
            )?,
            generator_base_url: url_var(
                "GENERATOR_BASE_URL",
                "https://generativelanguage.googleapis.com",
            )?,
            generator_api_key: std::env::var("GENERATOR_API_KEY")
                .map_err(|_| anyhow::anyhow!("GENERATOR_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("GENERATOR_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            request_timeout_secs: numeric_var(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            generation_timeout_secs: numeric_var(
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?,
            forward_cache_ttl_secs: numeric_var("FORWARD_CACHE_TTL_SECS", 900)?,
            reverse_cache_ttl_secs: numeric_var("REVERSE_CACHE_TTL_SECS", 120)?,
            hospital_radius_km: std::env::var("HOSPITAL_RADIUS_KM")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HOSPITAL_RADIUS_KM must be a number"))
                .and_then(|radius: f64| {
                    if radius <= 0.0 {
                        anyhow::bail!("HOSPITAL_RADIUS_KM must be positive");
                    }
                    Ok(radius)
                })?,
            hospital_limit: numeric_var("HOSPITAL_LIMIT", 5).and_then(|limit: u64| {
                if limit == 0 {
                    anyhow::bail!("HOSPITAL_LIMIT must be at least 1");
                }
                Ok(limit as usize)
            })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Geocoding base URL: {}", config.geocoding_base_url);
        tracing::debug!("Pollution base URL: {}", config.pollution_base_url);
        tracing::debug!("Model API URL: {}", config.model_api_url);
        tracing::debug!("Overpass base URL: {}", config.overpass_base_url);
        tracing::debug!("Generator base URL: {}", config.generator_base_url);
        tracing::debug!(
            "Timeouts: {}s request / {}s generation",
            config.request_timeout_secs,
            config.generation_timeout_secs
        );

        Ok(config)
    }
}

fn url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = std::env::var(name).unwrap_or_else(|_| default.to_string());
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url)
}

fn numeric_var(name: &str, default: u64) -> anyhow::Result<u64> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number", name))
}
