use crate::advisory::AdvisoryGenerator;
use crate::classifier::RemoteClassifier;
use crate::config::Config;
use crate::errors::{PipelineError, ResultExt};
use crate::geocoding::GeoResolver;
use crate::hospitals::HospitalLocator;
use crate::models::{AdvisoryReport, Coordinates, LocationQuery, UserProfile};
use crate::pollution::PollutantFetcher;
use chrono::Utc;
use std::fmt;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    LocationResolution,
    PollutantFetch,
    Classification,
    Advisory,
    HospitalSearch,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::LocationResolution => "location resolution",
            PipelineStage::PollutantFetch => "pollutant fetch",
            PipelineStage::Classification => "classification",
            PipelineStage::Advisory => "advisory",
            PipelineStage::HospitalSearch => "hospital search",
        };
        write!(f, "{}", name)
    }
}

/// Structured terminal failure: which stage failed and why.
///
/// Only the mandatory chain (through classification) can produce one; the
/// advisory and hospital stages degrade to fallback content instead.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub error: PipelineError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline failed at {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn fail_at(stage: PipelineStage) -> impl FnOnce(PipelineError) -> PipelineFailure {
    move |error| {
        tracing::error!("Stage '{}' failed: {}", stage, error);
        PipelineFailure { stage, error }
    }
}

/// Owns the collaborator clients and drives one advisory request end to end.
pub struct AirQualityService {
    config: Config,
    geo: GeoResolver,
    pollutants: PollutantFetcher,
    classifier: RemoteClassifier,
    advisor: AdvisoryGenerator,
    hospitals: HospitalLocator,
}

impl AirQualityService {
    pub fn new(config: Config) -> Self {
        Self {
            geo: GeoResolver::new(&config),
            pollutants: PollutantFetcher::new(&config),
            classifier: RemoteClassifier::new(&config),
            advisor: AdvisoryGenerator::new(&config),
            hospitals: HospitalLocator::new(&config),
            config,
        }
    }

    /// Runs the full pipeline for one location query.
    ///
    /// Stages run strictly in sequence: location resolution, pollutant fetch,
    /// classification, advisory, then (conditionally) hospital search. A
    /// failure in the mandatory chain aborts the request with a structured
    /// `PipelineFailure`; the last two stages substitute fallback content
    /// instead of failing.
    pub async fn run(
        &self,
        query: LocationQuery,
        profile: &UserProfile,
    ) -> Result<AdvisoryReport, PipelineFailure> {
        tracing::info!("Starting advisory pipeline for {:?}", query);

        // Step 1: Resolve the location to coordinates and a display name.
        let (coordinates, place_name) = self
            .resolve_location(query)
            .await
            .map_err(fail_at(PipelineStage::LocationResolution))?;
        tracing::info!(
            "Step 1: Resolved location '{}' at ({}, {})",
            place_name,
            coordinates.latitude,
            coordinates.longitude
        );

        // Step 2: Fetch the current pollutant sample.
        let reading = self
            .pollutants
            .fetch(coordinates)
            .await
            .context(format!("fetching pollutants for '{}'", place_name))
            .map_err(fail_at(PipelineStage::PollutantFetch))?;
        tracing::info!("Step 2: Pollutant reading {:?}", reading);

        // Step 3: Classify the feature vector.
        let category = self
            .classifier
            .classify(&reading.feature_vector())
            .await
            .map_err(fail_at(PipelineStage::Classification))?;
        tracing::info!("Step 3: Classified as {}", category.label());

        // Step 4: Generate advisory text (falls back internally, never fails).
        let advisory = self
            .advisor
            .advise(category, &reading, &place_name, profile)
            .await;
        tracing::info!("Step 4: Advisory ready ({} chars)", advisory.len());

        // Step 5: Hospital search, gated on category tier and a reported
        // medical condition. Skipped is not failed.
        let hospitals = if category.is_unhealthy_tier() && profile.medical_condition() != "none" {
            tracing::info!(
                "Step 5: Searching hospitals near '{}' (condition: {})",
                place_name,
                profile.medical_condition()
            );
            Some(
                self.hospitals
                    .search(
                        coordinates,
                        self.config.hospital_radius_km,
                        self.config.hospital_limit,
                    )
                    .await,
            )
        } else {
            tracing::info!("Step 5: Hospital search skipped");
            None
        };

        Ok(AdvisoryReport {
            place_name,
            coordinates,
            reading,
            category,
            advisory,
            hospitals,
            generated_at: Utc::now(),
        })
    }

    /// Resolves a location query to coordinates and a display name.
    ///
    /// A forward-geocode miss is fatal; a reverse-geocode miss for an
    /// explicit coordinate falls back to the coordinate display form, since a
    /// sensible default exists.
    async fn resolve_location(
        &self,
        query: LocationQuery,
    ) -> Result<(Coordinates, String), PipelineError> {
        match query {
            LocationQuery::Place(name) => {
                let place = self.geo.forward(&name).await?;
                Ok((place.coordinates, place.name))
            }
            LocationQuery::Point(coords) => {
                let name = match self.geo.reverse(coords).await {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::warn!(
                            "Reverse geocoding failed ({}), using coordinates as name",
                            e
                        );
                        coords.display_name()
                    }
                };
                Ok((coords, name))
            }
        }
    }
}
