use crate::errors::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Builds a coordinate pair, rejecting values outside the valid ranges
    /// (latitude [-90, 90], longitude [-180, 180]).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PipelineError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PipelineError::BadRequest(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(PipelineError::BadRequest(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Display form used when reverse geocoding yields no named place.
    pub fn display_name(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// User-supplied location input: either a free-text place name or an
/// explicit coordinate pair. Exactly one is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Place(String),
    Point(Coordinates),
}

/// Current pollutant concentrations for one coordinate, in µg/m³.
///
/// Produced fresh per request; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "Ozone")]
    pub ozone: f64,
    #[serde(rename = "NO2")]
    pub no2: f64,
    #[serde(rename = "PM25")]
    pub pm25: f64,
}

impl PollutantReading {
    /// Builds the fixed-order feature vector the classifier was trained on.
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector::from(self)
    }
}

/// Fixed-order model input: [CO, Ozone, NO2, PM25].
///
/// The order is a hard contract with the pretrained classifier. Reordering
/// silently corrupts predictions, so the only way to construct one is from a
/// `PollutantReading`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; 4]);

impl FeatureVector {
    pub fn values(&self) -> [f64; 4] {
        self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<&PollutantReading> for FeatureVector {
    fn from(reading: &PollutantReading) -> Self {
        Self([reading.co, reading.ozone, reading.no2, reading.pm25])
    }
}

/// Discrete air-quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

/// Class-index decode table for the pretrained classifier.
///
/// The model's label encoder sorts category names alphabetically, so the wire
/// index order differs from severity order. This table must stay in sync with
/// how the model was trained; a retrained model with different labels needs a
/// matching update here.
const CLASS_INDEX_TABLE: [AqiCategory; 6] = [
    AqiCategory::Good,
    AqiCategory::Hazardous,
    AqiCategory::Moderate,
    AqiCategory::Unhealthy,
    AqiCategory::UnhealthyForSensitive,
    AqiCategory::VeryUnhealthy,
];

impl AqiCategory {
    /// Decodes a bare classifier index into a category.
    ///
    /// Out-of-range indexes are decode errors, never a silent default.
    pub fn from_class_index(index: i64) -> Result<Self, PipelineError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| CLASS_INDEX_TABLE.get(i).copied())
            .ok_or_else(|| {
                PipelineError::ModelUnready(format!(
                    "classifier returned out-of-range class index {}",
                    index
                ))
            })
    }

    /// Human-readable category label used in prompts and reports.
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Whether the category belongs to the tier that can trigger a hospital
    /// search for users with a reported medical condition.
    pub fn is_unhealthy_tier(&self) -> bool {
        matches!(
            self,
            AqiCategory::UnhealthyForSensitive
                | AqiCategory::Unhealthy
                | AqiCategory::VeryUnhealthy
                | AqiCategory::Hazardous
        )
    }
}

/// Optional personal context used to personalize advisory text and gate the
/// hospital search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    pub medical_condition: Option<String>,
    pub activity_preference: Option<String>,
}

impl UserProfile {
    pub fn medical_condition(&self) -> &str {
        self.medical_condition.as_deref().unwrap_or("none")
    }

    pub fn activity_preference(&self) -> &str {
        self.activity_preference.as_deref().unwrap_or("unspecified")
    }

    /// True when at least one personalization field carries a non-default
    /// value. Anonymous profiles keep the prompt short.
    pub fn has_personal_context(&self) -> bool {
        !self.medical_condition().eq_ignore_ascii_case("none")
            || !self
                .activity_preference()
                .eq_ignore_ascii_case("unspecified")
    }
}

/// One hospital surviving the raw POI parse, before filtering and ranking.
/// Built per search and discarded after ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalCandidate {
    pub name: String,
    pub address: String,
    pub distance_km: f64,
    pub normalized_key: String,
}

impl HospitalCandidate {
    /// Single-line display form: `name, address, distance (2dp) km`.
    pub fn display_line(&self) -> String {
        format!("{}, {}, {:.2} km", self.name, self.address, self.distance_km)
    }
}

/// Final assembled pipeline output.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryReport {
    pub place_name: String,
    pub coordinates: Coordinates,
    pub reading: PollutantReading,
    pub category: AqiCategory,
    pub advisory: String,
    /// Ranked hospital display lines; `None` when the stage was skipped.
    pub hospitals: Option<Vec<String>>,
    pub generated_at: DateTime<Utc>,
}
