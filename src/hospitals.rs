use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{Coordinates, HospitalCandidate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Placeholder line when the POI provider returned no hospital entities at all.
pub const NO_HOSPITALS_PLACEHOLDER: &str = "No hospitals were found nearby.";
/// Placeholder line when the provider returned entities but every one was
/// filtered out as noise. Distinct from the empty-provider case on purpose.
pub const ALL_FILTERED_PLACEHOLDER: &str =
    "Nearby places were found, but none of them looked like a hospital.";
/// Placeholder line when the query itself failed.
pub const SEARCH_FAILED_PLACEHOLDER: &str = "Hospital search is temporarily unavailable.";

/// Placeholder address when no structured address fields are present.
pub const ADDRESS_UNAVAILABLE: &str = "address unavailable";

/// Generic placeholder names that carry no information (case-insensitive).
const NAME_DENYLIST: [&str; 2] = ["unknown", "hospital"];

/// Name fragments suggesting a pharmacy or pure clinic rather than a hospital.
/// Best-effort noise reduction, not authoritative.
const PHARMACY_TERMS: [&str; 6] = ["pharmacy", "apotek", "apotik", "farmasi", "clinic", "klinik"];

/// Name fragments that override the pharmacy/clinic rejection.
const HOSPITAL_TERMS: [&str; 6] = [
    "hospital",
    "rumah sakit",
    "rsud",
    "rsia",
    "rsu",
    "medical center",
];

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Normalizes the three geometry kinds (node, way-as-center,
    /// relation-as-center) to one representative coordinate.
    fn representative_coordinates(&self) -> Option<Coordinates> {
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(center)) => (center.lat, center.lon),
            _ => return None,
        };
        Coordinates::new(lat, lon).ok()
    }
}

/// Queries a POI data source for hospitals near a coordinate and turns the
/// raw entities into a ranked, deduplicated, bounded list of display lines.
pub struct HospitalLocator {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HospitalLocator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.overpass_base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Searches for hospitals within `radius_km` of `center` and returns at
    /// most `limit` formatted lines, nearest first.
    ///
    /// This boundary never fails: transport and parse errors degrade to a
    /// fixed placeholder entry, and an empty result is reported as a
    /// placeholder rather than an empty sequence.
    pub async fn search(&self, center: Coordinates, radius_km: f64, limit: usize) -> Vec<String> {
        match self.query(center, radius_km).await {
            Ok(elements) => {
                if elements.is_empty() {
                    tracing::info!("POI provider returned no hospital entities");
                    return vec![NO_HOSPITALS_PLACEHOLDER.to_string()];
                }

                let raw_count = elements.len();
                let candidates = build_candidates(center, elements);
                let ranked = rank_candidates(candidates, limit);

                if ranked.is_empty() {
                    tracing::info!(
                        "All {} raw hospital entities were filtered out",
                        raw_count
                    );
                    return vec![ALL_FILTERED_PLACEHOLDER.to_string()];
                }

                tracing::info!(
                    "Hospital search kept {} of {} raw entities",
                    ranked.len(),
                    raw_count
                );
                ranked
                    .iter()
                    .map(HospitalCandidate::display_line)
                    .collect()
            }
            Err(e) => {
                tracing::warn!("Hospital search failed, using placeholder: {}", e);
                vec![SEARCH_FAILED_PLACEHOLDER.to_string()]
            }
        }
    }

    async fn query(
        &self,
        center: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<OverpassElement>, PipelineError> {
        let radius_m = (radius_km * 1000.0).round() as i64;
        let query = format!(
            r#"[out:json][timeout:25];
(
  node["amenity"="hospital"]["name"](around:{radius},{lat},{lon});
  way["amenity"="hospital"]["name"](around:{radius},{lat},{lon});
  relation["amenity"="hospital"]["name"](around:{radius},{lat},{lon});
);
out center;"#,
            radius = radius_m,
            lat = center.latitude,
            lon = center.longitude,
        );

        tracing::info!(
            "Querying POI provider for hospitals within {} km of ({}, {})",
            radius_km,
            center.latitude,
            center.longitude
        );

        let response = self
            .client
            .post(format!("{}/api/interpreter", self.base_url))
            .timeout(self.timeout)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::SearchFailure(format!("POI request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::SearchFailure(format!(
                "POI provider returned status {}",
                response.status()
            )));
        }

        let body: OverpassResponse = response.json().await.map_err(|e| {
            PipelineError::SearchFailure(format!("Failed to parse POI response: {}", e))
        })?;

        Ok(body.elements)
    }
}

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Assembles an address line from whatever structured sub-fields are present,
/// joined with a comma in a fixed order. Absent fields are omitted; when
/// nothing is present the literal placeholder is used.
pub fn assemble_address(tags: &HashMap<String, String>) -> String {
    const ADDRESS_FIELDS: [&str; 5] = [
        "addr:housenumber",
        "addr:street",
        "addr:subdistrict",
        "addr:city",
        "addr:postcode",
    ];

    let parts: Vec<&str> = ADDRESS_FIELDS
        .iter()
        .filter_map(|field| tags.get(*field))
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .collect();

    if parts.is_empty() {
        ADDRESS_UNAVAILABLE.to_string()
    } else {
        parts.join(", ")
    }
}

/// Lowercases and collapses whitespace so near-duplicate names ("RS Umum" vs
/// "rs umum ") share one key.
pub fn normalize_name_key(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Heuristic name-based filter: rejects empty or generic placeholder names
/// and names that read like a pharmacy or pure clinic, unless a
/// hospital-indicating term is also present.
pub fn is_probable_hospital(name: &str) -> bool {
    let normalized = normalize_name_key(name);
    if normalized.is_empty() {
        return false;
    }
    if NAME_DENYLIST.contains(&normalized.as_str()) {
        return false;
    }

    let looks_like_pharmacy = PHARMACY_TERMS
        .iter()
        .any(|term| normalized.contains(term));
    let looks_like_hospital = HOSPITAL_TERMS
        .iter()
        .any(|term| normalized.contains(term));

    !(looks_like_pharmacy && !looks_like_hospital)
}

/// Builds candidates from raw entities: representative coordinate, distance,
/// display name and address, with the name filter applied.
fn build_candidates(
    center: Coordinates,
    elements: Vec<OverpassElement>,
) -> Vec<HospitalCandidate> {
    elements
        .into_iter()
        .filter_map(|element| {
            let coordinates = element.representative_coordinates()?;
            let name = element.tags.get("name")?.trim().to_string();
            if !is_probable_hospital(&name) {
                tracing::debug!("Filtered out POI '{}'", name);
                return None;
            }
            let normalized_key = normalize_name_key(&name);
            Some(HospitalCandidate {
                address: assemble_address(&element.tags),
                distance_km: haversine_km(center, coordinates),
                name,
                normalized_key,
            })
        })
        .collect()
}

/// Sorts candidates by ascending distance, keeps the first (nearest) instance
/// of each normalized key, and truncates to `limit`.
pub fn rank_candidates(
    mut candidates: Vec<HospitalCandidate>,
    limit: usize,
) -> Vec<HospitalCandidate> {
    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let mut seen = HashSet::new();
    candidates.retain(|candidate| seen.insert(candidate.normalized_key.clone()));
    candidates.truncate(limit);
    candidates
}
