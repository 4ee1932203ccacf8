//! Air Quality Advisory Pipeline
//!
//! This library resolves a user-supplied location to coordinates, retrieves
//! current pollutant concentrations, classifies air quality with a pretrained
//! remote classifier, generates a personalized health recommendation, and,
//! when conditions warrant it, produces a ranked list of nearby hospitals.
//!
//! It is a pure orchestration layer over four independent, unreliable
//! external services (geocoding, pollution data, a text generator, and a POI
//! search); there is no server, CLI, or persistence here — a presentation
//! layer drives it.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `models`: Core data models.
//! - `geocoding`: Forward/reverse geocoding with read-through caches.
//! - `pollution`: Pollutant concentration fetcher.
//! - `classifier`: Remote classifier client.
//! - `advisory`: Prompt construction and advisory text generation.
//! - `hospitals`: Hospital POI search, deduplication and ranking.
//! - `pipeline`: Request orchestration and failure policy.

pub mod advisory;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod geocoding;
pub mod hospitals;
pub mod models;
pub mod pipeline;
pub mod pollution;
