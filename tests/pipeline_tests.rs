/// Integration tests with mocked external providers
/// Exercises the complete advisory pipeline without hitting real services
use aqi_advisor::advisory::FALLBACK_ADVISORY;
use aqi_advisor::config::Config;
use aqi_advisor::hospitals::{
    ALL_FILTERED_PLACEHOLDER, NO_HOSPITALS_PLACEHOLDER, SEARCH_FAILED_PLACEHOLDER,
};
use aqi_advisor::models::{AqiCategory, Coordinates, LocationQuery, UserProfile};
use aqi_advisor::pipeline::{AirQualityService, PipelineStage};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a test config with every provider pointed at the mock server
fn create_test_config(base_url: String) -> Config {
    Config {
        openweather_api_key: "test_key".to_string(),
        geocoding_base_url: base_url.clone(),
        pollution_base_url: base_url.clone(),
        model_api_url: format!("{}/predict", base_url),
        overpass_base_url: base_url.clone(),
        generator_base_url: base_url,
        generator_api_key: "test_generator_key".to_string(),
        request_timeout_secs: 5,
        generation_timeout_secs: 5,
        forward_cache_ttl_secs: 60,
        reverse_cache_ttl_secs: 60,
        hospital_radius_km: 10.0,
        hospital_limit: 5,
    }
}

async fn mount_forward_geocode(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Pekanbaru"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Pekanbaru", "lat": 0.5334, "lon": 101.4478 }
        ])))
        .mount(server)
        .await;
}

async fn mount_pollution(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{
                "components": { "co": 1.2, "o3": 30.0, "no2": 5.0, "pm2_5": 18.0 }
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_classifier(server: &MockServer, prediction: i64) {
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "prediction": prediction })),
        )
        .mount(server)
        .await;
}

async fn mount_generator(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Keep outdoor activity light today." }] }
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn moderate_category_skips_hospital_search() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    // Label-encoded index 2 maps to Moderate.
    mount_classifier(&server, 2).await;
    mount_generator(&server).await;

    // Hospital search must not run for Moderate.
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let profile = UserProfile {
        medical_condition: Some("Asthma".to_string()),
        ..Default::default()
    };

    let report = service
        .run(LocationQuery::Place("Pekanbaru".to_string()), &profile)
        .await
        .expect("pipeline should succeed");

    assert_eq!(report.place_name, "Pekanbaru");
    assert_eq!(report.category, AqiCategory::Moderate);
    assert_eq!(
        report.reading.feature_vector().values(),
        [1.2, 30.0, 5.0, 18.0]
    );
    assert!(!report.advisory.is_empty());
    assert!(report.hospitals.is_none());
}

#[tokio::test]
async fn hazardous_with_condition_runs_search_and_dedupes() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    // Index 1 maps to Hazardous under the label encoding.
    mount_classifier(&server, 1).await;
    mount_generator(&server).await;

    // Two raw entities with the same normalized name at the same distance.
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [
                { "type": "node", "lat": 0.5523, "lon": 101.4478,
                  "tags": { "name": "RS Umum", "addr:city": "Pekanbaru" } },
                { "type": "node", "lat": 0.5523, "lon": 101.4478,
                  "tags": { "name": "rs umum " } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let profile = UserProfile {
        medical_condition: Some("Asthma".to_string()),
        ..Default::default()
    };

    let report = service
        .run(LocationQuery::Place("Pekanbaru".to_string()), &profile)
        .await
        .expect("pipeline should succeed");

    assert_eq!(report.category, AqiCategory::Hazardous);
    let hospitals = report.hospitals.expect("hospital search should run");
    assert_eq!(hospitals.len(), 1);
    assert!(hospitals[0].starts_with("RS Umum"));
    assert!(hospitals[0].ends_with("km"));
}

#[tokio::test]
async fn unhealthy_without_condition_skips_hospital_search() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 3).await;
    mount_generator(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let report = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect("pipeline should succeed");

    assert_eq!(report.category, AqiCategory::Unhealthy);
    assert!(report.hospitals.is_none());
}

#[tokio::test]
async fn zero_raw_entities_yield_placeholder_not_empty() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 1).await;
    mount_generator(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let profile = UserProfile {
        medical_condition: Some("Asthma".to_string()),
        ..Default::default()
    };

    let report = service
        .run(LocationQuery::Place("Pekanbaru".to_string()), &profile)
        .await
        .expect("pipeline should succeed");

    let hospitals = report.hospitals.expect("hospital search should run");
    assert_eq!(hospitals, vec![NO_HOSPITALS_PLACEHOLDER.to_string()]);
}

#[tokio::test]
async fn fully_filtered_entities_yield_distinct_placeholder() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 1).await;
    mount_generator(&server).await;

    // Entities come back, but none of them looks like a hospital.
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [
                { "type": "node", "lat": 0.54, "lon": 101.45,
                  "tags": { "name": "Apotek Kimia Farma" } },
                { "type": "node", "lat": 0.55, "lon": 101.44,
                  "tags": { "name": "unknown" } }
            ]
        })))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let profile = UserProfile {
        medical_condition: Some("Asthma".to_string()),
        ..Default::default()
    };

    let report = service
        .run(LocationQuery::Place("Pekanbaru".to_string()), &profile)
        .await
        .expect("pipeline should succeed");

    let hospitals = report.hospitals.expect("hospital search should run");
    assert_eq!(hospitals, vec![ALL_FILTERED_PLACEHOLDER.to_string()]);
}

#[tokio::test]
async fn poi_provider_error_degrades_to_placeholder() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 1).await;
    mount_generator(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overpass down"))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let profile = UserProfile {
        medical_condition: Some("Asthma".to_string()),
        ..Default::default()
    };

    let report = service
        .run(LocationQuery::Place("Pekanbaru".to_string()), &profile)
        .await
        .expect("pipeline should still succeed");

    let hospitals = report.hospitals.expect("hospital search should run");
    assert_eq!(hospitals, vec![SEARCH_FAILED_PLACEHOLDER.to_string()]);
}

#[tokio::test]
async fn generator_error_falls_back_without_propagating() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 0).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("generator down"))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let report = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect("pipeline should still succeed");

    assert_eq!(report.advisory, FALLBACK_ADVISORY);
}

#[tokio::test]
async fn geocode_miss_fails_at_location_resolution() {
    let server = MockServer::start().await;

    // Empty array = not found
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let failure = service
        .run(
            LocationQuery::Place("Nowhereville".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect_err("pipeline should fail");

    assert_eq!(failure.stage, PipelineStage::LocationResolution);
    assert!(failure.to_string().contains("Not found"));
}

#[tokio::test]
async fn empty_pollution_samples_fail_at_pollutant_fetch() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let failure = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect_err("pipeline should fail");

    assert_eq!(failure.stage, PipelineStage::PollutantFetch);
    assert!(failure.to_string().contains("Unavailable"));
}

#[tokio::test]
async fn out_of_range_class_index_fails_at_classification() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;
    mount_classifier(&server, 9).await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let failure = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect_err("pipeline should fail");

    assert_eq!(failure.stage, PipelineStage::Classification);
    assert!(failure.to_string().contains("out-of-range"));
}

#[tokio::test]
async fn classifier_outage_fails_at_classification() {
    let server = MockServer::start().await;
    mount_forward_geocode(&server).await;
    mount_pollution(&server).await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let failure = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect_err("pipeline should fail");

    assert_eq!(failure.stage, PipelineStage::Classification);
}

#[tokio::test]
async fn repeated_forward_geocode_hits_provider_once() {
    let server = MockServer::start().await;
    mount_pollution(&server).await;
    mount_classifier(&server, 0).await;
    mount_generator(&server).await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Pekanbaru"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Pekanbaru", "lat": 0.5334, "lon": 101.4478 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let first = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect("first run should succeed");

    let second = service
        .run(
            LocationQuery::Place("Pekanbaru".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect("second run should succeed");

    assert_eq!(first.coordinates, second.coordinates);
}

#[tokio::test]
async fn point_query_falls_back_to_coordinate_name_on_reverse_miss() {
    let server = MockServer::start().await;
    mount_pollution(&server).await;
    mount_classifier(&server, 0).await;
    mount_generator(&server).await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let coords = Coordinates::new(0.5334, 101.4478).unwrap();

    let report = service
        .run(LocationQuery::Point(coords), &UserProfile::default())
        .await
        .expect("reverse miss should not be fatal");

    assert_eq!(report.place_name, "0.5334, 101.4478");
    assert_eq!(report.coordinates, coords);
}

#[tokio::test]
async fn point_query_uses_reverse_geocoded_name() {
    let server = MockServer::start().await;
    mount_pollution(&server).await;
    mount_classifier(&server, 0).await;
    mount_generator(&server).await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Pekanbaru", "lat": 0.5334, "lon": 101.4478 }
        ])))
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));
    let coords = Coordinates::new(0.5334, 101.4478).unwrap();

    let report = service
        .run(LocationQuery::Point(coords), &UserProfile::default())
        .await
        .expect("pipeline should succeed");

    assert_eq!(report.place_name, "Pekanbaru");
}

#[tokio::test]
async fn blank_place_name_fails_without_provider_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let service = AirQualityService::new(create_test_config(server.uri()));

    let failure = service
        .run(
            LocationQuery::Place("   ".to_string()),
            &UserProfile::default(),
        )
        .await
        .expect_err("blank input should fail");

    assert_eq!(failure.stage, PipelineStage::LocationResolution);
}
