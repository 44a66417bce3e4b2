//! Integration tests for the OpenWeather fetcher and the full run, against a mock HTTP server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use weatherlog_core::{
    CsvHistoryStore, DataPaths, FetchError, HistoryStore, OpenWeatherProvider, PlotOutcome,
    PlotRequest, Units, WeatherProvider, pipeline::fetch_all, read_snapshot, run_once,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const ENDPOINT: &str = "/data/2.5/weather";

fn sample_body(name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lat": 34.05, "lon": -118.24},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "temp_min": temp - 3.0,
            "temp_max": temp + 2.0,
            "pressure": 1012,
            "humidity": 55
        },
        "visibility": 10000,
        "wind": {"speed": 6.91, "deg": 250},
        "dt": 1_717_243_200,
        "name": name,
        "cod": 200
    })
}

fn create_provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::new(
        "TEST_KEY".into(),
        format!("{}{ENDPOINT}", server.uri()),
        Units::Imperial,
        Duration::from_secs(2),
    )
    .expect("Failed to create provider")
}

async fn mount_city(server: &MockServer, city: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", city))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Fetcher
// ============================================================================

#[tokio::test]
async fn sends_city_key_and_units() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Los Angeles"))
        .and(query_param("appid", "TEST_KEY"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body("Los Angeles", 72.0)))
        .expect(1)
        .mount(&server)
        .await;

    let obs = create_provider(&server).current("Los Angeles").await.unwrap();

    assert_eq!(obs.city, "Los Angeles");
    assert_eq!(obs.temperature, Some(72.0));
    assert_eq!(obs.humidity, Some(55));
    assert_eq!(obs.pressure, Some(1012.0));
    assert_eq!(obs.description.as_deref(), Some("clear sky"));
    assert_eq!(obs.units, Units::Imperial);
    // Local fetch time, not the API's `dt`.
    assert!(obs.timestamp > "2025-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
}

#[tokio::test]
async fn api_name_wins_over_requested_name() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        "san francisco",
        ResponseTemplate::new(200).set_body_json(sample_body("San Francisco", 58.0)),
    )
    .await;

    let obs = create_provider(&server).current("san francisco").await.unwrap();
    assert_eq!(obs.city, "San Francisco");
}

#[tokio::test]
async fn http_error_surfaces_status_and_truncated_body() {
    let server = MockServer::start().await;
    let body = format!(r#"{{"cod":"500","message":"{}"}}"#, "x".repeat(500));
    mount_city(&server, "Beta", ResponseTemplate::new(500).set_body_string(body)).await;

    let err = create_provider(&server).current("Beta").await.unwrap_err();

    match err {
        FetchError::Status { city, status, body } => {
            assert_eq!(city, "Beta");
            assert_eq!(status.as_u16(), 500);
            assert!(body.ends_with("..."));
            assert_eq!(body.chars().count(), 203);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_a_status_error() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        "Alpha",
        ResponseTemplate::new(401).set_body_string(r#"{"cod":401,"message":"Invalid API key"}"#),
    )
    .await;

    let err = create_provider(&server).current("Alpha").await.unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        "Slow",
        ResponseTemplate::new(200)
            .set_body_json(sample_body("Slow", 1.0))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let err = create_provider(&server).current("Slow").await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_city(&server, "Alpha", ResponseTemplate::new(200).set_body_string("<html>")).await;

    let err = create_provider(&server).current("Alpha").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn blank_city_is_skipped_and_the_rest_are_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body("Alpha", 72.0)))
        .expect(1)
        .mount(&server)
        .await;

    let cities = vec!["  ".to_string(), "Alpha".to_string(), String::new()];
    let (observations, failed) = fetch_all(&create_provider(&server), &cities).await;

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].city, "Alpha");
    assert_eq!(failed, ["  ", ""]);
}

// ============================================================================
// Full run
// ============================================================================

#[tokio::test]
async fn alpha_succeeds_beta_fails() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        "Alpha",
        ResponseTemplate::new(200).set_body_json(sample_body("Alpha", 72.0)),
    )
    .await;
    mount_city(&server, "Beta", ResponseTemplate::new(500).set_body_string("oops")).await;

    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let store = CsvHistoryStore::new(&paths.history);
    let provider = create_provider(&server);
    let request = PlotRequest::new(DateTime::<Utc>::MAX_UTC, Units::Imperial);
    let cities = vec!["Alpha".to_string(), "Beta".to_string()];

    let summary = run_once(&provider, &store, &cities, &paths, &request)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.failed, ["Beta"]);
    assert_eq!(summary.plot, Some(PlotOutcome::Written(paths.plot.clone())));
    assert!(paths.plot.exists());

    let snapshot = read_snapshot(&paths.snapshot).unwrap();
    assert_eq!(snapshot.metadata.records, 1);
    assert_eq!(snapshot.data.len(), 1);
    assert_eq!(snapshot.data[0].city, "Alpha");
    assert_eq!(snapshot.data[0].temperature, Some(72.0));
    assert!(snapshot.metadata.source.ends_with(ENDPOINT));

    let csv = std::fs::read_to_string(&paths.history).unwrap();
    assert_eq!(csv.lines().count(), 2, "header plus one row");

    // A second run appends rather than replacing.
    run_once(&provider, &store, &cities, &paths, &request)
        .await
        .unwrap();
    let history = store.load().unwrap().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.rows().iter().all(|r| r.city == "Alpha"));
    assert_eq!(read_snapshot(&paths.snapshot).unwrap().metadata.records, 1);
}

#[tokio::test]
async fn cutoff_before_data_skips_plot_but_keeps_files() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        "Alpha",
        ResponseTemplate::new(200).set_body_json(sample_body("Alpha", 72.0)),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let store = CsvHistoryStore::new(&paths.history);
    let request = PlotRequest::new(
        "2000-01-01T00:00:00Z".parse().unwrap(),
        Units::Imperial,
    );

    let summary = run_once(
        &create_provider(&server),
        &store,
        &["Alpha".to_string()],
        &paths,
        &request,
    )
    .await
    .unwrap();

    assert_eq!(
        summary.plot,
        Some(PlotOutcome::Skipped(weatherlog_core::SkipReason::NoDataInWindow))
    );
    assert!(paths.snapshot.exists());
    assert!(paths.history.exists());
    assert!(!paths.plot.exists());
}
