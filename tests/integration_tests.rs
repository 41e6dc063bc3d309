//! Integration tests for the hydrocast library and CLI

use std::path::Path;
use std::process::{Command, Output};

use chrono::{NaiveDate, Utc};
use chrono_tz::Europe::Ljubljana;
use hydrocast::hydro::payload::{RawStation, decode_forecast, decode_list};
use hydrocast::models::{Coordinate, LocationUpdate, NewLocation, Station, WeatherSnapshot};
use hydrocast::{
    AppState, DocumentStore, Event, FjallStore, HydroError, TrendKind, TrendParams, UserId,
    classify, nearest,
};
use tempfile::TempDir;

const STATIONS: &str = r#"{
    "entries": [
        {"station_id": 1060, "station_name": "Sava - Litija", "latitude": "46.0565", "longitude": "14.8292"},
        {"station_id": "1140", "station_name": "Ljubljanica - Moste", "latitude": 46.0569, "longitude": 14.5376},
        {"station_id": "9999", "station_name": "Unplaced", "latitude": 0, "longitude": 0},
        {"station_id": "8888", "station_name": "No position"}
    ]
}"#;

const FORECAST: &str = r#"[
    {"station_id": "1140", "variable_id": 1, "date": "2024-05-02T06:00:00", "value": "101.0"},
    {"station_id": "1140", "variable_id": 1, "date": "2024-05-02T12:00:00", "value": "104.0"},
    {"station_id": "1140", "variable_id": 1, "date": "2024-05-03", "value": 112.5},
    {"station_id": "1140", "variable_id": 1, "date": "2024-05-04T11:00:00Z", "value": 125.0}
]"#;

fn stations() -> Vec<Station> {
    decode_list::<RawStation>(STATIONS, "stations")
        .unwrap()
        .into_iter()
        .map(Station::from)
        .collect()
}

/// Station list, nearest gauge and trend, without the network
#[test]
fn test_nearest_gauge_and_trend() {
    let stations = stations();
    assert_eq!(stations.len(), 4);
    assert!(stations[3].coordinate.is_none());

    let ljubljana = Coordinate::new(46.0511, 14.5051);
    let found = nearest(ljubljana, &stations).unwrap();
    assert_eq!(found.candidate.id, "1140");
    assert!(found.distance_km < 3.0);

    // A point right next to (0, 0) still never picks the unplaced station.
    let found = nearest(Coordinate::new(0.01, 0.01), &stations).unwrap();
    assert_ne!(found.candidate.id, "9999");

    let samples = decode_forecast(200, FORECAST, "1140", "1", &Ljubljana).unwrap();
    assert_eq!(samples.len(), 4);

    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let trend = classify(&samples, Some(100.0), today, &TrendParams::default()).unwrap();
    assert_eq!(trend.kind, TrendKind::Increasing);
    assert_eq!(trend.change, 25.0);
    assert_eq!(trend.day_span, 2);

    let strict = TrendParams {
        minimum_threshold: 30.0,
        ..TrendParams::default()
    };
    let trend = classify(&samples, Some(100.0), today, &strict).unwrap();
    assert_eq!(trend.kind, TrendKind::Stable);
}

#[test]
fn test_missing_forecast_is_not_a_hard_failure() {
    let err = decode_forecast(200, "[]", "1060", "1", &Ljubljana).unwrap_err();
    assert!(err.is_forecast_unavailable());

    let err = decode_forecast(404, "", "1060", "1", &Ljubljana).unwrap_err();
    assert!(err.is_forecast_unavailable());

    let err = decode_forecast(503, "", "1060", "1", &Ljubljana).unwrap_err();
    assert_eq!(err, HydroError::Http { status: 503 });
}

fn snapshot(temperature_c: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c,
        condition: "Partly cloudy".to_string(),
        pressure_mb: 1012.0,
        wind_kph: 11.0,
        humidity: Some(64.0),
        captured_at: Utc::now(),
    }
}

/// Saved locations go through the store into the app state
#[tokio::test]
async fn test_saved_locations_flow() {
    let dir = TempDir::new().unwrap();
    let alice = UserId("alice".to_string());
    let store = FjallStore::open(dir.path()).unwrap();

    let created = store
        .create(
            &alice,
            NewLocation {
                name: "Bled".to_string(),
                coordinate: Coordinate::new(46.3683, 14.1146),
                snapshot: snapshot(16.0),
            },
        )
        .await
        .unwrap();

    let update = LocationUpdate {
        snapshot: Some(snapshot(19.5)),
        ..LocationUpdate::default()
    };
    store.update(&alice, &created.id, update).await.unwrap();

    let locations = store.list(&alice).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].id, created.id);
    assert_eq!(locations[0].snapshot.temperature_c, 19.5);
    assert!(store.list(&UserId("bob".into())).await.unwrap().is_empty());

    let mut state = AppState::new(TrendParams::default());
    state.apply(Event::SignedIn(alice.clone()));
    state.apply(Event::SavedLocationsChanged(locations));
    state.apply(Event::SavedLocationSelected(created.id.clone()));
    assert_eq!(state.selected_location().unwrap().name, "Bled");

    let err = store.delete(&alice, "missing").await.unwrap_err();
    state.apply(Event::StoreFailed(err));
    assert_eq!(state.saved.len(), 1);
    assert!(state.error.is_some());
}

/// Run the built binary with an isolated config and store
fn hydrocast(dir: &Path, user: Option<&str>, args: &[&str]) -> Output {
    let mut config = format!(
        "[store]\nlocation = '{}'\n\n[logging]\nlevel = \"warn\"\n",
        dir.join("store").display()
    );
    if let Some(user) = user {
        config.push_str(&format!("\n[identity]\nuser_id = \"{user}\"\n"));
    }
    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, config).unwrap();

    Command::new(env!("CARGO_BIN_EXE_hydrocast"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env_remove("HYDROCAST_IDENTITY__USER_ID")
        .env_remove("HYDROCAST_STORE__LOCATION")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute hydrocast")
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = hydrocast(dir.path(), None, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hydrocast"));
    assert!(stdout.contains("lookup"));
    assert!(stdout.contains("gauge"));
}

#[test]
fn test_cli_rejects_empty_location() {
    let dir = TempDir::new().unwrap();
    let output = hydrocast(dir.path(), None, &["weather", "   "]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"), "got: {stderr}");
}

#[test]
fn test_cli_saved_locations_need_a_user() {
    let dir = TempDir::new().unwrap();
    let output = hydrocast(dir.path(), None, &["list"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sign in"), "got: {stderr}");
}

#[test]
fn test_cli_empty_list_and_missing_record() {
    let dir = TempDir::new().unwrap();

    let output = hydrocast(dir.path(), Some("alice"), &["list"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No saved locations"));

    let output = hydrocast(dir.path(), Some("alice"), &["rename", "missing", "Home"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_cli_measurements_need_a_filter() {
    let dir = TempDir::new().unwrap();
    let output = hydrocast(dir.path(), None, &["measurements"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--station"), "got: {stderr}");
}
