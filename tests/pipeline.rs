//! End-to-end derivation tests.
//!
//! Tests the full pipeline: CSV on disk -> filter pass -> route resolution
//! -> commit -> map/timeline/list projections. Directions are scripted so
//! nothing touches the network.
//!
//! Run with: `cargo test --test pipeline`

use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;
use trip_itinerary::{
    DirectionsError, DirectionsProvider, DirectionsRoute, Filter, GeoPoint, ItineraryEngine,
    ItineraryError, ListEntry, MapLayers, OfflineDirections, PathKind, RouteResolver, RowId,
    Timeline, ViewerConfig,
};

const TRIP_CSV: &str = "\
Date,Day,Time Range,Location,Activity,Notes,Coordinates,Google Maps URL,Sunrise,Sunset
2024-06-01,Sat,8:00-9:00,Hotel Seattle,Breakfast,,\"47.6062,-122.3321\",,5:12 AM,9:08 PM
2024-06-01,Sat,9:00-12:00,Highway 2,3 hr drive,Scenic pass,,,,
2024-06-01,Sat,12:00-13:00,Leavenworth,Lunch,,\"47.5962,-120.6615\",https://maps.example/leavenworth,,
2024-06-02,Sun,9:00-10:00,Leavenworth,Coffee,,\"47.5962,-120.6615\",,,
,,,,,,,,,
2024-06-02,Sun,10:00-14:00,Seattle → Portland,Head south,,\"45.5152,-122.6784\",,,
";

/// Helper: write the fixture to a temp file and load it into an engine.
fn setup_engine() -> (ItineraryEngine, NamedTempFile) {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(TRIP_CSV.as_bytes())
        .expect("failed to write fixture");

    let mut engine = ItineraryEngine::new(ViewerConfig::default()).unwrap();
    engine.load_csv(file.path()).expect("failed to load fixture");
    (engine, file)
}

/// Succeeds on the first lookup, fails every one after it.
struct FirstOnlyDirections {
    calls: Mutex<usize>,
}

impl FirstOnlyDirections {
    fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }
}

impl DirectionsProvider for FirstOnlyDirections {
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<DirectionsRoute, DirectionsError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls > 1 {
            return Err(DirectionsError::Status(503));
        }
        let mid = GeoPoint::new(47.75, -121.1);
        Ok(DirectionsRoute {
            geometry: vec![waypoints[0], mid, waypoints[waypoints.len() - 1]],
            distance_m: 215_300.0,
            duration_s: 9_900.0,
        })
    }
}

// ============================================================================
// Loading and derivation
// ============================================================================

#[test]
fn test_load_drops_empty_dates_and_derives_layers() {
    let (mut engine, _file) = setup_engine();
    assert_eq!(engine.itinerary().len(), 5);
    assert_eq!(engine.itinerary().dates(), vec!["2024-06-01", "2024-06-02"]);

    let pass = engine.begin_pass(&Filter::default());
    assert_eq!(pass.rows.len(), 5);

    // Both Leavenworth rows share one marker
    assert_eq!(pass.groups.len(), 3);
    let leavenworth = pass.groups.group_for_row(RowId(2)).unwrap();
    assert_eq!(leavenworth.members, vec![RowId(2), RowId(3)]);

    // The highway drive borrows both neighbours; the arrow row uses its
    // own point as the end
    assert_eq!(pass.segments.len(), 2);
    assert_eq!(pass.segments[0].row, RowId(1));
    assert_eq!(pass.segments[0].start(), GeoPoint::new(47.6062, -122.3321));
    assert_eq!(pass.segments[0].end(), GeoPoint::new(47.5962, -120.6615));
    assert_eq!(pass.segments[1].row, RowId(4));
    assert_eq!(pass.segments[1].end(), GeoPoint::new(45.5152, -122.6784));

    // Drives are colored by their own date
    assert_eq!(pass.segments[0].color, engine.colors().color_for("2024-06-01"));
    assert_eq!(pass.segments[1].color, engine.colors().color_for("2024-06-02"));
}

#[test]
fn test_missing_column_leaves_engine_empty() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"Date,Location,Activity\n2024-06-01,Hotel,Breakfast\n")
        .unwrap();

    let mut engine = ItineraryEngine::new(ViewerConfig::default()).unwrap();
    let err = engine.load_csv(file.path()).unwrap_err();
    assert!(matches!(err, ItineraryError::MissingColumn { .. }));
    assert!(engine.itinerary().is_empty());
    assert!(engine.begin_pass(&Filter::default()).groups.is_empty());
}

// ============================================================================
// Route resolution
// ============================================================================

#[tokio::test]
async fn test_failed_lookup_falls_back_without_stopping_pass() {
    let (mut engine, _file) = setup_engine();
    let pass = engine.begin_pass(&Filter::default());

    let resolver = RouteResolver::new(FirstOnlyDirections::new());
    let resolved = resolver
        .resolve_all(&pass.segments, engine.itinerary(), &pass.token)
        .await;

    assert!(resolved.complete);
    assert_eq!(resolved.paths.len(), 2);
    assert_eq!(resolved.paths[0].kind, PathKind::Routed);
    assert_eq!(resolved.paths[0].points.len(), 3);
    assert!(!resolved.paths[0].dashed);
    assert_eq!(resolved.paths[1].kind, PathKind::Approximated);
    assert!(resolved.paths[1].dashed);
    assert_eq!(resolved.paths[1].points.len(), 2);
    assert!(resolved.paths[1].popup.contains("approximate"));

    engine.commit(resolved).unwrap();
    let layers = MapLayers::from_engine(&engine);
    assert_eq!(layers.markers.len(), 3);
    assert_eq!(layers.routes.len(), 2);
}

#[tokio::test]
async fn test_superseded_pass_is_discarded() {
    let (mut engine, _file) = setup_engine();
    let first = engine.begin_pass(&Filter::default());
    let second = engine.begin_pass(&Filter::default().with_date("2024-06-02"));

    let resolver = RouteResolver::new(OfflineDirections);
    let stale = resolver
        .resolve_all(&first.segments, engine.itinerary(), &first.token)
        .await;
    assert!(!stale.complete);
    assert!(stale.paths.is_empty());
    assert!(matches!(
        engine.commit(stale),
        Err(ItineraryError::StalePass { .. })
    ));

    let fresh = resolver
        .resolve_all(&second.segments, engine.itinerary(), &second.token)
        .await;
    assert!(fresh.complete);
    engine.commit(fresh).unwrap();

    // Only the Portland drive survives the date filter; its start comes
    // from the visible Leavenworth row
    let view = engine.view();
    assert_eq!(view.paths.len(), 1);
    assert_eq!(view.paths[0].row, RowId(4));
    assert_eq!(view.paths[0].points[0], GeoPoint::new(47.5962, -120.6615));
}

// ============================================================================
// Projections
// ============================================================================

#[test]
fn test_filtered_projections() {
    let (mut engine, _file) = setup_engine();
    engine.begin_pass(&Filter::default().with_text("LEAVENWORTH"));

    let timeline = Timeline::from_engine(&engine);
    assert_eq!(timeline.days.len(), 2);
    assert_eq!(timeline.days[0].entries.len(), 1);
    assert_eq!(timeline.days[1].entries[0].activity, "Coffee");

    let entries = ListEntry::from_engine(&engine, |_| false);
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0].google_maps_url.as_deref(),
        Some("https://maps.example/leavenworth")
    );
    assert_eq!(entries[0].marker, entries[1].marker);
}

#[test]
fn test_malformed_coordinates_still_listed() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        b"Date,Day,Time Range,Location,Activity,Notes,Coordinates,Google Maps URL,Sunrise,Sunset
2024-06-01,Sat,8:00-9:00,Hotel Seattle,Breakfast,,\"47.6062,-122.3321\",,,
2024-06-01,Sat,9:00-10:00,Kerry Park,Photos,,\"abc,def\",,,
2024-06-01,Sat,10:00-11:00,Gas Works Park,Kites,,47.6456,,,
",
    )
    .unwrap();

    let mut engine = ItineraryEngine::new(ViewerConfig::default()).unwrap();
    engine.load_csv(file.path()).unwrap();
    let pass = engine.begin_pass(&Filter::default());

    // Only the hotel makes it onto the map
    assert_eq!(pass.groups.len(), 1);
    assert!(pass.groups.group_for_row(RowId(1)).is_none());
    assert!(pass.groups.group_for_row(RowId(2)).is_none());
    assert_eq!(MapLayers::from_engine(&engine).markers.len(), 1);

    let entries = ListEntry::from_engine(&engine, |_| false);
    let locations: Vec<&str> = entries.iter().map(|e| e.location.as_str()).collect();
    assert_eq!(locations, vec!["Hotel Seattle", "Kerry Park", "Gas Works Park"]);
    assert!(entries[0].marker.is_some());
    assert_eq!(entries[1].marker, None);
    assert_eq!(entries[2].marker, None);

    let timeline = Timeline::from_engine(&engine);
    assert_eq!(timeline.days.len(), 1);
    assert_eq!(timeline.days[0].entries.len(), 3);
    assert_eq!(timeline.days[0].entries[1].activity, "Photos");
}

#[test]
fn test_timeline_keeps_sun_times() {
    let (mut engine, _file) = setup_engine();
    engine.begin_pass(&Filter::default());

    let timeline = Timeline::from_engine(&engine);
    let saturday = &timeline.days[0];
    assert_eq!(saturday.sunrise.as_deref(), Some("5:12 AM"));
    assert_eq!(saturday.sunset.as_deref(), Some("9:08 PM"));
    assert!(saturday.entries[1].driving);
    assert!(timeline.to_text().contains("sunrise 5:12 AM"));
}

#[test]
fn test_demo_trip_with_region_config() {
    let demos = concat!(env!("CARGO_MANIFEST_DIR"), "/demos");
    let config = ViewerConfig::from_json_file(format!("{}/viewer.json", demos)).unwrap();
    assert_eq!(config.directions.timeout_secs, 10);
    // Fields absent from the file keep their defaults
    assert_eq!(config.palette.len(), ViewerConfig::default().palette.len());

    let mut engine = ItineraryEngine::new(config).unwrap();
    engine.load_csv(format!("{}/trip.csv", demos)).unwrap();
    assert_eq!(
        engine.regions().regions_present(engine.itinerary().rows()),
        vec!["Seattle", "Cascades", "Portland"]
    );

    let pass = engine.begin_pass(&Filter::default().with_region("Cascades"));
    assert_eq!(pass.rows, vec![RowId(1), RowId(2), RowId(3), RowId(4)]);
    // The Stevens Pass drive has no visible start and only one visible
    // stop after it, so it yields nothing
    assert_eq!(pass.segments.len(), 1);
    assert_eq!(pass.segments[0].row, RowId(4));
    assert_eq!(pass.segments[0].start(), GeoPoint::new(47.5276, -120.8219));
    assert_eq!(pass.segments[0].end(), GeoPoint::new(45.5152, -122.6784));
}
