//! # Trip Itinerary
//!
//! Turns a tabular trip itinerary into map markers, drive routes, a
//! timeline and a filterable list, with per-location notes kept in local
//! storage.
//!
//! This library provides:
//! - CSV itinerary loading with per-row coordinate parsing
//! - Stable per-date colors, marker grouping by rounded coordinate
//! - Drive detection and start/end derivation for each drive
//! - Routed paths from an OSRM server with straight-line fallback
//! - Generation-tagged derivation passes so stale lookups are discarded
//!
//! ## Features
//!
//! - **`http`** - Enable the OSRM directions client
//! - **`persistence`** - Enable SQLite storage for location notes
//! - **`cli`** - Build the `itinerary` binary (default)
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_itinerary::{Itinerary, ItineraryRow, ViewerConfig, ItineraryEngine, Filter};
//!
//! let rows = vec![
//!     ItineraryRow::new("2024-06-01", "Hotel", "Check out").with_coordinates("47.6062,-122.3321"),
//!     ItineraryRow::new("2024-06-01", "Highway 2", "3 hr drive"),
//!     ItineraryRow::new("2024-06-01", "Leavenworth", "Dinner").with_coordinates("47.5962,-120.6615"),
//! ];
//!
//! let mut engine = ItineraryEngine::new(ViewerConfig::default())?;
//! engine.replace_itinerary(Itinerary::from_rows(rows));
//!
//! let pass = engine.begin_pass(&Filter::default());
//! assert_eq!(pass.groups.len(), 2);
//! assert_eq!(pass.segments.len(), 1);
//! # Ok::<(), trip_itinerary::ItineraryError>(())
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{ItineraryError, Result};

// Palette, keyword tables, directions settings
pub mod config;
pub use config::{DirectionsConfig, DrivingKeywords, RegionRule, RegionTable, ViewerConfig};

// Itinerary rows and CSV loading
pub mod itinerary;
pub use itinerary::{parse_coordinates, Itinerary, ItineraryRow, RowId};

// Date -> color assignment
pub mod colors;
pub use colors::DayColors;

// Marker grouping by rounded coordinate
pub mod grouping;
pub use grouping::{CoordKey, LocationGroup, LocationGroups};

// Drive detection and route endpoint derivation
pub mod routes;
pub use routes::{derive_route_segments, DrivingClassifier, RouteSegment};

// Text / region / date filtering
pub mod filter;
pub use filter::{Filter, RegionClassifier};

// Directions provider seam and routed/fallback path resolution
pub mod resolver;
pub use resolver::{
    format_distance_km, format_duration, DirectionsError, DirectionsProvider, DirectionsRoute,
    OfflineDirections, PathKind, RenderedPath, ResolvedRoutes, RouteResolver,
};

// Stateful controller owning the itinerary and pass generations
pub mod engine;
pub use engine::{GenerationCounter, ItineraryEngine, PassToken, RenderPass, ViewState};

// Map / timeline / list projections
pub mod views;
pub use views::{ListEntry, MapLayers, MapMarker, Timeline, TimelineDay, TimelineEntry};

// Per-location notes and links
pub mod notes;
#[cfg(feature = "persistence")]
pub use notes::SqliteBackend;
pub use notes::{MemoryBackend, NoteLink, NotesBackend, NotesEntry, NotesStore, NOTES_STORAGE_KEY};

// OSRM directions client
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::OsrmClient;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trip_itinerary::GeoPoint;
/// let point = GeoPoint::new(47.6062, -122.3321); // Seattle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite numbers. Range is not checked.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Great-circle distance to another point in meters.
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        use geo::{Distance, Haversine, Point};

        let a = Point::new(self.longitude, self.latitude);
        let b = Point::new(other.longitude, other.latitude);
        Haversine::distance(a, b)
    }

    /// `[lng, lat]`, the order GeoJSON and OSRM use.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Bounding box over a set of points, for fitting a map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points. Returns `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
