//! Drive detection and route endpoint derivation.
//!
//! A drive is recognised purely by substring match on the row text. For
//! each drive the endpoints come from its list neighbours: the nearest
//! earlier non-drive row with coordinates is the start, the drive's own
//! coordinates (or failing that the nearest later non-drive row) the end.
//! Only list adjacency matters, never geographic distance.

use log::debug;
use serde::Serialize;

use crate::colors::DayColors;
use crate::config::DrivingKeywords;
use crate::itinerary::{ItineraryRow, RowId};
use crate::GeoPoint;

/// Keyword classifier for driving rows.
#[derive(Debug, Clone)]
pub struct DrivingClassifier {
    any_field: Vec<String>,
    location_only: Vec<String>,
}

impl DrivingClassifier {
    pub fn new(keywords: &DrivingKeywords) -> Self {
        let lower = |v: &[String]| -> Vec<String> {
            v.iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.to_lowercase())
                .collect()
        };
        Self {
            any_field: lower(&keywords.any_field),
            location_only: lower(&keywords.location_only),
        }
    }

    /// True if the activity, location or notes mention a drive.
    pub fn is_driving(&self, row: &ItineraryRow) -> bool {
        let activity = row.activity.to_lowercase();
        let location = row.location.to_lowercase();
        let notes = row.notes.to_lowercase();

        let in_any = self.any_field.iter().any(|k| {
            activity.contains(k.as_str()) || location.contains(k.as_str()) || notes.contains(k.as_str())
        });

        in_any || self.location_only.iter().any(|k| location.contains(k.as_str()))
    }
}

impl Default for DrivingClassifier {
    fn default() -> Self {
        Self::new(&DrivingKeywords::default())
    }
}

/// Endpoints to route between for one driving row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    /// The driving row this segment was derived from.
    pub row: RowId,
    /// Ordered waypoints, always at least two.
    waypoints: Vec<GeoPoint>,
    /// The driving row's date color.
    pub color: String,
}

impl RouteSegment {
    /// Returns `None` unless there are at least two waypoints.
    pub fn new(row: RowId, waypoints: Vec<GeoPoint>, color: impl Into<String>) -> Option<Self> {
        if waypoints.len() < 2 {
            return None;
        }
        Some(Self {
            row,
            waypoints,
            color: color.into(),
        })
    }

    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    pub fn start(&self) -> GeoPoint {
        self.waypoints[0]
    }

    pub fn end(&self) -> GeoPoint {
        self.waypoints[self.waypoints.len() - 1]
    }
}

/// Derive one segment per driving row in `rows`.
///
/// `rows` may be the full itinerary or a filtered subset; neighbours are
/// looked up within whatever list is passed. Drives for which fewer than
/// two points can be found are skipped.
pub fn derive_route_segments(
    rows: &[&ItineraryRow],
    classifier: &DrivingClassifier,
    colors: &DayColors,
) -> Vec<RouteSegment> {
    let driving: Vec<bool> = rows.iter().map(|r| classifier.is_driving(r)).collect();
    let stop_point = |j: usize| -> Option<GeoPoint> {
        if driving[j] {
            None
        } else {
            rows[j].point()
        }
    };

    let mut segments = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if !driving[i] {
            continue;
        }

        let mut waypoints = Vec::with_capacity(2);
        if let Some(own) = row.point() {
            waypoints.push(own);
        }

        if let Some(start) = (0..i).rev().find_map(&stop_point) {
            waypoints.insert(0, start);
        }

        if waypoints.len() < 2 {
            if let Some(end) = (i + 1..rows.len()).find_map(&stop_point) {
                waypoints.push(end);
            }
        }

        match RouteSegment::new(row.id, waypoints, colors.color_for(&row.date)) {
            Some(segment) => segments.push(segment),
            None => debug!(
                "[RouteDeriver] No endpoints for drive '{}' on {}",
                row.activity, row.date
            ),
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::Itinerary;

    fn derive(itinerary: &Itinerary) -> Vec<RouteSegment> {
        let rows: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let colors = DayColors::assign(itinerary.rows(), &["blue".to_string()], "gray");
        derive_route_segments(&rows, &DrivingClassifier::default(), &colors)
    }

    #[test]
    fn test_classification() {
        let classifier = DrivingClassifier::default();

        let hike = ItineraryRow::new("2024-06-01", "Trailhead", "Morning hike")
            .with_notes("2 hr drive to next stop");
        assert!(classifier.is_driving(&hike));

        let museum = ItineraryRow::new("2024-06-01", "City Museum", "Museum visit");
        assert!(!classifier.is_driving(&museum));

        let arrow = ItineraryRow::new("2024-06-01", "Seattle → Portland", "Travel");
        assert!(classifier.is_driving(&arrow));

        let ascii_arrow = ItineraryRow::new("2024-06-01", "Seattle -> Portland", "Travel");
        assert!(classifier.is_driving(&ascii_arrow));

        // Arrows only count in the location
        let arrow_in_notes =
            ItineraryRow::new("2024-06-01", "Hotel", "Check in").with_notes("lobby -> room 12");
        assert!(!classifier.is_driving(&arrow_in_notes));

        let shouting = ItineraryRow::new("2024-06-01", "Coast", "SCENIC DRIVING");
        assert!(classifier.is_driving(&shouting));
    }

    #[test]
    fn test_drive_between_neighbours() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "Breakfast").with_coordinates("1.0,1.0"),
            ItineraryRow::new("2024-06-01", "B", "Drive north"),
            ItineraryRow::new("2024-06-01", "C", "Lunch").with_coordinates("3.0,3.0"),
        ]);
        let segments = derive(&itinerary);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].row, RowId(1));
        assert_eq!(segments[0].start(), GeoPoint::new(1.0, 1.0));
        assert_eq!(segments[0].end(), GeoPoint::new(3.0, 3.0));
        assert_eq!(segments[0].color, "blue");
    }

    #[test]
    fn test_segment_requires_two_waypoints() {
        assert!(RouteSegment::new(RowId(0), vec![], "red").is_none());
        assert!(RouteSegment::new(RowId(0), vec![GeoPoint::new(1.0, 1.0)], "red").is_none());

        let segment = RouteSegment::new(
            RowId(0),
            vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0), GeoPoint::new(3.0, 3.0)],
            "red",
        )
        .unwrap();
        assert_eq!(segment.start(), GeoPoint::new(1.0, 1.0));
        assert_eq!(segment.end(), GeoPoint::new(3.0, 3.0));
        assert_eq!(segment.color, "red");
    }

    #[test]
    fn test_lone_drive_produces_nothing() {
        let itinerary = Itinerary::from_rows(vec![ItineraryRow::new(
            "2024-06-01",
            "A",
            "Drive",
        )
        .with_coordinates("1.0,1.0")]);
        assert!(derive(&itinerary).is_empty());
    }

    #[test]
    fn test_own_coordinates_are_end_point() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "Breakfast").with_coordinates("1.0,1.0"),
            ItineraryRow::new("2024-06-01", "B", "Drive").with_coordinates("2.0,2.0"),
            ItineraryRow::new("2024-06-01", "C", "Lunch").with_coordinates("3.0,3.0"),
        ]);
        let segments = derive(&itinerary);

        assert_eq!(
            segments[0].waypoints(),
            vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)]
        );
    }

    #[test]
    fn test_own_coordinates_without_predecessor_use_successor() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "B", "Drive").with_coordinates("2.0,2.0"),
            ItineraryRow::new("2024-06-01", "C", "Lunch").with_coordinates("3.0,3.0"),
        ]);
        let segments = derive(&itinerary);

        assert_eq!(
            segments[0].waypoints(),
            vec![GeoPoint::new(2.0, 2.0), GeoPoint::new(3.0, 3.0)]
        );
    }

    #[test]
    fn test_scan_skips_drives_and_uncoordinated_rows() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "Hotel").with_coordinates("1.0,1.0"),
            ItineraryRow::new("2024-06-01", "Gas", "Fuel stop"),
            ItineraryRow::new("2024-06-01", "Pass", "Drive over pass").with_coordinates("5.0,5.0"),
            ItineraryRow::new("2024-06-01", "Valley", "Drive down"),
            ItineraryRow::new("2024-06-01", "Bad", "Picnic").with_coordinates("oops"),
            ItineraryRow::new("2024-06-01", "Town", "Dinner").with_coordinates("3.0,3.0"),
        ]);
        let segments = derive(&itinerary);

        assert_eq!(segments.len(), 2);
        // The earlier drive's coordinates are not a valid start for the second drive
        assert_eq!(segments[1].row, RowId(3));
        assert_eq!(
            segments[1].waypoints(),
            vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(3.0, 3.0)]
        );
    }

    #[test]
    fn test_filtered_subset_uses_its_own_neighbours() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "Breakfast").with_coordinates("1.0,1.0"),
            ItineraryRow::new("2024-06-02", "B", "Drive"),
            ItineraryRow::new("2024-06-02", "C", "Lunch").with_coordinates("3.0,3.0"),
        ]);
        let colors = DayColors::assign(itinerary.rows(), &["blue".to_string()], "gray");
        let day_two: Vec<&ItineraryRow> = itinerary
            .rows()
            .iter()
            .filter(|r| r.date == "2024-06-02")
            .collect();

        let segments = derive_route_segments(&day_two, &DrivingClassifier::default(), &colors);
        assert!(segments.is_empty());
    }
}
