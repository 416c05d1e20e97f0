//! Marker grouping by rounded coordinate.
//!
//! Rows whose coordinates round to the same key share one map marker.
//! The grouper owns both directions of the marker/row association: each
//! group lists its member rows, and a single reverse index maps a row back
//! to its group.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::colors::DayColors;
use crate::config::MAX_COORDINATE_PRECISION;
use crate::itinerary::{ItineraryRow, RowId};
use crate::{Bounds, GeoPoint};

/// Rounded coordinate identifying one marker.
///
/// Stored as scaled integers so equal keys hash equal no matter how the
/// original floats were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordKey {
    lat: i64,
    lng: i64,
    precision: u32,
}

impl CoordKey {
    /// Round a point to `precision` decimal places, at most
    /// [`MAX_COORDINATE_PRECISION`].
    pub fn from_point(point: &GeoPoint, precision: u32) -> Self {
        let precision = precision.min(MAX_COORDINATE_PRECISION);
        let scale = 10f64.powi(precision as i32);
        Self {
            lat: (point.latitude * scale).round() as i64,
            lng: (point.longitude * scale).round() as i64,
            precision,
        }
    }

    /// The rounded position.
    pub fn point(&self) -> GeoPoint {
        let scale = 10f64.powi(self.precision as i32);
        GeoPoint::new(self.lat as f64 / scale, self.lng as f64 / scale)
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.point();
        let digits = self.precision as usize;
        write!(f, "{:.*},{:.*}", digits, p.latitude, digits, p.longitude)
    }
}

/// Backing data for one map marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGroup {
    pub key: CoordKey,
    /// Color of the first member's date.
    pub color: String,
    /// Member rows in the order they were added.
    pub members: Vec<RowId>,
}

impl LocationGroup {
    pub fn position(&self) -> GeoPoint {
        self.key.point()
    }
}

/// All markers for one pass, plus the row -> marker reverse index.
#[derive(Debug, Clone, Default)]
pub struct LocationGroups {
    groups: Vec<LocationGroup>,
    by_key: HashMap<CoordKey, usize>,
    by_row: HashMap<RowId, usize>,
}

impl LocationGroups {
    /// Group rows by coordinates rounded to `precision` decimals.
    ///
    /// Rows without parseable coordinates contribute no marker. Groups are
    /// kept in first-seen order.
    pub fn build(rows: &[&ItineraryRow], colors: &DayColors, precision: u32) -> Self {
        let mut result = Self::default();
        let mut skipped = 0usize;

        for row in rows {
            let point = match row.point() {
                Some(p) => p,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let key = CoordKey::from_point(&point, precision);

            let idx = match result.by_key.get(&key) {
                Some(&idx) => idx,
                None => {
                    result.groups.push(LocationGroup {
                        key,
                        color: colors.color_for(&row.date).to_string(),
                        members: Vec::new(),
                    });
                    let idx = result.groups.len() - 1;
                    result.by_key.insert(key, idx);
                    idx
                }
            };

            result.groups[idx].members.push(row.id);
            result.by_row.insert(row.id, idx);
        }

        if skipped > 0 {
            debug!(
                "[LocationGroups] {} of {} rows have no usable coordinates",
                skipped,
                rows.len()
            );
        }

        result
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationGroup> {
        self.groups.iter()
    }

    pub fn get(&self, key: &CoordKey) -> Option<&LocationGroup> {
        self.by_key.get(key).map(|&idx| &self.groups[idx])
    }

    /// The marker representing a row, for cross-highlighting.
    pub fn group_for_row(&self, row: RowId) -> Option<&LocationGroup> {
        self.by_row.get(&row).map(|&idx| &self.groups[idx])
    }

    /// Bounds over all marker positions.
    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<GeoPoint> = self.groups.iter().map(|g| g.position()).collect();
        Bounds::from_points(&points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::Itinerary;

    fn colors(itinerary: &Itinerary) -> DayColors {
        DayColors::assign(
            itinerary.rows(),
            &["red".to_string(), "green".to_string()],
            "gray",
        )
    }

    #[test]
    fn test_rounding_collapses_nearby_rows() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "Cafe", "Coffee").with_coordinates("47.60621,-122.33211"),
            ItineraryRow::new("2024-06-02", "Cafe door", "Pastry").with_coordinates("47.60649, -122.33249"),
            ItineraryRow::new("2024-06-02", "Park", "Walk").with_coordinates("47.620,-122.349"),
        ]);
        let rows: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let groups = LocationGroups::build(&rows, &colors(&itinerary), 3);

        assert_eq!(groups.len(), 2);
        let cafe = groups.group_for_row(RowId(0)).unwrap();
        assert_eq!(cafe.members, vec![RowId(0), RowId(1)]);
        // First member's date decides the marker color
        assert_eq!(cafe.color, "red");
        assert_eq!(cafe.key.to_string(), "47.606,-122.332");
    }

    #[test]
    fn test_grouping_independent_of_order() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "a").with_coordinates("10.0001,20.0001"),
            ItineraryRow::new("2024-06-01", "B", "b").with_coordinates("30,40"),
            ItineraryRow::new("2024-06-01", "C", "c").with_coordinates("10.0002,20.0002"),
        ]);
        let forward: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let reversed: Vec<&ItineraryRow> = itinerary.rows().iter().rev().collect();

        let a = LocationGroups::build(&forward, &colors(&itinerary), 3);
        let b = LocationGroups::build(&reversed, &colors(&itinerary), 3);

        for groups in [&a, &b] {
            let g0 = groups.group_for_row(RowId(0)).unwrap();
            let g2 = groups.group_for_row(RowId(2)).unwrap();
            assert_eq!(g0.key, g2.key);
            assert_ne!(g0.key, groups.group_for_row(RowId(1)).unwrap().key);
        }
    }

    #[test]
    fn test_malformed_coordinates_skipped() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "No coords", "x"),
            ItineraryRow::new("2024-06-01", "One part", "x").with_coordinates("47.6"),
            ItineraryRow::new("2024-06-01", "Text", "x").with_coordinates("abc,def"),
            ItineraryRow::new("2024-06-01", "Good", "x").with_coordinates("47.6,-122.3"),
        ]);
        let rows: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let groups = LocationGroups::build(&rows, &colors(&itinerary), 3);

        assert_eq!(groups.len(), 1);
        assert!(groups.group_for_row(RowId(0)).is_none());
        assert!(groups.group_for_row(RowId(2)).is_none());
        assert!(groups.group_for_row(RowId(3)).is_some());
    }

    #[test]
    fn test_oversized_precision_is_capped() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "a").with_coordinates("10,20"),
            ItineraryRow::new("2024-06-01", "B", "b").with_coordinates("40,60"),
        ]);
        let rows: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let groups = LocationGroups::build(&rows, &colors(&itinerary), 30);

        assert_eq!(groups.len(), 2);
        let key = groups.group_for_row(RowId(1)).unwrap().key;
        assert_eq!(key.point(), GeoPoint::new(40.0, 60.0));
        assert_eq!(key.to_string(), "40.000000000,60.000000000");
    }

    #[test]
    fn test_lookup_by_key_and_bounds() {
        let itinerary = Itinerary::from_rows(vec![
            ItineraryRow::new("2024-06-01", "A", "a").with_coordinates("47.0,-123.0"),
            ItineraryRow::new("2024-06-01", "B", "b").with_coordinates("48.0,-121.0"),
        ]);
        let rows: Vec<&ItineraryRow> = itinerary.rows().iter().collect();
        let groups = LocationGroups::build(&rows, &colors(&itinerary), 3);

        let key = CoordKey::from_point(&GeoPoint::new(48.0, -121.0), 3);
        assert_eq!(groups.get(&key).unwrap().members, vec![RowId(1)]);

        let bounds = groups.bounds().unwrap();
        assert_eq!(bounds.min_lat, 47.0);
        assert_eq!(bounds.max_lat, 48.0);
    }
}
