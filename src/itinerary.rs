//! Itinerary rows and CSV loading.
//!
//! Rows keep their file order and are never mutated after load. Order is
//! the only reliable sequencing signal: several rows share a date and the
//! time ranges are free-form display strings.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ItineraryError, Result};
use crate::GeoPoint;

const COL_DATE: &str = "Date";
const COL_DAY: &str = "Day";
const COL_TIME_RANGE: &str = "Time Range";
const COL_LOCATION: &str = "Location";
const COL_ACTIVITY: &str = "Activity";
const COL_NOTES: &str = "Notes";
const COL_COORDINATES: &str = "Coordinates";
const COL_MAPS_URL: &str = "Google Maps URL";
const COL_SUNRISE: &str = "Sunrise";
const COL_SUNSET: &str = "Sunset";

/// Position of a row in the loaded itinerary.
///
/// Stable across filtering: a filtered subset still refers to rows by the
/// id they were given at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub usize);

/// One scheduled stop or activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRow {
    pub id: RowId,
    pub date: String,
    pub day: String,
    pub time_range: String,
    pub location: String,
    pub activity: String,
    pub notes: String,
    /// Raw "lat,lng" text, possibly malformed.
    pub coordinates: Option<String>,
    pub google_maps_url: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

impl ItineraryRow {
    /// Minimal row, mostly for building itineraries in code.
    pub fn new(date: &str, location: &str, activity: &str) -> Self {
        Self {
            id: RowId(0),
            date: date.to_string(),
            day: String::new(),
            time_range: String::new(),
            location: location.to_string(),
            activity: activity.to_string(),
            notes: String::new(),
            coordinates: None,
            google_maps_url: None,
            sunrise: None,
            sunset: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: &str) -> Self {
        self.coordinates = Some(coordinates.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn with_time_range(mut self, time_range: &str) -> Self {
        self.time_range = time_range.to_string();
        self
    }

    pub fn with_day(mut self, day: &str) -> Self {
        self.day = day.to_string();
        self
    }

    /// Parsed coordinates, or `None` when absent or malformed.
    pub fn point(&self) -> Option<GeoPoint> {
        self.coordinates.as_deref().and_then(parse_coordinates)
    }
}

/// Parse a `"lat,lng"` string.
///
/// Whitespace around either part is ignored. Anything that does not split
/// into exactly two finite numbers yields `None`.
pub fn parse_coordinates(raw: &str) -> Option<GeoPoint> {
    let mut parts = raw.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let point = GeoPoint::new(lat, lng);
    point.is_finite().then_some(point)
}

/// The loaded trip, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    rows: Vec<ItineraryRow>,
}

impl Itinerary {
    /// Build from rows, dropping those with an empty date and assigning
    /// ids by position.
    pub fn from_rows(rows: Vec<ItineraryRow>) -> Self {
        let rows = rows
            .into_iter()
            .filter(|r| !r.date.trim().is_empty())
            .enumerate()
            .map(|(i, mut r)| {
                r.id = RowId(i);
                r
            })
            .collect();
        Self { rows }
    }

    /// Load an itinerary CSV from disk.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let itinerary = Self::from_reader(file)?;
        info!(
            "[Itinerary] Loaded {} rows from {}",
            itinerary.len(),
            path.display()
        );
        Ok(itinerary)
    }

    /// Load an itinerary CSV from any reader. The first record must be
    /// the header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ItineraryError::MissingColumn {
                    column: name.to_string(),
                })
        };

        let idx_date = column(COL_DATE)?;
        let idx_day = column(COL_DAY)?;
        let idx_time = column(COL_TIME_RANGE)?;
        let idx_location = column(COL_LOCATION)?;
        let idx_activity = column(COL_ACTIVITY)?;
        let idx_notes = column(COL_NOTES)?;
        let idx_coords = column(COL_COORDINATES)?;
        let idx_url = column(COL_MAPS_URL)?;
        let idx_sunrise = column(COL_SUNRISE)?;
        let idx_sunset = column(COL_SUNSET)?;

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            let record = result?;
            let text = |i: usize| record.get(i).unwrap_or("").to_string();
            let optional = |i: usize| record.get(i).filter(|s| !s.is_empty()).map(str::to_string);

            let date = text(idx_date);
            if date.is_empty() {
                skipped += 1;
                continue;
            }

            rows.push(ItineraryRow {
                id: RowId(rows.len()),
                date,
                day: text(idx_day),
                time_range: text(idx_time),
                location: text(idx_location),
                activity: text(idx_activity),
                notes: text(idx_notes),
                coordinates: optional(idx_coords),
                google_maps_url: optional(idx_url),
                sunrise: optional(idx_sunrise),
                sunset: optional(idx_sunset),
            });
        }
        if skipped > 0 {
            debug!("[Itinerary] Skipped {} rows with empty Date", skipped);
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in source order.
    pub fn rows(&self) -> &[ItineraryRow] {
        &self.rows
    }

    pub fn get(&self, id: RowId) -> Option<&ItineraryRow> {
        self.rows.get(id.0)
    }

    /// Rows for the given ids, skipping unknown ids.
    pub fn select(&self, ids: &[RowId]) -> Vec<&ItineraryRow> {
        ids.iter().filter_map(|&id| self.get(id)).collect()
    }

    /// Distinct dates in ascending (string) order.
    pub fn dates(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.date.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
