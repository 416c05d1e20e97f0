//! Map, timeline and list projections of the current view.
//!
//! These are read-only: they take the engine's committed state and shape
//! it for a front-end. Map layers export as a GeoJSON FeatureCollection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::ItineraryEngine;
use crate::itinerary::{ItineraryRow, RowId};
use crate::resolver::RenderedPath;
use crate::{Bounds, GeoPoint};

// ============================================================================
// Map
// ============================================================================

/// One marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    /// Rounded "lat,lng" key shared by every member row
    pub key: String,
    pub position: GeoPoint,
    pub color: String,
    pub members: Vec<RowId>,
    pub popup: String,
}

/// Everything drawn on the map for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayers {
    pub generation: u64,
    pub markers: Vec<MapMarker>,
    pub routes: Vec<RenderedPath>,
    pub bounds: Option<Bounds>,
    /// Initial map center, the middle of `bounds`
    pub center: Option<GeoPoint>,
}

fn marker_popup(rows: &[&ItineraryRow]) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(first) = rows.first() {
        lines.push(first.location.clone());
    }
    for row in rows {
        let when = format!("{} {}", row.date, row.time_range);
        lines.push(format!("{} - {}", when.trim(), row.activity));
    }
    lines.join("\n")
}

impl MapLayers {
    /// Markers and committed route paths of the engine's current view.
    pub fn from_engine(engine: &ItineraryEngine) -> Self {
        let view = engine.view();
        let markers: Vec<MapMarker> = view
            .groups
            .iter()
            .map(|group| {
                let rows = engine.itinerary().select(&group.members);
                MapMarker {
                    key: group.key.to_string(),
                    position: group.position(),
                    color: group.color.clone(),
                    members: group.members.clone(),
                    popup: marker_popup(&rows),
                }
            })
            .collect();

        let bounds = view.groups.bounds();
        Self {
            generation: view.generation,
            markers,
            routes: view.paths.clone(),
            center: bounds.map(|b| b.center()),
            bounds,
        }
    }

    /// GeoJSON FeatureCollection: routes as LineStrings, then markers as
    /// Points. Coordinates are in [lng, lat] order. `bbox` and `center`
    /// are present when there is at least one marker.
    pub fn to_geojson(&self) -> Value {
        let routes = self.routes.iter().map(|path| {
            let coordinates: Vec<[f64; 2]> = path.points.iter().map(|p| p.to_lng_lat()).collect();
            json!({
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": coordinates},
                "properties": {
                    "kind": "route",
                    "row": path.row.0,
                    "color": path.color,
                    "dashed": path.dashed,
                    "approximated": path.is_approximated(),
                    "distance_m": path.distance_m,
                    "duration_s": path.duration_s,
                    "popup": path.popup,
                }
            })
        });

        let markers = self.markers.iter().map(|marker| {
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": marker.position.to_lng_lat()},
                "properties": {
                    "kind": "marker",
                    "key": marker.key,
                    "color": marker.color,
                    "rows": marker.members.iter().map(|r| r.0).collect::<Vec<_>>(),
                    "popup": marker.popup,
                }
            })
        });

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": routes.chain(markers).collect::<Vec<_>>(),
        });
        if let Some(b) = self.bounds {
            collection["bbox"] = json!([b.min_lng, b.min_lat, b.max_lng, b.max_lat]);
        }
        if let Some(center) = self.center {
            collection["center"] = json!(center.to_lng_lat());
        }
        collection
    }
}

// ============================================================================
// Timeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub row: RowId,
    pub time_range: String,
    pub location: String,
    pub activity: String,
    pub notes: String,
    pub driving: bool,
}

/// One date on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDay {
    pub date: String,
    pub day: String,
    pub color: String,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub entries: Vec<TimelineEntry>,
}

/// Visible rows grouped by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub days: Vec<TimelineDay>,
}

impl Timeline {
    /// Days in order of first appearance; entries within a day keep
    /// source order. Date strings are never compared.
    pub fn from_engine(engine: &ItineraryEngine) -> Self {
        let mut days: Vec<TimelineDay> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for row in engine.visible_rows() {
            let idx = *index.entry(row.date.as_str()).or_insert_with(|| {
                days.push(TimelineDay {
                    date: row.date.clone(),
                    day: row.day.clone(),
                    color: engine.colors().color_for(&row.date).to_string(),
                    sunrise: None,
                    sunset: None,
                    entries: Vec::new(),
                });
                days.len() - 1
            });
            let day = &mut days[idx];
            if day.day.is_empty() {
                day.day = row.day.clone();
            }
            if day.sunrise.is_none() {
                day.sunrise = row.sunrise.clone();
            }
            if day.sunset.is_none() {
                day.sunset = row.sunset.clone();
            }
            day.entries.push(TimelineEntry {
                row: row.id,
                time_range: row.time_range.clone(),
                location: row.location.clone(),
                activity: row.activity.clone(),
                notes: row.notes.clone(),
                driving: engine.classifier().is_driving(row),
            });
        }

        Self { days }
    }

    /// Plain-text rendering, one block per day.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for day in &self.days {
            out.push_str(format!("{} {}", day.date, day.day).trim_end());
            if let (Some(rise), Some(set)) = (&day.sunrise, &day.sunset) {
                out.push_str(&format!("  (sunrise {}, sunset {})", rise, set));
            }
            out.push('\n');
            for entry in &day.entries {
                let marker = if entry.driving { "->" } else { " *" };
                out.push_str(&format!(
                    "  {} {:<15} {} @ {}\n",
                    marker, entry.time_range, entry.activity, entry.location
                ));
            }
        }
        out
    }
}

// ============================================================================
// List
// ============================================================================

/// One row of the list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub row: RowId,
    pub date: String,
    pub day: String,
    pub time_range: String,
    pub location: String,
    pub activity: String,
    pub notes: String,
    pub region: String,
    pub color: String,
    pub driving: bool,
    /// Key of the marker representing this row, for cross-highlighting
    pub marker: Option<String>,
    pub google_maps_url: Option<String>,
    pub has_notes: bool,
}

impl ListEntry {
    /// Entries for every visible row in source order. `has_notes` reports
    /// whether a location has saved notes or links.
    pub fn from_engine(engine: &ItineraryEngine, has_notes: impl Fn(&str) -> bool) -> Vec<Self> {
        let groups = &engine.view().groups;
        engine
            .visible_rows()
            .into_iter()
            .map(|row| ListEntry {
                row: row.id,
                date: row.date.clone(),
                day: row.day.clone(),
                time_range: row.time_range.clone(),
                location: row.location.clone(),
                activity: row.activity.clone(),
                notes: row.notes.clone(),
                region: engine.regions().classify(row).to_string(),
                color: engine.colors().color_for(&row.date).to_string(),
                driving: engine.classifier().is_driving(row),
                marker: groups.group_for_row(row.id).map(|g| g.key.to_string()),
                google_maps_url: row.google_maps_url.clone(),
                has_notes: has_notes(&row.location),
            })
            .collect()
    }
}
