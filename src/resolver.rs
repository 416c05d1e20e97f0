//! Turning route segments into drawable paths.
//!
//! Each segment is looked up with the directions provider, one at a time
//! in itinerary order. A failed lookup never stops the pass: that segment
//! falls back to a dashed straight line and the next one is attempted.

use std::future::Future;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::PassToken;
use crate::itinerary::{Itinerary, ItineraryRow, RowId};
use crate::routes::RouteSegment;
use crate::GeoPoint;

/// A routed path returned by a directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    /// Path geometry in (lat, lng) display order.
    pub geometry: Vec<GeoPoint>,
    /// Total distance in meters
    pub distance_m: f64,
    /// Total duration in seconds
    pub duration_s: f64,
}

/// Why a single directions lookup failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectionsError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("service returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no route found")]
    NoRoute,
    #[error("directions lookups are disabled")]
    Offline,
}

/// Anything that can produce a driving path through ordered waypoints.
pub trait DirectionsProvider {
    fn route(
        &self,
        waypoints: &[GeoPoint],
    ) -> impl Future<Output = Result<DirectionsRoute, DirectionsError>>;
}

/// Provider that never routes, so every segment is drawn as a straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDirections;

impl DirectionsProvider for OfflineDirections {
    async fn route(&self, _waypoints: &[GeoPoint]) -> Result<DirectionsRoute, DirectionsError> {
        Err(DirectionsError::Offline)
    }
}

/// How a rendered path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Routed,
    Approximated,
}

/// A drawable drive path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPath {
    pub row: RowId,
    pub kind: PathKind,
    pub points: Vec<GeoPoint>,
    pub color: String,
    /// Approximated paths are drawn dashed
    pub dashed: bool,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub popup: String,
}

impl RenderedPath {
    pub fn is_approximated(&self) -> bool {
        self.kind == PathKind::Approximated
    }
}

/// Paths resolved for one derivation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoutes {
    pub generation: u64,
    pub paths: Vec<RenderedPath>,
    /// False if the pass was superseded before every segment was resolved.
    pub complete: bool,
}

/// Meters as kilometres with one decimal, e.g. "12.3 km".
pub fn format_distance_km(meters: f64) -> String {
    format!("{:.1} km", meters / 1000.0)
}

/// Seconds as "2h 5m", or "45m" under an hour.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn popup_header(row: &ItineraryRow) -> Vec<String> {
    let mut lines = vec![row.activity.clone()];
    let when = format!("{} {}", row.date, row.time_range);
    lines.push(when.trim().to_string());
    lines
}

fn routed_popup(row: &ItineraryRow, route: &DirectionsRoute) -> String {
    let mut lines = popup_header(row);
    lines.push(format!("Distance: {}", format_distance_km(route.distance_m)));
    lines.push(format!("Duration: {}", format_duration(route.duration_s)));
    if !row.notes.is_empty() {
        lines.push(row.notes.clone());
    }
    lines.join("\n")
}

fn approximated_popup(row: &ItineraryRow, straight_m: f64) -> String {
    let mut lines = popup_header(row);
    lines.push("Route approximated (directions unavailable)".to_string());
    lines.push(format!("Straight line: {}", format_distance_km(straight_m)));
    if !row.notes.is_empty() {
        lines.push(row.notes.clone());
    }
    lines.join("\n")
}

fn straight_line_distance(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| w[0].haversine_distance(&w[1]))
        .sum()
}

/// Resolves segments through a directions provider.
pub struct RouteResolver<P> {
    provider: P,
}

impl<P: DirectionsProvider> RouteResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve one segment, falling back to a straight line on any failure.
    pub async fn resolve_segment(&self, segment: &RouteSegment, row: &ItineraryRow) -> RenderedPath {
        let result = match self.provider.route(segment.waypoints()).await {
            Ok(route) if route.geometry.len() >= 2 => Ok(route),
            Ok(_) => Err(DirectionsError::Malformed(
                "route geometry has fewer than 2 points".to_string(),
            )),
            Err(e) => Err(e),
        };

        match result {
            Ok(route) => {
                debug!(
                    "[RouteResolver] Routed '{}' ({}, {} points)",
                    row.activity,
                    format_distance_km(route.distance_m),
                    route.geometry.len()
                );
                RenderedPath {
                    row: segment.row,
                    kind: PathKind::Routed,
                    popup: routed_popup(row, &route),
                    points: route.geometry,
                    color: segment.color.clone(),
                    dashed: false,
                    distance_m: Some(route.distance_m),
                    duration_s: Some(route.duration_s),
                }
            }
            Err(e) => {
                warn!(
                    "[RouteResolver] Directions failed for '{}' on {}: {}, using straight line",
                    row.activity, row.date, e
                );
                self.fallback(segment, row)
            }
        }
    }

    /// The straight-line path for a segment.
    pub fn fallback(&self, segment: &RouteSegment, row: &ItineraryRow) -> RenderedPath {
        let straight = straight_line_distance(segment.waypoints());
        RenderedPath {
            row: segment.row,
            kind: PathKind::Approximated,
            points: vec![segment.start(), segment.end()],
            color: segment.color.clone(),
            dashed: true,
            distance_m: None,
            duration_s: None,
            popup: approximated_popup(row, straight),
        }
    }

    /// Resolve every segment of a pass, sequentially and in order.
    ///
    /// Stops early, returning `complete: false`, as soon as `token` goes
    /// stale; a result that arrives after its pass was superseded is
    /// dropped rather than returned.
    pub async fn resolve_all(
        &self,
        segments: &[RouteSegment],
        itinerary: &Itinerary,
        token: &PassToken,
    ) -> ResolvedRoutes {
        let mut paths = Vec::with_capacity(segments.len());

        for segment in segments {
            if token.is_stale() {
                info!(
                    "[RouteResolver] Pass {} superseded after {}/{} segments",
                    token.generation(),
                    paths.len(),
                    segments.len()
                );
                return ResolvedRoutes {
                    generation: token.generation(),
                    paths,
                    complete: false,
                };
            }

            let Some(row) = itinerary.get(segment.row) else {
                warn!("[RouteResolver] Segment refers to unknown row {:?}", segment.row);
                continue;
            };

            let path = self.resolve_segment(segment, row).await;
            if token.is_stale() {
                debug!(
                    "[RouteResolver] Discarding late result for pass {}",
                    token.generation()
                );
                continue;
            }
            paths.push(path);
        }

        let approximated = paths.iter().filter(|p| p.is_approximated()).count();
        info!(
            "[RouteResolver] Pass {}: {} paths ({} approximated)",
            token.generation(),
            paths.len(),
            approximated
        );

        ResolvedRoutes {
            generation: token.generation(),
            complete: !token.is_stale(),
            paths,
        }
    }
}
