//! HTTP client for an OSRM-compatible directions server.
//!
//! One request per drive segment, no retries and no caching: a failed
//! lookup is reported to the resolver, which draws a straight line.

use std::time::{Duration, Instant};

use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::config::DirectionsConfig;
use crate::error::{ItineraryError, Result};
use crate::resolver::{DirectionsError, DirectionsProvider, DirectionsRoute};
use crate::GeoPoint;

/// API response for the route service
#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

/// GeoJSON LineString, coordinates in [lng, lat] order
#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Parse a route service body into the best (first) route.
pub(crate) fn parse_route_response(body: &str) -> std::result::Result<DirectionsRoute, DirectionsError> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| DirectionsError::Malformed(e.to_string()))?;

    if response.code != "Ok" {
        return Err(DirectionsError::Malformed(format!(
            "{}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }

    let best = response
        .routes
        .into_iter()
        .next()
        .ok_or(DirectionsError::NoRoute)?;

    Ok(DirectionsRoute {
        geometry: best
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint::new(lat, lng))
            .collect(),
        distance_m: best.distance,
        duration_s: best.duration,
    })
}

/// Directions lookups against an OSRM `route` service.
pub struct OsrmClient {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    /// Create a client from directions settings.
    pub fn new(config: &DirectionsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ItineraryError::Directions {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
        })
    }

    /// Request URL for the given waypoints.
    pub fn route_url(&self, waypoints: &[GeoPoint]) -> String {
        let coords: Vec<String> = waypoints
            .iter()
            .map(|p| format!("{},{}", p.longitude, p.latitude))
            .collect();
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.base_url,
            self.profile,
            coords.join(";")
        )
    }
}

impl DirectionsProvider for OsrmClient {
    async fn route(&self, waypoints: &[GeoPoint]) -> std::result::Result<DirectionsRoute, DirectionsError> {
        if waypoints.len() < 2 {
            return Err(DirectionsError::NoRoute);
        }

        let url = self.route_url(waypoints);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectionsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectionsError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DirectionsError::Network(e.to_string()))?;

        debug!(
            "[OsrmClient] {} waypoints answered in {} ms",
            waypoints.len(),
            start.elapsed().as_millis()
        );

        parse_route_response(&body)
    }
}
