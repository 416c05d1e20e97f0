//! Unified error handling for the trip-itinerary library.
//!
//! Most failures in the viewer are local and non-fatal: malformed
//! coordinates are skipped, directions failures fall back to straight
//! lines. The errors here are the ones a caller actually has to handle.

use thiserror::Error;

/// Unified error type for itinerary operations.
#[derive(Debug, Error)]
pub enum ItineraryError {
    /// Reading a source or config file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The itinerary source is not valid CSV
    #[error("Itinerary parse error: {0}")]
    Csv(#[from] csv::Error),

    /// A required header is absent from the itinerary source
    #[error("Itinerary is missing required column '{column}'")]
    MissingColumn { column: String },

    /// Serializing or deserializing JSON failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is unusable
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Notes storage could not be read or written
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Directions lookup failed
    #[error("{}", directions_message(.message, .status_code))]
    Directions {
        message: String,
        status_code: Option<u16>,
    },

    /// Results belong to a derivation pass that has since been replaced
    #[error("Pass {generation} is stale (current generation is {current})")]
    StalePass { generation: u64, current: u64 },

    /// No notes exist for the given location
    #[error("No notes for location '{0}'")]
    UnknownLocation(String),
}

fn directions_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("Directions error ({}): {}", code, message),
        None => format!("Directions error: {}", message),
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for ItineraryError {
    fn from(e: rusqlite::Error) -> Self {
        ItineraryError::Storage {
            message: e.to_string(),
        }
    }
}

/// Result type alias for itinerary operations.
pub type Result<T> = std::result::Result<T, ItineraryError>;
