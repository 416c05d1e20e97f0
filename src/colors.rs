//! Stable per-date display colors.

use std::collections::{BTreeSet, HashMap};

use crate::config::ViewerConfig;
use crate::itinerary::ItineraryRow;

/// Date -> color mapping.
///
/// Built from the full itinerary so that filtering never shifts a date
/// onto a different color: the palette index is the date's position in
/// the globally sorted list of distinct dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayColors {
    colors: HashMap<String, String>,
    default_color: String,
}

impl DayColors {
    /// Assign `palette[i % len]` to the i-th distinct date in ascending
    /// string order.
    pub fn assign<'a, I>(rows: I, palette: &[String], default_color: &str) -> Self
    where
        I: IntoIterator<Item = &'a ItineraryRow>,
    {
        let dates: BTreeSet<&str> = rows.into_iter().map(|r| r.date.as_str()).collect();

        let colors = if palette.is_empty() {
            HashMap::new()
        } else {
            dates
                .into_iter()
                .enumerate()
                .map(|(i, date)| (date.to_string(), palette[i % palette.len()].clone()))
                .collect()
        };

        Self {
            colors,
            default_color: default_color.to_string(),
        }
    }

    /// Assign using the palette and default color from a config.
    pub fn from_config<'a, I>(rows: I, config: &ViewerConfig) -> Self
    where
        I: IntoIterator<Item = &'a ItineraryRow>,
    {
        Self::assign(rows, &config.palette, &config.default_color)
    }

    /// Color for a date, or the default color for unknown dates.
    pub fn color_for(&self, date: &str) -> &str {
        self.colors
            .get(date)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
