//! Text / region / date filtering.
//!
//! All active predicates must pass; an unset or blank predicate always
//! passes. Filtering only selects rows, it never reorders them.

use serde::{Deserialize, Serialize};

use crate::config::RegionTable;
use crate::itinerary::ItineraryRow;

/// Location keyword classifier.
///
/// Rules are tried in table order and the first rule with a keyword found
/// in the (lowercased) location wins.
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    rules: Vec<(String, Vec<String>)>,
    fallback: String,
}

impl RegionClassifier {
    pub fn new(table: &RegionTable) -> Self {
        let rules = table
            .rules
            .iter()
            .map(|rule| {
                let keywords = rule
                    .keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_lowercase())
                    .collect();
                (rule.name.clone(), keywords)
            })
            .collect();
        Self {
            rules,
            fallback: table.fallback.clone(),
        }
    }

    /// Region name for a row.
    pub fn classify(&self, row: &ItineraryRow) -> &str {
        let location = row.location.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| location.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Regions that occur in `rows`, in table order with the fallback last.
    pub fn regions_present(&self, rows: &[ItineraryRow]) -> Vec<String> {
        let found: Vec<&str> = rows.iter().map(|r| self.classify(r)).collect();
        let mut regions: Vec<String> = self
            .rules
            .iter()
            .map(|(name, _)| name)
            .filter(|name| found.contains(&name.as_str()))
            .cloned()
            .collect();
        regions.dedup();
        if found.contains(&self.fallback.as_str()) && !regions.contains(&self.fallback) {
            regions.push(self.fallback.clone());
        }
        regions
    }
}

impl Default for RegionClassifier {
    fn default() -> Self {
        Self::new(&RegionTable::default())
    }
}

/// Current filter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Case-insensitive substring of location, activity or notes.
    pub text: Option<String>,
    /// Exact region name.
    pub region: Option<String>,
    /// Exact date string.
    pub date: Option<String>,
}

/// A predicate is active when its value is not blank.
fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Filter {
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    /// True when no predicate is active.
    pub fn is_empty(&self) -> bool {
        active(&self.text).is_none() && active(&self.region).is_none() && active(&self.date).is_none()
    }

    /// Check one row against every active predicate.
    pub fn matches(&self, row: &ItineraryRow, regions: &RegionClassifier) -> bool {
        // Surrounding whitespace in the query is part of the substring
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            let haystack = format!("{} {} {}", row.location, row.activity, row.notes).to_lowercase();
            if !haystack.contains(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(region) = active(&self.region) {
            if regions.classify(row) != region {
                return false;
            }
        }
        if let Some(date) = active(&self.date) {
            if row.date != date {
                return false;
            }
        }
        true
    }

    /// Rows passing the filter, in original order.
    pub fn apply<'a>(
        &self,
        rows: &'a [ItineraryRow],
        regions: &RegionClassifier,
    ) -> Vec<&'a ItineraryRow> {
        rows.iter().filter(|r| self.matches(r, regions)).collect()
    }
}
