//! # Itinerary Engine
//!
//! Stateful controller that owns the loaded itinerary and everything
//! derived from it. Front-ends talk to the engine instead of sharing
//! loose state.
//!
//! ## Passes
//!
//! Every filter change starts a new derivation pass: markers and route
//! segments are rebuilt from scratch over the filtered rows, the
//! committed layers are cleared, and the pass gets a fresh generation id.
//! Route lookups run outside the engine with the pass's [`PassToken`];
//! once a newer pass begins the token reports stale, the resolver stops,
//! and [`ItineraryEngine::commit`] refuses whatever it had produced.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::colors::DayColors;
use crate::config::ViewerConfig;
use crate::error::{ItineraryError, Result};
use crate::filter::{Filter, RegionClassifier};
use crate::grouping::LocationGroups;
use crate::itinerary::{Itinerary, ItineraryRow, RowId};
use crate::resolver::{RenderedPath, ResolvedRoutes};
use crate::routes::{derive_route_segments, DrivingClassifier, RouteSegment};

// ============================================================================
// Generations
// ============================================================================

/// Shared, monotonically increasing pass counter.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Start a new generation, making every earlier token stale.
    pub fn advance(&self) -> PassToken {
        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        PassToken {
            generation,
            counter: Arc::clone(&self.current),
        }
    }
}

/// Identifies one derivation pass.
#[derive(Debug, Clone)]
pub struct PassToken {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl PassToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once a newer pass has started.
    pub fn is_stale(&self) -> bool {
        self.counter.load(Ordering::Acquire) != self.generation
    }
}

// ============================================================================
// Pass State
// ============================================================================

/// Output of [`ItineraryEngine::begin_pass`]: everything needed to draw
/// markers immediately and to resolve routes afterwards.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub token: PassToken,
    /// Filtered row ids in source order
    pub rows: Vec<RowId>,
    pub groups: LocationGroups,
    pub segments: Vec<RouteSegment>,
}

/// The layers currently shown.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub generation: u64,
    pub rows: Vec<RowId>,
    pub groups: LocationGroups,
    pub segments: Vec<RouteSegment>,
    pub paths: Vec<RenderedPath>,
}

// ============================================================================
// Itinerary Engine
// ============================================================================

/// Owns the itinerary, its color map, the current filter and the
/// committed view layers.
pub struct ItineraryEngine {
    config: ViewerConfig,
    itinerary: Itinerary,
    colors: DayColors,
    classifier: DrivingClassifier,
    regions: RegionClassifier,
    filter: Filter,
    generations: GenerationCounter,
    view: ViewState,
}

impl ItineraryEngine {
    /// Create an empty engine. The config is validated first.
    pub fn new(config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: DrivingClassifier::new(&config.driving),
            regions: RegionClassifier::new(&config.regions),
            colors: DayColors::default(),
            itinerary: Itinerary::default(),
            filter: Filter::default(),
            generations: GenerationCounter::new(),
            view: ViewState::default(),
            config,
        })
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the itinerary. Colors are reassigned from the full row
    /// set, the filter resets, and any in-flight pass goes stale.
    pub fn replace_itinerary(&mut self, itinerary: Itinerary) {
        self.colors = DayColors::from_config(itinerary.rows(), &self.config);
        self.itinerary = itinerary;
        self.filter = Filter::default();
        self.generations.advance();
        self.view = ViewState {
            generation: self.generations.current(),
            ..ViewState::default()
        };
    }

    /// Load a CSV itinerary.
    ///
    /// On failure the engine is left empty rather than showing partial or
    /// stale data, and the error is returned for the caller to report.
    pub fn load_csv(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match Itinerary::from_csv_path(path) {
            Ok(itinerary) => {
                self.replace_itinerary(itinerary);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "[ItineraryEngine] Failed to load {}: {}",
                    path.display(),
                    e
                );
                self.replace_itinerary(Itinerary::default());
                Err(e)
            }
        }
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Apply a filter and rebuild markers and route segments from scratch.
    ///
    /// The committed layers are cleared and replaced with the new markers;
    /// route paths stay empty until [`commit`](Self::commit).
    pub fn begin_pass(&mut self, filter: &Filter) -> RenderPass {
        self.filter = filter.clone();
        let token = self.generations.advance();

        let rows = self.filter.apply(self.itinerary.rows(), &self.regions);
        let ids: Vec<RowId> = rows.iter().map(|r| r.id).collect();
        let groups = LocationGroups::build(&rows, &self.colors, self.config.coordinate_precision);
        let segments = derive_route_segments(&rows, &self.classifier, &self.colors);

        info!(
            "[ItineraryEngine] Pass {}: {}/{} rows, {} markers, {} drives",
            token.generation(),
            ids.len(),
            self.itinerary.len(),
            groups.len(),
            segments.len()
        );

        self.view = ViewState {
            generation: token.generation(),
            rows: ids.clone(),
            groups: groups.clone(),
            segments: segments.clone(),
            paths: Vec::new(),
        };

        RenderPass {
            token,
            rows: ids,
            groups,
            segments,
        }
    }

    /// Install resolved paths, unless they belong to a superseded pass.
    pub fn commit(&mut self, resolved: ResolvedRoutes) -> Result<()> {
        let current = self.generations.current();
        if resolved.generation != current {
            return Err(ItineraryError::StalePass {
                generation: resolved.generation,
                current,
            });
        }
        self.view.paths = resolved.paths;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn colors(&self) -> &DayColors {
        &self.colors
    }

    pub fn classifier(&self) -> &DrivingClassifier {
        &self.classifier
    }

    pub fn regions(&self) -> &RegionClassifier {
        &self.regions
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn current_generation(&self) -> u64 {
        self.generations.current()
    }

    /// Rows of the current view, in source order.
    pub fn visible_rows(&self) -> Vec<&ItineraryRow> {
        self.itinerary.select(&self.view.rows)
    }
}

// ============================================================================
// Tests
// ============================================================================
