//! Scroll-triggered pagination guard
//!
//! Scroll events arrive far faster than pages render. The coordinator is the
//! only thing standing between them and overlapping batches: it admits one
//! batch, then refuses everything until that batch reports back.

use super::types::{RenderBatchRequest, ScrollMetrics};

/// Distance from the bottom, in CSS pixels, that triggers the next batch
pub const DEFAULT_SCROLL_THRESHOLD_PX: f32 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollPhase {
    #[default]
    Idle,
    /// A batch is in flight
    Loading(RenderBatchRequest),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollCoordinator {
    phase: ScrollPhase,
    threshold: f32,
}

impl Default for ScrollCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD_PX)
    }
}

impl ScrollCoordinator {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            phase: ScrollPhase::Idle,
            threshold: threshold.max(0.0),
        }
    }

    #[must_use]
    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ScrollPhase::Loading(_))
    }

    /// The batch currently in flight, if any
    #[must_use]
    pub fn in_flight(&self) -> Option<RenderBatchRequest> {
        match self.phase {
            ScrollPhase::Loading(request) => Some(request),
            ScrollPhase::Idle => None,
        }
    }

    /// Whether a scroll event at `metrics` should start a new batch.
    #[must_use]
    pub fn should_load(&self, metrics: &ScrollMetrics, pages_rendered: usize, total: usize) -> bool {
        !self.is_loading() && pages_rendered < total && metrics.near_bottom(self.threshold)
    }

    /// `idle -> loading`. Returns false if a batch is already in flight.
    pub fn begin(&mut self, request: RenderBatchRequest) -> bool {
        if self.is_loading() {
            return false;
        }
        self.phase = ScrollPhase::Loading(request);
        true
    }

    /// `loading -> idle`, unconditionally
    pub fn finish(&mut self) -> Option<RenderBatchRequest> {
        let request = self.in_flight();
        self.phase = ScrollPhase::Idle;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::{BatchMode, Generation};
    use super::*;

    fn request(start: usize, end: usize) -> RenderBatchRequest {
        RenderBatchRequest {
            generation: Generation(1),
            start_page: start,
            end_page: end,
            mode: BatchMode::Append,
        }
    }

    fn at_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 900.0,
            client_height: 100.0,
            scroll_height: 1000.0,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let coordinator = ScrollCoordinator::default();
        let metrics = ScrollMetrics {
            scroll_top: 800.0,
            client_height: 100.0,
            scroll_height: 1000.0,
        };
        assert!(coordinator.should_load(&metrics, 3, 10));

        let above = ScrollMetrics {
            scroll_top: 799.0,
            ..metrics
        };
        assert!(!coordinator.should_load(&above, 3, 10));
    }

    #[test]
    fn nothing_to_load_when_all_pages_rendered() {
        let coordinator = ScrollCoordinator::default();
        assert!(!coordinator.should_load(&at_bottom(), 10, 10));
    }

    #[test]
    fn loading_rejects_new_batches_until_finished() {
        let mut coordinator = ScrollCoordinator::default();
        assert!(coordinator.begin(request(4, 5)));
        assert!(!coordinator.should_load(&at_bottom(), 3, 10));
        assert!(!coordinator.begin(request(4, 5)));

        assert_eq!(coordinator.finish(), Some(request(4, 5)));
        assert_eq!(coordinator.phase(), ScrollPhase::Idle);
        assert!(coordinator.should_load(&at_bottom(), 5, 10));
    }
}
