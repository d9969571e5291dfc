//! Viewer session state
//!
//! Pure state machine: commands go in, effects come out. The [`Viewer`]
//! service executes the effects against the page container and the decode
//! collaborator.
//!
//! [`Viewer`]: super::Viewer

use serde::{Deserialize, Serialize};

use super::scroll::{DEFAULT_SCROLL_THRESHOLD_PX, ScrollCoordinator};
use super::types::{BatchMode, Generation, PageLayout, RenderBatchRequest, ScrollMetrics};
use super::zoom::Zoom;

/// Tunables for the viewer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pages rendered when a document is opened
    pub initial_pages: usize,
    /// Pages appended per scroll-triggered batch
    pub pages_per_batch: usize,
    /// Most pages a zoom/resize replace pass will re-render
    pub rerender_cap: usize,
    pub zoom_step: f32,
    pub min_scale: f32,
    pub scroll_threshold_px: f32,
    /// Horizontal padding inside the viewport
    pub viewport_padding_px: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub device_pixel_ratio: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_pages: 3,
            pages_per_batch: 2,
            rerender_cap: 5,
            zoom_step: Zoom::DEFAULT_STEP,
            min_scale: Zoom::DEFAULT_MIN_SCALE,
            scroll_threshold_px: DEFAULT_SCROLL_THRESHOLD_PX,
            viewport_padding_px: 32.0,
            viewport_width: 800.0,
            viewport_height: 1000.0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl ViewerConfig {
    /// Replace values the viewer cannot work with (zero batch sizes,
    /// non-positive sizes or ratios, NaN) by their defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            initial_pages: nonzero(self.initial_pages, defaults.initial_pages),
            pages_per_batch: nonzero(self.pages_per_batch, defaults.pages_per_batch),
            rerender_cap: nonzero(self.rerender_cap, defaults.rerender_cap),
            zoom_step: positive(self.zoom_step, defaults.zoom_step),
            min_scale: positive(self.min_scale, defaults.min_scale),
            scroll_threshold_px: non_negative(
                self.scroll_threshold_px,
                defaults.scroll_threshold_px,
            ),
            viewport_padding_px: non_negative(
                self.viewport_padding_px,
                defaults.viewport_padding_px,
            ),
            viewport_width: positive(self.viewport_width, defaults.viewport_width),
            viewport_height: positive(self.viewport_height, defaults.viewport_height),
            device_pixel_ratio: positive(self.device_pixel_ratio, defaults.device_pixel_ratio),
        }
    }
}

fn nonzero(value: usize, fallback: usize) -> usize {
    if value == 0 { fallback } else { value }
}

fn positive(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn non_negative(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

/// Completion report of a render batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub request: RenderBatchRequest,
    pub rendered: usize,
    pub failed: usize,
}

/// State of the currently open document
#[derive(Clone, Debug)]
pub struct ViewerState {
    pub generation: Generation,
    pub document_loaded: bool,
    pub total_pages: usize,
    /// Pages materialized in the container, always `<= total_pages`
    pub pages_rendered: usize,
    pub zoom: Zoom,
    pub scroll: ScrollCoordinator,
    /// A replace pass was requested while another batch was in flight
    pub pending_replace: bool,
    pub viewport_width: f32,
    config: ViewerConfig,
}

impl ViewerState {
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        let config = config.normalized();
        Self {
            generation: Generation::default(),
            document_loaded: false,
            total_pages: 0,
            pages_rendered: 0,
            zoom: Zoom::new(config.zoom_step, config.min_scale),
            scroll: ScrollCoordinator::new(config.scroll_threshold_px),
            pending_replace: false,
            viewport_width: config.viewport_width,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Whether a render batch is in flight
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.scroll.is_loading()
    }

    /// Geometry inputs for the next batch
    #[must_use]
    pub fn layout(&self) -> PageLayout {
        PageLayout {
            viewport_width: self.viewport_width,
            padding: self.config.viewport_padding_px,
            device_pixel_ratio: self.config.device_pixel_ratio,
            scale_multiplier: self.zoom.multiplier(),
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Open => {
                self.reset_session();
                vec![
                    Effect::ShowWelcome(false),
                    Effect::ClearContainer,
                    Effect::ShowLoading(true),
                ]
            }

            Command::Loaded { total_pages } => {
                self.document_loaded = true;
                self.total_pages = total_pages;
                self.pages_rendered = 0;
                match RenderBatchRequest::append(
                    self.generation,
                    0,
                    self.config.initial_pages,
                    total_pages,
                ) {
                    Some(request) => self.begin_batch(request),
                    None => vec![
                        Effect::ShowLoading(false),
                        Effect::UpdateZoomLabel(self.zoom.percentage()),
                    ],
                }
            }

            Command::LoadFailed => {
                self.document_loaded = false;
                self.total_pages = 0;
                self.pages_rendered = 0;
                self.pending_replace = false;
                self.scroll.finish();
                vec![Effect::ShowLoading(false)]
            }

            Command::Scrolled(metrics) => self.on_scroll(&metrics),

            Command::ZoomIn => {
                if !self.document_loaded {
                    return vec![];
                }
                self.zoom.step_in();
                self.request_replace()
            }

            Command::ZoomOut => {
                if !self.document_loaded || !self.zoom.step_out() {
                    return vec![];
                }
                self.request_replace()
            }

            Command::Resized { width } => {
                if !width.is_finite() || width <= 0.0 {
                    return vec![];
                }
                if (self.viewport_width - width).abs() < f32::EPSILON {
                    return vec![];
                }
                self.viewport_width = width;
                if !self.document_loaded {
                    return vec![];
                }
                self.request_replace()
            }

            Command::BatchFinished(report) => self.on_batch_finished(report),

            Command::Close => {
                self.reset_session();
                vec![
                    Effect::ClearContainer,
                    Effect::ShowLoading(false),
                    Effect::ShowWelcome(true),
                ]
            }
        }
    }

    fn reset_session(&mut self) {
        self.generation = self.generation.next();
        self.document_loaded = false;
        self.total_pages = 0;
        self.pages_rendered = 0;
        self.pending_replace = false;
        self.zoom.reset();
        self.scroll.finish();
    }

    fn on_scroll(&mut self, metrics: &ScrollMetrics) -> Vec<Effect> {
        if !self.document_loaded
            || !self
                .scroll
                .should_load(metrics, self.pages_rendered, self.total_pages)
        {
            return vec![];
        }

        match RenderBatchRequest::append(
            self.generation,
            self.pages_rendered,
            self.config.pages_per_batch,
            self.total_pages,
        ) {
            Some(request) => self.begin_batch(request),
            None => vec![],
        }
    }

    fn begin_batch(&mut self, request: RenderBatchRequest) -> Vec<Effect> {
        if !self.scroll.begin(request) {
            return vec![];
        }
        vec![Effect::ShowLoading(true), Effect::RenderBatch(request)]
    }

    fn request_replace(&mut self) -> Vec<Effect> {
        if self.scroll.is_loading() {
            self.pending_replace = true;
            return vec![Effect::UpdateZoomLabel(self.zoom.percentage())];
        }

        let window = self.pages_rendered.min(self.config.rerender_cap);
        match RenderBatchRequest::replace(self.generation, window) {
            Some(request) => self.begin_batch(request),
            None => vec![Effect::UpdateZoomLabel(self.zoom.percentage())],
        }
    }

    fn on_batch_finished(&mut self, report: BatchReport) -> Vec<Effect> {
        if report.request.generation != self.generation
            || self.scroll.in_flight() != Some(report.request)
        {
            return vec![];
        }
        self.scroll.finish();

        let end = report.request.end_page.min(self.total_pages);
        self.pages_rendered = match report.request.mode {
            BatchMode::Append => self.pages_rendered.max(end),
            BatchMode::Replace => end,
        };

        let mut effects = vec![
            Effect::Commit(report.request),
            Effect::UpdateZoomLabel(self.zoom.percentage()),
            Effect::ShowLoading(false),
        ];

        if self.pending_replace {
            self.pending_replace = false;
            effects.extend(self.request_replace());
        }

        effects
    }
}

/// Commands that modify viewer state
#[derive(Clone, Debug)]
pub enum Command {
    /// A document is about to be decoded; starts a new session
    Open,
    /// Decoding succeeded
    Loaded { total_pages: usize },
    /// Decoding failed
    LoadFailed,
    /// The viewport scrolled
    Scrolled(ScrollMetrics),
    ZoomIn,
    ZoomOut,
    /// The viewport width changed
    Resized { width: f32 },
    /// A render batch completed, successfully or not
    BatchFinished(BatchReport),
    /// The open document was closed
    Close,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    ShowWelcome(bool),
    /// Remove every page from the container
    ClearContainer,
    ShowLoading(bool),
    /// Start a render batch
    RenderBatch(RenderBatchRequest),
    /// Land a finished batch in the container
    Commit(RenderBatchRequest),
    UpdateZoomLabel(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 950.0,
            client_height: 50.0,
            scroll_height: 1000.0,
        }
    }

    fn render_request(effects: &[Effect]) -> Option<RenderBatchRequest> {
        effects.iter().find_map(|e| match e {
            Effect::RenderBatch(r) => Some(*r),
            _ => None,
        })
    }

    fn finish(state: &mut ViewerState, request: RenderBatchRequest) -> Vec<Effect> {
        state.apply(Command::BatchFinished(BatchReport {
            request,
            rendered: request.page_count(),
            failed: 0,
        }))
    }

    fn opened(total_pages: usize) -> ViewerState {
        let mut state = ViewerState::new(ViewerConfig::default());
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::Loaded { total_pages });
        if let Some(request) = render_request(&effects) {
            let _ = finish(&mut state, request);
        }
        state
    }

    #[test]
    fn ten_page_document_paginates_in_batches_of_two() {
        let mut state = opened(10);
        assert_eq!(state.pages_rendered, 3);

        for expected in [5, 7, 9, 10] {
            let effects = state.apply(Command::Scrolled(near_bottom()));
            let request = render_request(&effects).expect("batch should start");
            let _ = finish(&mut state, request);
            assert_eq!(state.pages_rendered, expected);
        }

        assert!(state.apply(Command::Scrolled(near_bottom())).is_empty());
        assert_eq!(state.pages_rendered, 10);
    }

    #[test]
    fn scroll_during_batch_is_ignored() {
        let mut state = opened(10);
        let first = state.apply(Command::Scrolled(near_bottom()));
        assert!(render_request(&first).is_some());
        assert!(state.is_rendering());

        for _ in 0..20 {
            assert!(state.apply(Command::Scrolled(near_bottom())).is_empty());
        }
    }

    #[test]
    fn scroll_far_from_bottom_does_nothing() {
        let mut state = opened(10);
        let metrics = ScrollMetrics {
            scroll_top: 0.0,
            client_height: 100.0,
            scroll_height: 5000.0,
        };
        assert!(state.apply(Command::Scrolled(metrics)).is_empty());
    }

    #[test]
    fn open_resets_session() {
        let mut state = opened(10);
        let _ = state.apply(Command::ZoomIn);
        let request = state.scroll.in_flight().expect("replace pass");
        let _ = finish(&mut state, request);
        let before = state.generation;

        let effects = state.apply(Command::Open);
        assert_eq!(state.pages_rendered, 0);
        assert_eq!(state.zoom.multiplier(), 1.0);
        assert!(state.generation > before);
        assert!(effects.contains(&Effect::ClearContainer));
    }

    #[test]
    fn zoom_without_document_is_noop() {
        let mut state = ViewerState::new(ViewerConfig::default());
        assert!(state.apply(Command::ZoomIn).is_empty());
        assert!(state.apply(Command::ZoomOut).is_empty());
        assert_eq!(state.zoom.multiplier(), 1.0);
    }

    #[test]
    fn zoom_replaces_materialized_window() {
        let mut state = opened(10);
        let effects = state.apply(Command::ZoomIn);
        let request = render_request(&effects).expect("replace batch");
        assert_eq!(request.mode, BatchMode::Replace);
        assert_eq!((request.start_page, request.end_page), (1, 3));

        let effects = finish(&mut state, request);
        assert!(effects.contains(&Effect::UpdateZoomLabel(120)));
        assert_eq!(state.pages_rendered, 3);
    }

    #[test]
    fn replace_window_is_capped() {
        let mut state = opened(10);
        for _ in 0..3 {
            let effects = state.apply(Command::Scrolled(near_bottom()));
            let request = render_request(&effects).expect("batch");
            let _ = finish(&mut state, request);
        }
        assert_eq!(state.pages_rendered, 9);

        let effects = state.apply(Command::ZoomOut);
        let request = render_request(&effects).expect("replace batch");
        assert_eq!(request.end_page, 5);
        let _ = finish(&mut state, request);
        assert_eq!(state.pages_rendered, 5);
    }

    #[test]
    fn zoom_during_batch_is_deferred() {
        let mut state = opened(10);
        let effects = state.apply(Command::Scrolled(near_bottom()));
        let append = render_request(&effects).expect("append batch");

        let effects = state.apply(Command::ZoomIn);
        assert!(render_request(&effects).is_none());
        assert!(state.pending_replace);

        let effects = finish(&mut state, append);
        let replace = render_request(&effects).expect("deferred replace");
        assert_eq!(replace.mode, BatchMode::Replace);
        assert_eq!(replace.end_page, 5);
        assert!(!state.pending_replace);
    }

    #[test]
    fn stale_batch_completion_is_discarded() {
        let mut state = opened(10);
        let effects = state.apply(Command::Scrolled(near_bottom()));
        let stale = render_request(&effects).expect("batch");

        let _ = state.apply(Command::Open);
        let _ = state.apply(Command::Loaded { total_pages: 4 });
        let pages_before = state.pages_rendered;

        assert!(finish(&mut state, stale).is_empty());
        assert_eq!(state.pages_rendered, pages_before);
    }

    #[test]
    fn zoom_out_at_floor_is_noop() {
        let mut state = opened(10);
        for _ in 0..3 {
            let effects = state.apply(Command::ZoomOut);
            let request = render_request(&effects).expect("replace");
            let _ = finish(&mut state, request);
        }
        assert_eq!(state.zoom.percentage(), 40);
        assert!(state.apply(Command::ZoomOut).is_empty());
    }

    #[test]
    fn resize_to_same_width_is_noop() {
        let mut state = opened(10);
        let width = state.viewport_width;
        assert!(state.apply(Command::Resized { width }).is_empty());

        let effects = state.apply(Command::Resized { width: width + 100.0 });
        assert!(render_request(&effects).is_some());
    }

    #[test]
    fn unusable_config_values_fall_back_to_defaults() {
        let config = ViewerConfig {
            pages_per_batch: 0,
            device_pixel_ratio: 0.0,
            viewport_width: -20.0,
            viewport_padding_px: f32::NAN,
            rerender_cap: 7,
            ..ViewerConfig::default()
        }
        .normalized();

        assert_eq!(config.pages_per_batch, 2);
        assert_eq!(config.device_pixel_ratio, 1.0);
        assert_eq!(config.viewport_width, 800.0);
        assert_eq!(config.viewport_padding_px, 32.0);
        assert_eq!(config.rerender_cap, 7);
    }

    #[test]
    fn huge_batch_size_is_clipped_to_the_document() {
        let mut state = ViewerState::new(ViewerConfig {
            pages_per_batch: usize::MAX,
            ..ViewerConfig::default()
        });
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::Loaded { total_pages: 10 });
        let initial = render_request(&effects).expect("initial batch");
        let _ = finish(&mut state, initial);

        let effects = state.apply(Command::Scrolled(near_bottom()));
        let request = render_request(&effects).expect("append batch");
        assert_eq!((request.start_page, request.end_page), (4, 10));
    }

    #[test]
    fn non_positive_resize_is_ignored() {
        let mut state = opened(10);
        assert!(state.apply(Command::Resized { width: 0.0 }).is_empty());
        assert!(state.apply(Command::Resized { width: f32::NAN }).is_empty());
        assert_eq!(state.viewport_width, 800.0);
    }

    #[test]
    fn replace_pass_shrinks_pages_rendered_to_the_window() {
        let mut state = opened(10);
        for _ in 0..3 {
            let effects = state.apply(Command::Scrolled(near_bottom()));
            let request = render_request(&effects).expect("append batch");
            let _ = finish(&mut state, request);
        }
        assert_eq!(state.pages_rendered, 9);

        let effects = state.apply(Command::ZoomIn);
        let request = render_request(&effects).expect("replace batch");
        assert_eq!((request.start_page, request.end_page), (1, 5));
        let _ = finish(&mut state, request);
        assert_eq!(state.pages_rendered, 5);
    }

    #[test]
    fn empty_document_renders_nothing() {
        let mut state = ViewerState::new(ViewerConfig::default());
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::Loaded { total_pages: 0 });
        assert!(render_request(&effects).is_none());
        assert!(!state.is_rendering());
    }

    #[test]
    fn load_failure_releases_guard() {
        let mut state = ViewerState::new(ViewerConfig::default());
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::LoadFailed);
        assert_eq!(effects, vec![Effect::ShowLoading(false)]);
        assert!(!state.document_loaded);
        assert!(!state.is_rendering());
    }
}
