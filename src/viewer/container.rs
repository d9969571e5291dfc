//! In-memory model of the scrollable page viewport

use super::types::{BatchMode, RenderedPage, ScrollMetrics};

/// Vertical gap between pages, CSS pixels
pub const PAGE_GAP_PX: f32 = 16.0;

/// The viewport's page container plus the little bits of chrome the viewer
/// drives (loading spinner, zoom label, error panel, welcome screen).
#[derive(Debug)]
pub struct PageContainer {
    pages: Vec<RenderedPage>,
    width: f32,
    client_height: f32,
    scroll_top: f32,
    error_panel: Option<String>,
    loading: bool,
    zoom_label: Option<String>,
    welcome_visible: bool,
}

impl PageContainer {
    #[must_use]
    pub fn new(width: f32, client_height: f32) -> Self {
        Self {
            pages: Vec::new(),
            width,
            client_height,
            scroll_top: 0.0,
            error_panel: None,
            loading: false,
            zoom_label: None,
            welcome_visible: true,
        }
    }

    #[must_use]
    pub fn pages(&self) -> &[RenderedPage] {
        &self.pages
    }

    /// Page numbers in container order
    #[must_use]
    pub fn page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.page_number).collect()
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.error_panel = None;
        self.scroll_top = 0.0;
    }

    /// Land a finished batch. Replace batches swap out the whole container
    /// and keep the scroll offset as far as the new content allows.
    pub fn commit(&mut self, mode: BatchMode, pages: Vec<RenderedPage>) {
        if mode == BatchMode::Replace {
            self.pages.clear();
        }
        self.error_panel = None;
        self.pages.extend(pages);
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.pages.clear();
        self.error_panel = Some(message.into());
    }

    #[must_use]
    pub fn error_panel(&self) -> Option<&str> {
        self.error_panel.as_deref()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_zoom_label(&mut self, percentage: u32) {
        self.zoom_label = Some(format!("{percentage}%"));
    }

    #[must_use]
    pub fn zoom_label(&self) -> Option<&str> {
        self.zoom_label.as_deref()
    }

    pub fn set_welcome_visible(&mut self, visible: bool) {
        self.welcome_visible = visible;
        if visible {
            self.zoom_label = None;
        }
    }

    #[must_use]
    pub fn welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    /// Total height of the scrollable content
    #[must_use]
    pub fn scroll_height(&self) -> f32 {
        self.pages.iter().map(|p| p.css_height + PAGE_GAP_PX).sum()
    }

    fn max_scroll_top(&self) -> f32 {
        (self.scroll_height() - self.client_height).max(0.0)
    }

    pub fn scroll_to(&mut self, top: f32) {
        self.scroll_top = top.clamp(0.0, self.max_scroll_top());
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.scroll_top + delta);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.max_scroll_top();
    }

    #[must_use]
    pub fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.scroll_top,
            client_height: self.client_height,
            scroll_height: self.scroll_height(),
        }
    }
}
