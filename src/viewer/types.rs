//! Core types for progressive page rendering

use std::fmt;

/// Session generation. Bumped every time a document is opened or closed so
/// completions belonging to an earlier session can be recognised and dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// How a batch lands in the page container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    /// Append after the pages already materialized (scroll pagination)
    Append,
    /// Clear the container first and render from page 1 (zoom / resize)
    Replace,
}

/// A contiguous, 1-based, inclusive range of pages to render in one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderBatchRequest {
    pub generation: Generation,
    pub start_page: usize,
    pub end_page: usize,
    pub mode: BatchMode,
}

impl RenderBatchRequest {
    /// Next append batch after `pages_rendered`, clipped to the document.
    /// Returns `None` when every page is already rendered.
    #[must_use]
    pub fn append(
        generation: Generation,
        pages_rendered: usize,
        count: usize,
        total_pages: usize,
    ) -> Option<Self> {
        let start_page = pages_rendered.saturating_add(1);
        let end_page = total_pages.min(pages_rendered.saturating_add(count));
        (count > 0 && start_page <= end_page).then_some(Self {
            generation,
            start_page,
            end_page,
            mode: BatchMode::Append,
        })
    }

    /// Replace batch covering pages `1..=window_end`.
    #[must_use]
    pub fn replace(generation: Generation, window_end: usize) -> Option<Self> {
        (window_end > 0).then_some(Self {
            generation,
            start_page: 1,
            end_page: window_end,
            mode: BatchMode::Replace,
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.end_page + 1 - self.start_page
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> {
        self.start_page..=self.end_page
    }
}

/// Scroll position of the viewport, in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub client_height: f32,
    pub scroll_height: f32,
}

impl ScrollMetrics {
    /// True when the bottom edge of the viewport is within `threshold` px of
    /// the end of the scrollable content.
    #[must_use]
    pub fn near_bottom(&self, threshold: f32) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - threshold
    }
}

/// Page size at a given scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Geometry inputs shared by every page of a batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    /// Viewport width in CSS pixels
    pub viewport_width: f32,
    /// Horizontal padding subtracted from the viewport width
    pub padding: f32,
    pub device_pixel_ratio: f32,
    pub scale_multiplier: f32,
}

impl PageLayout {
    /// Width available to a page
    #[must_use]
    pub fn available_width(&self) -> f32 {
        (self.viewport_width - self.padding).max(1.0)
    }

    /// Scale that makes a page of `intrinsic_width` fill the available width
    #[must_use]
    pub fn fit_scale(&self, intrinsic_width: f32) -> f32 {
        if intrinsic_width <= 0.0 || !intrinsic_width.is_finite() {
            return 1.0;
        }
        self.available_width() / intrinsic_width
    }

    /// Fit scale times zoom multiplier times device pixel ratio
    #[must_use]
    pub fn final_scale(&self, intrinsic_width: f32) -> f32 {
        self.fit_scale(intrinsic_width) * self.scale_multiplier * self.device_pixel_ratio
    }
}

/// Rasterized page bitmap
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RasterSurface {
    pub width_px: u32,
    pub height_px: u32,
    /// RGB, 3 bytes per pixel
    pub pixels: Vec<u8>,
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("pixels_len", &self.pixels.len())
            .finish()
    }
}

/// A run of text in unscaled page coordinates, as reported by the engine
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Text model of a page at scale 1
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

/// Positioned glyph run in the overlay, in device pixels
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Selectable text overlay aligned with the raster beneath it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayer {
    pub scale: f32,
    pub spans: Vec<TextSpan>,
}

impl TextLayer {
    /// Project `content` onto the raster at `scale`
    #[must_use]
    pub fn layout(content: &TextContent, scale: f32) -> Self {
        let spans = content
            .items
            .iter()
            .map(|item| TextSpan {
                text: item.text.clone(),
                left: item.x * scale,
                top: item.y * scale,
                width: item.width * scale,
                height: item.height * scale,
            })
            .collect();
        Self { scale, spans }
    }

    /// Concatenated text of the overlay, one span per line
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One materialized page in the viewport
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPage {
    /// 1-based page number
    pub page_number: usize,
    pub final_scale: f32,
    /// Display size in CSS pixels (raster size divided by device pixel ratio)
    pub css_width: f32,
    pub css_height: f32,
    pub raster: RasterSurface,
    pub text_layer: TextLayer,
}
