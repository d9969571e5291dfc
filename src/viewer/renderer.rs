//! Page range rendering
//!
//! Shared by both entry points: append (scroll pagination) and replace
//! (zoom / resize). A batch renders its pages into a detached fragment; the
//! viewer commits the fragment to the page container once the batch is done
//! and only if it still belongs to the current session.

use std::rc::Rc;

use log::{debug, warn};

use super::engine::{EngineError, LoadedDocument, PdfPage};
use super::types::{PageLayout, RenderBatchRequest, RenderedPage, TextLayer};

/// Result of one render batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub request: RenderBatchRequest,
    /// Successfully rendered pages, ascending
    pub pages: Vec<RenderedPage>,
    /// Pages that failed to render
    pub failed_pages: Vec<usize>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed_pages.is_empty()
    }
}

/// Self-contained unit of render work.
///
/// Owns everything it needs, so it can run as a separate task while the
/// viewer keeps receiving scroll and zoom events.
pub struct BatchJob<D> {
    pub request: RenderBatchRequest,
    pub layout: PageLayout,
    document: Rc<D>,
}

impl<D: LoadedDocument> BatchJob<D> {
    pub(crate) fn new(request: RenderBatchRequest, layout: PageLayout, document: Rc<D>) -> Self {
        Self {
            request,
            layout,
            document,
        }
    }

    pub async fn run(self) -> BatchOutcome {
        render_page_range(self.document.as_ref(), &self.request, &self.layout).await
    }
}

impl<D> std::fmt::Debug for BatchJob<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchJob")
            .field("request", &self.request)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Render `request.start_page..=request.end_page` in ascending order.
///
/// A page that fails is recorded in `failed_pages` and skipped; the rest of
/// the batch still renders.
pub async fn render_page_range<D: LoadedDocument>(
    doc: &D,
    request: &RenderBatchRequest,
    layout: &PageLayout,
) -> BatchOutcome {
    debug!(
        "rendering pages {}..={} ({:?}, {})",
        request.start_page, request.end_page, request.mode, request.generation
    );

    let mut pages = Vec::with_capacity(request.page_count());
    let mut failed_pages = Vec::new();

    for page_number in request.pages() {
        match render_page(doc, page_number, layout).await {
            Ok(page) => pages.push(page),
            Err(e) => {
                warn!("page {page_number} skipped: {e}");
                failed_pages.push(page_number);
            }
        }
    }

    BatchOutcome {
        request: *request,
        pages,
        failed_pages,
    }
}

async fn render_page<D: LoadedDocument>(
    doc: &D,
    page_number: usize,
    layout: &PageLayout,
) -> Result<RenderedPage, EngineError> {
    let total = doc.total_pages();
    if page_number == 0 || page_number > total {
        return Err(EngineError::PageOutOfRange {
            page: page_number,
            total,
        });
    }

    let page = doc.page(page_number).await?;
    let intrinsic = page.viewport(1.0);
    let final_scale = layout.final_scale(intrinsic.width);
    let geometry = page.viewport(final_scale);

    // Raster and text layer are issued together; both use `final_scale` so
    // overlay glyphs sit on top of the pixels they describe.
    let (raster, text) = tokio::join!(page.render(&geometry), page.text_content());
    let raster = raster?;
    let text_layer = match text {
        Ok(content) => TextLayer::layout(&content, final_scale),
        Err(e) => {
            warn!("page {page_number}: text layer unavailable: {e}");
            TextLayer {
                scale: final_scale,
                spans: Vec::new(),
            }
        }
    };

    let dpr = layout.device_pixel_ratio.max(f32::EPSILON);
    Ok(RenderedPage {
        page_number,
        final_scale,
        css_width: geometry.width / dpr,
        css_height: geometry.height / dpr,
        raster,
        text_layer,
    })
}
