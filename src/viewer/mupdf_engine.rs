//! MuPDF-backed decode collaborator

use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap, TextPageFlags};

use super::engine::{DocumentSource, EngineError, LoadedDocument, PdfEngine, PdfPage};
use super::types::{PageGeometry, RasterSurface, TextContent, TextItem};

/// Decodes PDFs with MuPDF. Remote URLs are not fetched here; callers pass
/// filesystem paths or the bytes themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfEngine;

impl PdfEngine for MupdfEngine {
    type Document = MupdfDocument;

    async fn load(&self, source: &DocumentSource) -> Result<MupdfDocument, EngineError> {
        let doc = match source {
            DocumentSource::Url(url) => {
                if url.starts_with("http://") || url.starts_with("https://") {
                    return Err(EngineError::UnsupportedSource(url.clone()));
                }
                let path = url.strip_prefix("file://").unwrap_or(url);
                Document::open(path).map_err(|e| EngineError::Decode(e.to_string()))?
            }
            DocumentSource::Blob(bytes) => Document::from_bytes(bytes, "application/pdf")
                .map_err(|e| EngineError::Decode(e.to_string()))?,
        };
        let total_pages = doc
            .page_count()
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(MupdfDocument {
            doc,
            total_pages: usize::try_from(total_pages).unwrap_or(0),
        })
    }
}

pub struct MupdfDocument {
    doc: Document,
    total_pages: usize,
}

impl LoadedDocument for MupdfDocument {
    type Page = MupdfPage;

    fn total_pages(&self) -> usize {
        self.total_pages
    }

    async fn page(&self, number: usize) -> Result<MupdfPage, EngineError> {
        if number == 0 || number > self.total_pages {
            return Err(EngineError::PageOutOfRange {
                page: number,
                total: self.total_pages,
            });
        }
        let render_err = |e: mupdf::error::Error| EngineError::Render {
            page: number,
            detail: e.to_string(),
        };
        let page = self.doc.load_page((number - 1) as i32).map_err(render_err)?;
        let bounds = page.bounds().map_err(render_err)?;
        Ok(MupdfPage {
            page,
            number,
            origin: (bounds.x0, bounds.y0),
            size: (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0),
        })
    }
}

pub struct MupdfPage {
    page: Page,
    number: usize,
    origin: (f32, f32),
    size: (f32, f32),
}

impl PdfPage for MupdfPage {
    fn viewport(&self, scale: f32) -> PageGeometry {
        PageGeometry {
            width: self.size.0 * scale,
            height: self.size.1 * scale,
            scale,
        }
    }

    async fn render(&self, geometry: &PageGeometry) -> Result<RasterSurface, EngineError> {
        let matrix = Matrix::new_scale(geometry.scale, geometry.scale);
        let pixmap = self
            .page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)
            .map_err(|e| self.render_error(e.to_string()))?;
        let pixels = pixmap_to_rgb(&pixmap).map_err(|detail| self.render_error(detail))?;
        Ok(RasterSurface {
            width_px: pixmap.width(),
            height_px: pixmap.height(),
            pixels,
        })
    }

    async fn text_content(&self) -> Result<TextContent, EngineError> {
        let text_page = self
            .page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| self.render_error(e.to_string()))?;

        let mut items = Vec::new();
        for block in text_page.blocks() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                if text.trim().is_empty() {
                    continue;
                }
                let bbox = line.bounds();
                items.push(TextItem {
                    text,
                    x: bbox.x0 - self.origin.0,
                    y: bbox.y0 - self.origin.1,
                    width: bbox.x1 - bbox.x0,
                    height: bbox.y1 - bbox.y0,
                });
            }
        }
        Ok(TextContent { items })
    }
}

impl MupdfPage {
    fn render_error(&self, detail: String) -> EngineError {
        EngineError::Render {
            page: self.number,
            detail,
        }
    }
}

/// Copy pixmap samples into a tightly packed RGB buffer
fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, String> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(format!("unsupported pixmap format: {n} channels"));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err("pixmap buffer size mismatch".to_string());
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &samples[y * stride..y * stride + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }
    Ok(out)
}
