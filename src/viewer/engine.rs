//! Decode collaborator interface
//!
//! The PDF engine is external to the viewer: it turns a locator into a
//! loaded document handle, hands out pages, and renders a page either as a
//! raster surface or as a text model. Every method that touches document
//! bytes is a suspension point.

use std::sync::Arc;

use super::types::{PageGeometry, RasterSurface, TextContent};

/// Where the document bytes come from
#[derive(Clone, Debug)]
pub enum DocumentSource {
    /// Remote document or filesystem path
    Url(String),
    /// In-memory bytes of a locally-backed document
    Blob(Arc<[u8]>),
}

/// Errors reported by the decode collaborator
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("document could not be decoded: {0}")]
    Decode(String),

    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("page {page} failed to render: {detail}")]
    Render { page: usize, detail: String },

    #[error("unsupported document locator: {0}")]
    UnsupportedSource(String),
}

/// Loads documents
#[allow(async_fn_in_trait)]
pub trait PdfEngine {
    type Document: LoadedDocument;

    async fn load(&self, source: &DocumentSource) -> Result<Self::Document, EngineError>;
}

/// A decoded document
#[allow(async_fn_in_trait)]
pub trait LoadedDocument {
    type Page: PdfPage;

    fn total_pages(&self) -> usize;

    /// Fetch a page by 1-based number
    async fn page(&self, number: usize) -> Result<Self::Page, EngineError>;
}

/// A page handle
#[allow(async_fn_in_trait)]
pub trait PdfPage {
    /// Page size at `scale` (scale 1.0 gives the intrinsic geometry)
    fn viewport(&self, scale: f32) -> PageGeometry;

    /// Rasterize at the geometry's scale
    async fn render(&self, geometry: &PageGeometry) -> Result<RasterSurface, EngineError>;

    /// Text model in unscaled page coordinates
    async fn text_content(&self) -> Result<TextContent, EngineError>;
}

/// Engine used when no decoder is compiled in. Every load fails, which the
/// viewer surfaces through its normal decode-failure path.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableEngine;

/// Never constructed; satisfies the associated types of [`UnavailableEngine`].
#[derive(Debug)]
pub enum NoDocument {}

impl PdfEngine for UnavailableEngine {
    type Document = NoDocument;

    async fn load(&self, source: &DocumentSource) -> Result<Self::Document, EngineError> {
        let locator = match source {
            DocumentSource::Url(url) => url.clone(),
            DocumentSource::Blob(bytes) => format!("<{} bytes>", bytes.len()),
        };
        Err(EngineError::UnsupportedSource(format!(
            "{locator} (built without the `pdf` feature)"
        )))
    }
}

impl LoadedDocument for NoDocument {
    type Page = NoDocument;

    fn total_pages(&self) -> usize {
        match *self {}
    }

    async fn page(&self, _number: usize) -> Result<Self::Page, EngineError> {
        match *self {}
    }
}

impl PdfPage for NoDocument {
    fn viewport(&self, _scale: f32) -> PageGeometry {
        match *self {}
    }

    async fn render(&self, _geometry: &PageGeometry) -> Result<RasterSurface, EngineError> {
        match *self {}
    }

    async fn text_content(&self) -> Result<TextContent, EngineError> {
        match *self {}
    }
}
