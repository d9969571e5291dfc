//! Progressive PDF viewer
//!
//! Pages are rendered in small batches: a few on open, more as the user
//! scrolls near the bottom, and a capped re-render of the leading pages on
//! zoom or resize. At most one batch is in flight at a time.

mod container;
mod engine;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod renderer;
mod scroll;
mod service;
mod state;
mod types;
mod zoom;

pub use container::{PAGE_GAP_PX, PageContainer};
pub use engine::{
    DocumentSource, EngineError, LoadedDocument, NoDocument, PdfEngine, PdfPage, UnavailableEngine,
};
#[cfg(feature = "pdf")]
pub use mupdf_engine::{MupdfDocument, MupdfEngine, MupdfPage};
pub use renderer::{BatchJob, BatchOutcome, render_page_range};
pub use scroll::{DEFAULT_SCROLL_THRESHOLD_PX, ScrollCoordinator, ScrollPhase};
pub use service::{DECODE_FAILURE_PANEL, Viewer, ViewerError};
pub use state::{BatchReport, Command, Effect, ViewerConfig, ViewerState};
pub use types::*;
pub use zoom::Zoom;

/// The engine compiled into this build
#[cfg(feature = "pdf")]
pub type DefaultEngine = MupdfEngine;
#[cfg(not(feature = "pdf"))]
pub type DefaultEngine = UnavailableEngine;
