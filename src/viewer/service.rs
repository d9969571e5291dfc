//! Viewer service - drives the session state against the page container

use std::rc::Rc;

use log::{debug, error, info, warn};

use super::container::PageContainer;
use super::engine::{DocumentSource, EngineError, LoadedDocument, PdfEngine};
use super::renderer::{BatchJob, BatchOutcome};
use super::state::{BatchReport, Command, Effect, ViewerConfig, ViewerState};
use super::types::{RenderedPage, ScrollMetrics};

/// Shown in the viewport when a document cannot be decoded
pub const DECODE_FAILURE_PANEL: &str =
    "Could not load the PDF document. Please check the file path and the log for errors.";

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to load document: {0}")]
    Decode(#[from] EngineError),
}

/// Owns the session of the currently open document.
pub struct Viewer<E: PdfEngine> {
    engine: E,
    state: ViewerState,
    container: PageContainer,
    document: Option<Rc<E::Document>>,
    open_document_id: Option<String>,
}

impl<E: PdfEngine> Viewer<E> {
    #[must_use]
    pub fn new(engine: E, config: ViewerConfig) -> Self {
        let config = config.normalized();
        let container = PageContainer::new(config.viewport_width, config.viewport_height);
        Self {
            engine,
            state: ViewerState::new(config),
            container,
            document: None,
            open_document_id: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn container(&self) -> &PageContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut PageContainer {
        &mut self.container
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Id of the document on display, if one decoded successfully
    #[must_use]
    pub fn open_document_id(&self) -> Option<&str> {
        self.open_document_id.as_deref()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// Replace the viewport content with an error panel
    pub fn show_error(&mut self, message: &str) {
        self.container.set_welcome_visible(false);
        self.container.set_loading(false);
        self.container.show_error(message);
    }

    /// Start a new session for `source`: reset, decode, render the first
    /// pages. On decode failure the viewer is left empty with an error panel.
    pub async fn open(&mut self, id: &str, source: &DocumentSource) -> Result<(), ViewerError> {
        info!("opening document {id}");
        self.document = None;
        self.open_document_id = None;
        let effects = self.state.apply(Command::Open);
        self.execute(effects, Vec::new());

        let document = match self.engine.load(source).await {
            Ok(document) => document,
            Err(e) => {
                error!("failed to decode document {id}: {e}");
                let effects = self.state.apply(Command::LoadFailed);
                self.execute(effects, Vec::new());
                self.container.show_error(DECODE_FAILURE_PANEL);
                return Err(ViewerError::Decode(e));
            }
        };

        let total_pages = document.total_pages();
        info!("document {id} decoded: {total_pages} pages");
        self.document = Some(Rc::new(document));
        self.open_document_id = Some(id.to_string());

        let effects = self.state.apply(Command::Loaded { total_pages });
        if let Some(job) = self.execute(effects, Vec::new()) {
            self.run(job).await;
        }
        Ok(())
    }

    /// Drop the current document and go back to the welcome screen
    pub fn close(&mut self) {
        if let Some(id) = self.open_document_id.take() {
            info!("closing document {id}");
        }
        self.document = None;
        let effects = self.state.apply(Command::Close);
        self.execute(effects, Vec::new());
    }

    /// Feed the container's current scroll position to the coordinator
    pub fn scroll(&mut self) -> Option<BatchJob<E::Document>> {
        let metrics = self.container.scroll_metrics();
        self.on_scroll(metrics)
    }

    /// Scroll event. Returns the batch to run when one should start.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<BatchJob<E::Document>> {
        let effects = self.state.apply(Command::Scrolled(metrics));
        self.execute(effects, Vec::new())
    }

    pub fn zoom_in(&mut self) -> Option<BatchJob<E::Document>> {
        let effects = self.state.apply(Command::ZoomIn);
        self.execute(effects, Vec::new())
    }

    pub fn zoom_out(&mut self) -> Option<BatchJob<E::Document>> {
        let effects = self.state.apply(Command::ZoomOut);
        self.execute(effects, Vec::new())
    }

    /// Viewport width changed (e.g. the split view was dragged)
    pub fn resize(&mut self, width: f32) -> Option<BatchJob<E::Document>> {
        let effects = self.state.apply(Command::Resized { width });
        self.container.set_width(self.state.viewport_width);
        self.execute(effects, Vec::new())
    }

    /// Report a finished batch. Commits its pages if it still belongs to the
    /// current session and returns the follow-up batch, if any.
    pub fn complete(&mut self, outcome: BatchOutcome) -> Option<BatchJob<E::Document>> {
        let report = BatchReport {
            request: outcome.request,
            rendered: outcome.pages.len(),
            failed: outcome.failed_pages.len(),
        };
        let effects = self.state.apply(Command::BatchFinished(report));
        if effects.is_empty() {
            debug!(
                "discarding stale batch {}..={} ({})",
                report.request.start_page, report.request.end_page, report.request.generation
            );
            return None;
        }
        if outcome.is_partial() {
            warn!(
                "batch {}..={} finished with failed pages {:?}",
                report.request.start_page, report.request.end_page, outcome.failed_pages
            );
        }
        self.execute(effects, outcome.pages)
    }

    /// Run a batch and any follow-up batches to completion
    pub async fn run(&mut self, job: BatchJob<E::Document>) {
        let mut next = Some(job);
        while let Some(job) = next {
            let outcome = job.run().await;
            next = self.complete(outcome);
        }
    }

    /// Scroll event followed by the batch it triggers. Returns whether a
    /// batch ran.
    pub async fn scroll_and_render(&mut self) -> bool {
        match self.scroll() {
            Some(job) => {
                self.run(job).await;
                true
            }
            None => false,
        }
    }

    pub async fn zoom_in_and_render(&mut self) {
        if let Some(job) = self.zoom_in() {
            self.run(job).await;
        }
    }

    pub async fn zoom_out_and_render(&mut self) {
        if let Some(job) = self.zoom_out() {
            self.run(job).await;
        }
    }

    pub async fn resize_and_render(&mut self, width: f32) {
        if let Some(job) = self.resize(width) {
            self.run(job).await;
        }
    }

    fn execute(
        &mut self,
        effects: Vec<Effect>,
        mut fragment: Vec<RenderedPage>,
    ) -> Option<BatchJob<E::Document>> {
        let mut job = None;
        for effect in effects {
            match effect {
                Effect::ShowWelcome(visible) => self.container.set_welcome_visible(visible),

                Effect::ClearContainer => self.container.clear(),

                Effect::ShowLoading(loading) => self.container.set_loading(loading),

                Effect::RenderBatch(request) => match &self.document {
                    Some(document) => {
                        debug!(
                            "issuing batch {}..={} ({:?}, {})",
                            request.start_page, request.end_page, request.mode, request.generation
                        );
                        job = Some(BatchJob::new(
                            request,
                            self.state.layout(),
                            Rc::clone(document),
                        ));
                    }
                    None => {
                        warn!("render batch {request:?} requested with no document loaded");
                        self.state.scroll.finish();
                        self.container.set_loading(false);
                    }
                },

                Effect::Commit(request) => {
                    debug!(
                        "committing {} pages for {}..={}",
                        fragment.len(),
                        request.start_page,
                        request.end_page
                    );
                    self.container
                        .commit(request.mode, std::mem::take(&mut fragment));
                }

                Effect::UpdateZoomLabel(percentage) => self.container.set_zoom_label(percentage),
            }
        }
        job
    }
}
