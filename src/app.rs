//! Application state: documents, chat context, viewer and assistant

use std::sync::Arc;

use log::{error, info, warn};

use crate::chat::{ChatBackend, ChatLog, ChatSession, SendOutcome, is_http_url};
use crate::documents::{
    BlobStore, ContextFile, ContextSet, DocumentDescriptor, DocumentRegistry, SourceLocator,
    UploadCandidate, UploadRejection, new_local_id, validate_upload,
};
use crate::settings::{LibraryEntry, Settings};
use crate::viewer::{DECODE_FAILURE_PANEL, DocumentSource, PdfEngine, Viewer};

pub const LOCAL_UNAVAILABLE_PANEL: &str =
    "This local file is not available anymore. Please re-upload the document.";
pub const LOCAL_UNAVAILABLE_MESSAGE: &str = "❌ Local file not available after refresh.";
pub const LOAD_ERROR_MESSAGE: &str = "❌ Error loading document.";

/// Result of an upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Ids of accepted files, in upload order
    pub added: Vec<String>,
    pub rejected: Vec<UploadRejection>,
}

pub struct App<E: PdfEngine, B: ChatBackend> {
    registry: DocumentRegistry,
    context: ContextSet,
    context_file: ContextFile,
    blobs: Box<dyn BlobStore>,
    viewer: Viewer<E>,
    chat: ChatSession<B>,
    max_upload_bytes: u64,
    library: Vec<LibraryEntry>,
}

impl<E: PdfEngine, B: ChatBackend> App<E, B> {
    pub fn new(
        settings: &Settings,
        engine: E,
        backend: B,
        blobs: Box<dyn BlobStore>,
        context_file: ContextFile,
    ) -> Self {
        Self {
            registry: DocumentRegistry::new(),
            context: ContextSet::new(),
            context_file,
            blobs,
            viewer: Viewer::new(engine, settings.viewer.clone()),
            chat: ChatSession::new(backend),
            max_upload_bytes: settings.documents.max_upload_bytes,
            library: settings.documents.library.clone(),
        }
    }

    /// Register the configured library, restore stored uploads and the saved
    /// chat context, then greet. Returns the number of restored uploads.
    pub fn startup(&mut self) -> usize {
        for entry in self.library.iter().rev() {
            self.registry.add_remote(&entry.name, &entry.url);
        }
        let stored = self.blobs.get_all().unwrap_or_else(|e| {
            error!("Failed to restore uploaded documents: {e}");
            Vec::new()
        });
        let restored = stored.len();
        for blob in stored {
            self.registry.add(DocumentDescriptor::local(
                blob.id,
                blob.name,
                Some(blob.bytes),
            ));
        }
        self.context = self.context_file.restore(&self.registry);
        info!(
            "startup: {restored} stored upload(s), {} context document(s)",
            self.context.len()
        );
        self.chat.log_mut().push_welcome();
        restored
    }

    #[must_use]
    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn context(&self) -> &ContextSet {
        &self.context
    }

    #[must_use]
    pub fn viewer(&self) -> &Viewer<E> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Viewer<E> {
        &mut self.viewer
    }

    #[must_use]
    pub fn chat_log(&self) -> &ChatLog {
        self.chat.log()
    }

    #[must_use]
    pub fn chat(&self) -> &ChatSession<B> {
        &self.chat
    }

    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Register a remote document. Returns its id.
    pub fn add_remote(&mut self, name: &str, url: &str) -> String {
        let id = self.registry.add_remote(name, url);
        info!("registered remote document {id} ({url})");
        id
    }

    /// Validate and store uploads, newest first in the registry. The first
    /// accepted file is opened.
    pub async fn upload(&mut self, candidates: Vec<UploadCandidate>) -> UploadReport {
        let mut report = UploadReport::default();

        for candidate in candidates {
            if let Err(rejection) = validate_upload(&candidate, self.max_upload_bytes) {
                warn!("rejected upload {}: {rejection}", rejection.file_name());
                self.chat.log_mut().push_assistant(format!("❌ {rejection}"));
                report.rejected.push(rejection);
                continue;
            }

            let id = new_local_id();
            if let Err(e) = self.blobs.save(&id, &candidate.name, &candidate.bytes) {
                error!("Failed to store upload {}: {e}", candidate.name);
            }
            info!(
                "uploaded {} as {id} ({} bytes)",
                candidate.name,
                candidate.bytes.len()
            );
            let bytes: Arc<[u8]> = candidate.bytes.into();
            self.registry
                .add(DocumentDescriptor::local(id.clone(), candidate.name, Some(bytes)));
            report.added.push(id);
        }

        if let Some(first) = report.added.first().cloned() {
            self.open_document(&first).await;
        }
        report
    }

    /// Show a document in the viewer. Returns whether it rendered.
    pub async fn open_document(&mut self, id: &str) -> bool {
        let Some(doc) = self.registry.get(id).cloned() else {
            warn!("open requested for unknown document {id}");
            return false;
        };

        let source = match &doc.source {
            SourceLocator::Local => match self.local_bytes(&doc) {
                Some(bytes) => DocumentSource::Blob(bytes),
                None => {
                    warn!("local document {id} has no stored bytes");
                    self.viewer.close();
                    self.viewer.show_error(LOCAL_UNAVAILABLE_PANEL);
                    self.chat.log_mut().push_assistant(LOCAL_UNAVAILABLE_MESSAGE);
                    return false;
                }
            },
            SourceLocator::Remote { url } if is_http_url(url) => {
                match self.chat.backend().fetch_document(url).await {
                    Ok(bytes) => DocumentSource::Blob(bytes.into()),
                    Err(e) => {
                        error!("failed to fetch {url}: {e}");
                        self.viewer.close();
                        self.viewer.show_error(DECODE_FAILURE_PANEL);
                        self.chat.log_mut().push_assistant(LOAD_ERROR_MESSAGE);
                        return false;
                    }
                }
            }
            SourceLocator::Remote { url } => DocumentSource::Url(url.clone()),
        };

        match self.viewer.open(id, &source).await {
            Ok(()) => {
                self.chat.log_mut().push_assistant(format!(
                    "📊 Document loaded! I can help you analyze this {}. Ask me about key insights, financial metrics, or business implications.",
                    doc.name.to_lowercase()
                ));
                true
            }
            Err(_) => {
                self.chat.log_mut().push_assistant(LOAD_ERROR_MESSAGE);
                false
            }
        }
    }

    fn local_bytes(&self, doc: &DocumentDescriptor) -> Option<Arc<[u8]>> {
        if let Some(bytes) = &doc.cached_blob {
            return Some(Arc::clone(bytes));
        }
        match self.blobs.get(&doc.id) {
            Ok(stored) => stored.map(|blob| blob.bytes),
            Err(e) => {
                warn!("blob store lookup for {} failed: {e}", doc.id);
                None
            }
        }
    }

    /// Remove a document everywhere it appears. Returns false for unknown ids.
    pub fn delete_document(&mut self, id: &str) -> bool {
        let Some(doc) = self.registry.remove(id) else {
            return false;
        };
        if doc.is_local() {
            if let Err(e) = self.blobs.delete(id) {
                error!("Failed to delete stored upload {id}: {e}");
            }
        }
        if self.context.remove(id) {
            self.save_context();
        }
        if self.viewer.open_document_id() == Some(id) {
            self.viewer.close();
        }
        info!("deleted document {id} ({})", doc.name);
        true
    }

    pub fn add_to_context(&mut self, id: &str) -> bool {
        let added = self.context.add(&self.registry, id);
        if added {
            self.save_context();
        }
        added
    }

    pub fn remove_from_context(&mut self, id: &str) -> bool {
        let removed = self.context.remove(id);
        if removed {
            self.save_context();
        }
        removed
    }

    /// Documents currently attached to questions
    #[must_use]
    pub fn context_documents(&self) -> Vec<DocumentDescriptor> {
        self.context
            .ids()
            .iter()
            .filter_map(|id| self.registry.get(id).cloned())
            .collect()
    }

    fn save_context(&self) {
        if let Err(e) = self.context_file.save(&self.context, &self.registry) {
            error!("Failed to save chat context: {e}");
        }
    }

    pub async fn send_message(&mut self, question: &str) -> SendOutcome {
        let docs = self.context_documents();
        self.chat.send(question, &docs, self.blobs.as_ref()).await
    }

    /// Scroll the viewer to the bottom and load the next batch if due
    pub async fn scroll_to_bottom(&mut self) -> bool {
        self.viewer.container_mut().scroll_to_bottom();
        self.viewer.scroll_and_render().await
    }

    pub async fn scroll_by(&mut self, delta: f32) -> bool {
        self.viewer.container_mut().scroll_by(delta);
        self.viewer.scroll_and_render().await
    }

    pub async fn zoom_in(&mut self) {
        self.viewer.zoom_in_and_render().await;
    }

    pub async fn zoom_out(&mut self) {
        self.viewer.zoom_out_and_render().await;
    }

    pub async fn resize(&mut self, width: f32) {
        self.viewer.resize_and_render(width).await;
    }
}
