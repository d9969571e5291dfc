//! Question flow: gather the context documents, ask the backend, log the
//! reply.

use log::{info, warn};

use super::backend::{Attachment, BackendError, ChatBackend};
use super::transcript::ChatLog;
use crate::documents::{BlobStore, DocumentDescriptor, SourceLocator};

pub const NO_CONTEXT_MESSAGE: &str =
    "❌ Please add at least one document to the context (drag a document into the chat bar).";
pub const NO_ANSWER_MESSAGE: &str = "No answer received.";
const FALLBACK_FILENAME: &str = "document.pdf";

/// How a `send` ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, nothing logged
    Ignored,
    NoContext,
    /// Every context document failed to resolve; nothing was sent
    NoValidFiles,
    Answered,
    Failed,
}

pub struct ChatSession<B> {
    backend: B,
    log: ChatLog,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            log: ChatLog::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ChatLog {
        &mut self.log
    }

    pub async fn send(
        &mut self,
        question: &str,
        context: &[DocumentDescriptor],
        blobs: &dyn BlobStore,
    ) -> SendOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SendOutcome::Ignored;
        }

        self.log.push_user(question);
        self.log.show_typing();

        if context.is_empty() {
            self.log.hide_typing();
            self.log.push_assistant(NO_CONTEXT_MESSAGE);
            return SendOutcome::NoContext;
        }

        let mut attachments = Vec::with_capacity(context.len());
        for doc in context {
            match &doc.source {
                SourceLocator::Local => match local_bytes(doc, blobs) {
                    Some(bytes) => attachments.push(Attachment {
                        filename: doc.name.clone(),
                        bytes,
                    }),
                    None => {
                        warn!("local document {} has no stored bytes", doc.id);
                        self.log.hide_typing();
                        self.log.push_assistant(format!(
                            "❌ The local file \"{}\" is not available anymore. Please re-upload it.",
                            doc.name
                        ));
                    }
                },
                SourceLocator::Remote { url } => match self.backend.fetch_document(url).await {
                    Ok(bytes) => attachments.push(Attachment {
                        filename: remote_filename(&doc.name, url),
                        bytes,
                    }),
                    Err(e) => {
                        warn!("failed to fetch {url}: {e}");
                        self.log.hide_typing();
                        self.log.push_assistant(format!(
                            "❌ Could not fetch static document \"{}\".",
                            doc.name
                        ));
                    }
                },
            }
        }

        if attachments.is_empty() {
            self.log.hide_typing();
            return SendOutcome::NoValidFiles;
        }

        info!(
            "asking backend with {} attachment(s): {:?}",
            attachments.len(),
            attachments.iter().map(|a| a.filename.as_str()).collect::<Vec<_>>()
        );
        let result = self.backend.ask(question, attachments).await;
        self.log.hide_typing();

        match result {
            Ok(answer) => {
                if answer.trim().is_empty() {
                    self.log.push_assistant(NO_ANSWER_MESSAGE);
                } else {
                    self.log.push_assistant(answer);
                }
                SendOutcome::Answered
            }
            Err(e) => {
                log::error!("question failed: {e}");
                self.log.push_assistant(failure_message(&e));
                SendOutcome::Failed
            }
        }
    }
}

fn local_bytes(doc: &DocumentDescriptor, blobs: &dyn BlobStore) -> Option<Vec<u8>> {
    if let Some(bytes) = &doc.cached_blob {
        return Some(bytes.to_vec());
    }
    match blobs.get(&doc.id) {
        Ok(stored) => stored.map(|blob| blob.bytes.to_vec()),
        Err(e) => {
            warn!("blob store lookup for {} failed: {e}", doc.id);
            None
        }
    }
}

/// Upload name for a remote document
pub fn remote_filename(name: &str, url: &str) -> String {
    if name.to_lowercase().ends_with(".pdf") {
        return name.to_string();
    }
    url.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_FILENAME)
        .to_string()
}

/// Chat text for a failed question
pub fn failure_message(error: &BackendError) -> String {
    match error {
        BackendError::Status { error, message, .. } => {
            let mut text = error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or("Server error")
                .to_string();
            if !text.ends_with('.') {
                text.push('.');
            }
            let mut out = format!("❌ Error: {text}");
            if let Some(message) = message.as_deref().filter(|m| !m.is_empty()) {
                out.push(' ');
                out.push_str(message);
            }
            out
        }
        BackendError::Network(detail) => format!("❌ Network error: {detail}"),
    }
}
