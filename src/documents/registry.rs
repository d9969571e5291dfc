use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Names longer than this are shortened in listings
pub const DISPLAY_NAME_MAX_CHARS: usize = 32;
const DISPLAY_NAME_KEEP_CHARS: usize = 29;

/// Where a document's bytes live
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocator {
    /// Fetched on demand from a URL or filesystem path
    Remote { url: String },
    /// Uploaded by the user, backed by the blob store
    Local,
}

#[derive(Clone, Debug)]
pub struct DocumentDescriptor {
    pub id: String,
    pub name: String,
    pub source: SourceLocator,
    /// In-memory bytes for local documents, when still available
    pub cached_blob: Option<Arc<[u8]>>,
}

impl DocumentDescriptor {
    pub fn remote(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: SourceLocator::Remote { url: url.into() },
            cached_blob: None,
        }
    }

    pub fn local(id: impl Into<String>, name: impl Into<String>, bytes: Option<Arc<[u8]>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: SourceLocator::Local,
            cached_blob: bytes,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.source == SourceLocator::Local
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            SourceLocator::Remote { url } => Some(url),
            SourceLocator::Local => None,
        }
    }

    /// Name as shown in the document list
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.chars().count() > DISPLAY_NAME_MAX_CHARS {
            let mut short: String = self.name.chars().take(DISPLAY_NAME_KEEP_CHARS).collect();
            short.push('…');
            short
        } else {
            self.name.clone()
        }
    }
}

/// Known documents, newest first
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<DocumentDescriptor>,
}

impl DocumentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front. An existing entry with the same id is replaced.
    pub fn add(&mut self, document: DocumentDescriptor) {
        self.documents.retain(|d| d.id != document.id);
        self.documents.insert(0, document);
    }

    /// Register a remote document and return its id
    pub fn add_remote(&mut self, name: &str, url: &str) -> String {
        let digest = md5::compute(url.as_bytes());
        let id = format!("remote-{}", &format!("{digest:x}")[..12]);
        self.add(DocumentDescriptor::remote(id.clone(), name, url));
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<DocumentDescriptor> {
        let idx = self.documents.iter().position(|d| d.id == id)?;
        Some(self.documents.remove(idx))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DocumentDescriptor> {
        self.documents.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn list(&self) -> &[DocumentDescriptor] {
        &self.documents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
