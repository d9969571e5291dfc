//! Persistent storage for uploaded document bytes
//!
//! Uploaded files have no other home, so the store is what lets a local
//! document survive a restart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt blob metadata at {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A stored upload
#[derive(Clone, Debug)]
pub struct StoredBlob {
    pub id: String,
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub saved_at: DateTime<Utc>,
}

pub trait BlobStore {
    fn save(&mut self, id: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<StoredBlob>, StoreError>;

    /// Every stored blob, oldest first
    fn get_all(&self) -> Result<Vec<StoredBlob>, StoreError>;

    /// Deleting a missing id is not an error
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobMetadata {
    id: String,
    name: String,
    saved_at: DateTime<Utc>,
    size: u64,
}

/// One `<md5(id)>.pdf` payload plus a `<md5(id)>.json` sidecar per document
#[derive(Debug)]
pub struct DiskBlobStore {
    dir: PathBuf,
}

impl DiskBlobStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key(id: &str) -> String {
        format!("{:x}", md5::compute(id.as_bytes()))
    }

    fn payload_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", Self::key(id)))
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(id)))
    }

    fn read_entry(&self, metadata_path: &Path) -> Result<StoredBlob, StoreError> {
        let content = fs::read_to_string(metadata_path).map_err(|source| StoreError::Io {
            path: metadata_path.to_path_buf(),
            source,
        })?;
        let metadata: BlobMetadata =
            serde_json::from_str(&content).map_err(|source| StoreError::Metadata {
                path: metadata_path.to_path_buf(),
                source,
            })?;
        let payload_path = self.payload_path(&metadata.id);
        let bytes = fs::read(&payload_path).map_err(|source| StoreError::Io {
            path: payload_path,
            source,
        })?;
        Ok(StoredBlob {
            id: metadata.id,
            name: metadata.name,
            bytes: bytes.into(),
            saved_at: metadata.saved_at,
        })
    }
}

impl BlobStore for DiskBlobStore {
    fn save(&mut self, id: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let payload_path = self.payload_path(id);
        fs::write(&payload_path, bytes).map_err(|source| StoreError::Io {
            path: payload_path,
            source,
        })?;

        let metadata = BlobMetadata {
            id: id.to_string(),
            name: name.to_string(),
            saved_at: Utc::now(),
            size: bytes.len() as u64,
        };
        let metadata_path = self.metadata_path(id);
        let content =
            serde_json::to_string_pretty(&metadata).map_err(|source| StoreError::Metadata {
                path: metadata_path.clone(),
                source,
            })?;
        fs::write(&metadata_path, content).map_err(|source| StoreError::Io {
            path: metadata_path,
            source,
        })?;
        debug!("stored blob {id} ({} bytes)", bytes.len());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredBlob>, StoreError> {
        let metadata_path = self.metadata_path(id);
        if !metadata_path.exists() {
            return Ok(None);
        }
        self.read_entry(&metadata_path).map(Some)
    }

    fn get_all(&self) -> Result<Vec<StoredBlob>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut blobs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_entry(&path) {
                Ok(blob) => blobs.push(blob),
                Err(e) => warn!("skipping unreadable blob: {e}"),
            }
        }
        blobs.sort_by(|a, b| a.saved_at.cmp(&b.saved_at).then_with(|| a.id.cmp(&b.id)));
        Ok(blobs)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        for path in [self.payload_path(id), self.metadata_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        debug!("deleted blob {id}");
        Ok(())
    }
}

/// Process-lifetime store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Vec<StoredBlob>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn save(&mut self, id: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.retain(|b| b.id != id);
        self.blobs.push(StoredBlob {
            id: id.to_string(),
            name: name.to_string(),
            bytes: bytes.into(),
            saved_at: Utc::now(),
        });
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredBlob>, StoreError> {
        Ok(self.blobs.iter().find(|b| b.id == id).cloned())
    }

    fn get_all(&self) -> Result<Vec<StoredBlob>, StoreError> {
        Ok(self.blobs.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.blobs.retain(|b| b.id != id);
        Ok(())
    }
}
