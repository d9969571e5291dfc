//! Documents attached to the next question

use std::fs;
use std::path::{Path, PathBuf};

use super::registry::DocumentRegistry;

/// Ordered, duplicate-free set of document ids
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextSet {
    ids: Vec<String>,
}

impl ContextSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for duplicates and ids the registry does not know
    pub fn add(&mut self, registry: &DocumentRegistry, id: &str) -> bool {
        if self.contains(id) || registry.get(id).is_none() {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|i| i != id);
        self.ids.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// JSON persistence for the context set. Local uploads are not persisted:
/// their ids are only meaningful while the blob is around.
#[derive(Debug, Clone)]
pub struct ContextFile {
    file_path: Option<PathBuf>,
}

impl ContextFile {
    #[must_use]
    pub fn ephemeral() -> Self {
        Self { file_path: None }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn save(&self, context: &ContextSet, registry: &DocumentRegistry) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let ids: Vec<&str> = context
            .ids()
            .iter()
            .filter(|id| registry.get(id).is_some_and(|d| !d.is_local()))
            .map(String::as_str)
            .collect();
        fs::write(path, serde_json::to_string_pretty(&ids)?)?;
        Ok(())
    }

    pub fn load_ids(&self) -> anyhow::Result<Vec<String>> {
        match &self.file_path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&content)?)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Rebuild the set, keeping only known, non-local documents
    pub fn restore(&self, registry: &DocumentRegistry) -> ContextSet {
        let ids = self.load_ids().unwrap_or_else(|e| {
            log::error!("Failed to load chat context from {:?}: {}", self.file_path, e);
            Vec::new()
        });
        let mut context = ContextSet::new();
        for id in ids {
            if registry.get(&id).is_some_and(|d| !d.is_local()) {
                context.add(registry, &id);
            }
        }
        context
    }
}
