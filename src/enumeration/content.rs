//! Enumerates graph-owning assets under one content path.

use crate::reflection::{ObjectRegistry, SourceObject};

use super::{EnumerationError, SourceEnumerator, cursor_progress};

/// Yields every graph asset stored under a single content path.
///
/// Animation graphs are filtered at the prepass; they are never documented.
pub struct ContentPathEnumerator {
    path: String,
    items: Vec<SourceObject>,
    cursor: usize,
}

impl ContentPathEnumerator {
    pub fn new(registry: &ObjectRegistry, path: &str) -> Result<Self, EnumerationError> {
        if !registry.has_content_root(path) {
            return Err(EnumerationError::UnknownContentRoot {
                path: path.to_string(),
            });
        }
        let items = registry
            .assets_under_path(path)
            .into_iter()
            .map(SourceObject::Asset)
            .collect();
        Ok(Self {
            path: path.to_string(),
            items,
            cursor: 0,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SourceEnumerator for ContentPathEnumerator {
    fn next(&mut self) -> Option<SourceObject> {
        let item = self.items.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(item)
    }

    fn estimate_progress(&self) -> f32 {
        cursor_progress(self.cursor, self.items.len())
    }

    fn estimated_size(&self) -> usize {
        self.items.len()
    }
}
