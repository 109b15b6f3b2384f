//! Enumerates native classes declared by one module.

use crate::reflection::{ObjectRegistry, SourceObject};

use super::{EnumerationError, SourceEnumerator, cursor_progress};

/// Yields every documentable native class declared by a single module.
///
/// The prepass runs in `new` and skips deprecated, superseded, and skeleton
/// classes; `next` only walks the cached handles.
pub struct NativeModuleEnumerator {
    module: String,
    items: Vec<SourceObject>,
    cursor: usize,
}

impl NativeModuleEnumerator {
    pub fn new(registry: &ObjectRegistry, module: &str) -> Result<Self, EnumerationError> {
        if !registry.has_module(module) {
            return Err(EnumerationError::UnknownModule {
                module: module.to_string(),
            });
        }
        let items = registry
            .classes_in_module(module)
            .into_iter()
            .map(SourceObject::Class)
            .collect();
        Ok(Self {
            module: module.to_string(),
            items,
            cursor: 0,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

impl SourceEnumerator for NativeModuleEnumerator {
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
