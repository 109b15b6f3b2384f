//! Ordered concatenation of enumerators of one concrete kind.

use crate::reflection::SourceObject;

use super::SourceEnumerator;

/// Concatenates several enumerators of the same kind into one sequence:
/// polymorphism by composition, not inheritance. The current inner enumerator
/// is drained to exhaustion before the next one is opened, so elements never
/// interleave.
pub struct CompositeEnumerator<E: SourceEnumerator> {
    inner: Vec<E>,
    index: usize,
    yielded: usize,
    total: usize,
}

impl<E: SourceEnumerator> CompositeEnumerator<E> {
    pub fn new(inner: Vec<E>) -> Self {
        let total = inner.iter().map(SourceEnumerator::estimated_size).sum();
        Self {
            inner,
            index: 0,
            yielded: 0,
            total,
        }
    }
}

impl<E: SourceEnumerator> SourceEnumerator for CompositeEnumerator<E> {
    fn next(&mut self) -> Option<SourceObject> {
        while let Some(current) = self.inner.get_mut(self.index) {
            if let Some(item) = current.next() {
                self.yielded += 1;
                return Some(item);
            }
            self.index += 1;
        }
        None
    }

    fn estimate_progress(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.yielded as f32 / self.total as f32
        }
    }

    fn estimated_size(&self) -> usize {
        self.total
    }
}
