//! Per-call record of the composites under construction.

use std::any::TypeId;

use indexmap::IndexMap;

use crate::descriptor::{Shape, TypeDescriptor};
use crate::tracer::TracerTypeKey;

/// Ordered set of the composite types currently being constructed on one
/// call chain.
///
/// A type present here is being built by an ancestor frame, so meeting it
/// again is a cycle. Insertion order is kept so the cycle path can be
/// reported outermost first.
#[derive(Debug, Default)]
pub struct VisitedSet {
    frames: IndexMap<TypeId, &'static str, ahash::RandomState>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.frames.contains_key(&id)
    }

    /// Records `descriptor` as under construction.
    ///
    /// Returns `false` without changing the set if it is already present.
    pub fn push(&mut self, descriptor: &TypeDescriptor) -> bool {
        if self.frames.contains_key(&descriptor.id()) {
            return false;
        }
        self.frames.insert(descriptor.id(), descriptor.name());
        true
    }

    /// Removes the innermost frame.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Path from the outermost composite to `revisited`.
    pub fn cycle_path(&self, revisited: &TypeDescriptor) -> Vec<TracerTypeKey> {
        self.frames
            .values()
            .map(|name| TracerTypeKey::new(name, Shape::Composite))
            .chain(std::iter::once(TracerTypeKey::from(revisited)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parent;
    struct Child;

    #[test]
    fn test_push_pop_order() {
        let mut visited = VisitedSet::new();
        let parent = TypeDescriptor::composite::<Parent>();
        let child = TypeDescriptor::composite::<Child>();

        assert!(visited.push(&parent));
        assert!(visited.push(&child));
        assert!(!visited.push(&parent));
        assert_eq!(visited.len(), 2);

        visited.pop();
        assert!(!visited.contains(child.id()));
        assert!(visited.contains(parent.id()));

        visited.pop();
        assert!(visited.is_empty());
    }

    #[test]
    fn test_cycle_path() {
        let mut visited = VisitedSet::new();
        let parent = TypeDescriptor::composite::<Parent>();
        let child = TypeDescriptor::composite::<Child>();
        visited.push(&parent);
        visited.push(&child);

        let path: Vec<_> = visited
            .cycle_path(&parent)
            .into_iter()
            .map(|key| key.type_name)
            .collect();
        assert_eq!(path, vec![parent.name(), child.name(), parent.name()]);
    }
}
