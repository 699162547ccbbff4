//! Population strategies for container shapes.
//!
//! Sequences get exactly `repeat_count` elements. Sets and map keys are
//! over-sampled up to `repeat_count * SET_SAMPLING_FACTOR` candidates and
//! deduplicated, so they may come out smaller but never larger. Persistent
//! containers are filled through a mutable intermediate and converted once.

use std::any::TypeId;
use std::collections::{BTreeSet, HashSet};
use std::hash::{BuildHasher, Hash};

use indexmap::IndexSet;

use crate::cache::InvokerKey;
use crate::context::GenerationContext;
use crate::error::FixtureError;
use crate::fixture::Fixture;
use crate::tracer::TracerTypeKey;

/// Candidates drawn per requested distinct element.
pub const SET_SAMPLING_FACTOR: usize = 3;

/// Upper bound on the elements reserved up front for a sequence.
const MAX_PREALLOCATED: usize = 1024;

/// A collection that silently drops duplicates.
pub(crate) trait DistinctSink<E> {
    fn len(&self) -> usize;
    fn offer(&mut self, element: E);
}

impl<E: Hash + Eq, S: BuildHasher> DistinctSink<E> for HashSet<E, S> {
    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn offer(&mut self, element: E) {
        self.insert(element);
    }
}

impl<E: Ord> DistinctSink<E> for BTreeSet<E> {
    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn offer(&mut self, element: E) {
        self.insert(element);
    }
}

impl<E: Hash + Eq, S: BuildHasher> DistinctSink<E> for IndexSet<E, S> {
    fn len(&self) -> usize {
        IndexSet::len(self)
    }

    fn offer(&mut self, element: E) {
        self.insert(element);
    }
}

/// Where an element request ended up.
enum Element<E> {
    Value(E),
    Skipped,
    /// The element type can never be built; stop asking.
    Unconstructable,
}

fn element<C: Fixture, E: Fixture>(ctx: &mut GenerationContext<'_>) -> Element<E> {
    let err = match ctx.create::<E>() {
        Ok(value) => return Element::Value(value),
        Err(err) => err,
    };
    if let Some(value) = E::fallback(ctx) {
        return Element::Value(value);
    }
    let container = TracerTypeKey::from(ctx.descriptor::<C>().as_ref());
    ctx.runtime()
        .tracer()
        .on_element_failed(container, std::any::type_name::<E>());
    if matches!(err, FixtureError::Unconstructable { .. }) {
        Element::Unconstructable
    } else {
        Element::Skipped
    }
}

/// `repeat_count` elements of `E` for the container `C`.
///
/// Empty if `E` is a composite an ancestor frame is still building.
pub fn sequence<C: Fixture, E: Fixture>(ctx: &mut GenerationContext<'_>) -> Vec<E> {
    if ctx.is_constructing::<E>() {
        return Vec::new();
    }
    let count = ctx.repeat_count();
    let mut elements = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    for _ in 0..count {
        match element::<C, E>(ctx) {
            Element::Value(value) => elements.push(value),
            Element::Skipped => {}
            Element::Unconstructable => break,
        }
    }
    elements
}

/// Fill `sink` with up to `repeat_count` distinct elements, drawing at most
/// `repeat_count * SET_SAMPLING_FACTOR` candidates.
pub(crate) fn distinct<C, E, S>(ctx: &mut GenerationContext<'_>, sink: &mut S)
where
    C: Fixture,
    E: Fixture,
    S: DistinctSink<E>,
{
    if ctx.is_constructing::<E>() {
        return;
    }
    let target = ctx.repeat_count();
    let budget = target.saturating_mul(SET_SAMPLING_FACTOR);
    let mut attempts = 0;
    while sink.len() < target && attempts < budget {
        attempts += 1;
        match element::<C, E>(ctx) {
            Element::Value(value) => sink.offer(value),
            Element::Skipped => {}
            Element::Unconstructable => break,
        }
    }
}

/// Distinct keys and independent values, zipped to `min(keys, values)`
/// pairs.
pub(crate) fn pairs<C, K, V, S>(ctx: &mut GenerationContext<'_>, mut keys: S) -> Vec<(K, V)>
where
    C: Fixture,
    K: Fixture,
    V: Fixture,
    S: DistinctSink<K> + IntoIterator<Item = K>,
{
    distinct::<C, K, S>(ctx, &mut keys);
    let values = sequence::<C, V>(ctx);
    keys.into_iter().zip(values).collect()
}

/// Convert `elements` into `C` through the cached `from_iter` converter for
/// `C` closed over the element type.
pub(crate) fn convert<C, E>(ctx: &mut GenerationContext<'_>, elements: Vec<E>) -> C
where
    C: FromIterator<E> + 'static,
    E: 'static,
{
    let runtime = ctx.runtime();
    let key = InvokerKey::generic::<C>("from_iter", vec![TypeId::of::<E>()]);
    let convert = runtime.cache().invoker(key, runtime.tracer(), || {
        from_sequence::<C, E> as fn(Vec<E>) -> C
    });
    convert(elements)
}

fn from_sequence<C: FromIterator<E>, E>(elements: Vec<E>) -> C {
    elements.into_iter().collect()
}
