//! Type descriptors and shape classification.

use std::any::{Any, TypeId};
use std::sync::Arc;

use papaya::HashMap;
use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;

/// The closed set of shapes the generator dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Scalar leaf: numbers, strings, booleans, identifiers, timestamps.
    Primitive,
    /// Field-less enum; one variant is picked uniformly.
    Enum,
    /// Fixed slice such as `Box<[T]>`.
    Array,
    /// Growable sequence such as `Vec<T>`.
    OrderedSequence,
    /// Set of distinct elements.
    Set,
    /// Key/value map.
    Map,
    /// Persistent sequence such as `im::Vector<T>`.
    ImmutableOrderedSequence,
    /// Persistent set such as `im::HashSet<T>`.
    ImmutableSet,
    /// Persistent map such as `im::HashMap<K, V>`.
    ImmutableMap,
    /// Anything built through a constructor or factory.
    Composite,
}

impl Shape {
    /// Returns `true` for the six container shapes and the array shape.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Shape::Array
                | Shape::OrderedSequence
                | Shape::Set
                | Shape::Map
                | Shape::ImmutableOrderedSequence
                | Shape::ImmutableSet
                | Shape::ImmutableMap
        )
    }

    /// Returns `true` for the persistent container shapes.
    pub fn is_immutable(self) -> bool {
        matches!(
            self,
            Shape::ImmutableOrderedSequence | Shape::ImmutableSet | Shape::ImmutableMap
        )
    }

    /// Returns `true` for shapes that never recurse.
    pub fn is_leaf(self) -> bool {
        matches!(self, Shape::Primitive | Shape::Enum)
    }
}

/// Identity and shape of a type, plus the descriptors of its generic
/// arguments for container shapes.
///
/// Produced by [`Fixture::descriptor`]. Classification is pure: the same type
/// always yields the same descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    shape: Shape,
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    fn of<T: ?Sized + Any>(shape: Shape, args: Vec<TypeDescriptor>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            shape,
            args,
        }
    }

    /// Descriptor of a scalar leaf type.
    pub fn primitive<T: Any>() -> Self {
        Self::of::<T>(Shape::Primitive, Vec::new())
    }

    /// Descriptor of a field-less enum.
    pub fn enumeration<T: Any>() -> Self {
        Self::of::<T>(Shape::Enum, Vec::new())
    }

    /// Descriptor of a composite type.
    ///
    /// Composite descriptors carry no arguments, so describing a
    /// self-referential type never recurses.
    pub fn composite<T: Any>() -> Self {
        Self::of::<T>(Shape::Composite, Vec::new())
    }

    /// Descriptor of a container type.
    ///
    /// `args` holds the element descriptor, or the key and value descriptors
    /// for maps.
    pub fn container<T: Any>(shape: Shape, args: Vec<TypeDescriptor>) -> Self {
        debug_assert!(shape.is_container(), "{shape:?} is not a container shape");
        Self::of::<T>(shape, args)
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// Element descriptor of a sequence or set.
    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self.shape {
            Shape::Map | Shape::ImmutableMap => None,
            _ => self.args.first(),
        }
    }

    /// Key descriptor of a map.
    pub fn key(&self) -> Option<&TypeDescriptor> {
        match self.shape {
            Shape::Map | Shape::ImmutableMap => self.args.first(),
            _ => None,
        }
    }

    /// Value descriptor of a map.
    pub fn value(&self) -> Option<&TypeDescriptor> {
        match self.shape {
            Shape::Map | Shape::ImmutableMap => self.args.get(1),
            _ => None,
        }
    }
}

/// Per-runtime memo of [`TypeDescriptor`]s keyed by `TypeId`.
///
/// Entries are never invalidated.
pub(crate) struct DescriptorCache {
    entries: HashMap<TypeId, Arc<TypeDescriptor>, ahash::RandomState>,
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn get<T: Fixture>(&self) -> Arc<TypeDescriptor> {
        let pinned = self.entries.pin();
        pinned
            .get_or_insert_with(TypeId::of::<T>(), || Arc::new(T::descriptor()))
            .clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.pin().len()
    }
}
