//! [`Fixture`] impls for std, `im`, `chrono` and `uuid` types.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexSet;
use uuid::Uuid;

use crate::containers;
use crate::context::GenerationContext;
use crate::descriptor::{Shape, TypeDescriptor};
use crate::error::FixtureError;
use crate::fixture::{Composite, Fixture};
use crate::primitive;
use crate::resolver::{Constructor, ConstructorTable, Members, Parameter};

// ============================================================================
// Leaves
// ============================================================================

macro_rules! leaf {
    ($ty:ty, |$ctx:ident| $draw:expr) => {
        impl Fixture for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::primitive::<Self>()
            }

            fn synthesize($ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
                Ok($draw)
            }

            fn fallback($ctx: &mut GenerationContext<'_>) -> Option<Self> {
                Some($draw)
            }
        }
    };
}

macro_rules! integers {
    ($($ty:ty),* $(,)?) => {$(
        leaf!($ty, |ctx| primitive::integer(ctx.rng()));
    )*};
}

integers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

leaf!(f32, |ctx| primitive::float32(ctx.rng()));
leaf!(f64, |ctx| primitive::float64(ctx.rng()));
leaf!(bool, |ctx| primitive::boolean(ctx.rng()));
leaf!(char, |ctx| primitive::character(ctx.rng()));
leaf!(String, |ctx| primitive::string(ctx.rng()));
leaf!(Uuid, |ctx| primitive::identifier(ctx.rng()));
leaf!(std::time::Duration, |ctx| primitive::duration(ctx.rng()));
leaf!(DateTime<Utc>, |ctx| {
    let now = ctx.now();
    primitive::timestamp(ctx.rng(), now)
});
leaf!(NaiveDateTime, |ctx| {
    let now = ctx.now();
    primitive::timestamp(ctx.rng(), now).naive_utc()
});
leaf!(NaiveDate, |ctx| {
    let now = ctx.now();
    primitive::timestamp(ctx.rng(), now).date_naive()
});

impl Fixture for () {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>()
    }

    fn synthesize(_ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        Ok(())
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(())
    }
}

// ============================================================================
// Sequences
// ============================================================================

impl<T: Fixture> Fixture for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::OrderedSequence, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        Ok(containers::sequence::<Self, T>(ctx))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(Vec::new())
    }
}

impl<T: Fixture> Fixture for VecDeque<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::OrderedSequence, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        Ok(containers::sequence::<Self, T>(ctx).into())
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(VecDeque::new())
    }
}

impl<T: Fixture> Fixture for Box<[T]> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::Array, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        Ok(containers::sequence::<Self, T>(ctx).into_boxed_slice())
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(Vec::new().into_boxed_slice())
    }
}

impl<T: Fixture + Clone> Fixture for im::Vector<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableOrderedSequence, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let elements = containers::sequence::<Self, T>(ctx);
        Ok(containers::convert::<Self, T>(ctx, elements))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(im::Vector::new())
    }
}

impl<T: Fixture> Fixture for Arc<[T]> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableOrderedSequence, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let elements = containers::sequence::<Self, T>(ctx);
        Ok(containers::convert::<Self, T>(ctx, elements))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(Arc::from(Vec::new()))
    }
}

// ============================================================================
// Sets
// ============================================================================

impl<T, S> Fixture for HashSet<T, S>
where
    T: Fixture + Hash + Eq,
    S: BuildHasher + Default + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::Set, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let mut set = HashSet::with_hasher(S::default());
        containers::distinct::<Self, T, _>(ctx, &mut set);
        Ok(set)
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(HashSet::with_hasher(S::default()))
    }
}

impl<T: Fixture + Ord> Fixture for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::Set, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let mut set = BTreeSet::new();
        containers::distinct::<Self, T, _>(ctx, &mut set);
        Ok(set)
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(BTreeSet::new())
    }
}

impl<T: Fixture + Hash + Eq + Clone> Fixture for im::HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableSet, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let mut set = IndexSet::with_hasher(ahash::RandomState::new());
        containers::distinct::<Self, T, _>(ctx, &mut set);
        Ok(containers::convert::<Self, T>(ctx, set.into_iter().collect()))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(im::HashSet::default())
    }
}

impl<T: Fixture + Ord + Clone> Fixture for im::OrdSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableSet, vec![T::descriptor()])
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let mut set = BTreeSet::new();
        containers::distinct::<Self, T, _>(ctx, &mut set);
        Ok(containers::convert::<Self, T>(ctx, set.into_iter().collect()))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(im::OrdSet::new())
    }
}

// ============================================================================
// Maps
// ============================================================================

fn map_args<K: Fixture, V: Fixture>() -> Vec<TypeDescriptor> {
    vec![K::descriptor(), V::descriptor()]
}

impl<K, V, S> Fixture for HashMap<K, V, S>
where
    K: Fixture + Hash + Eq,
    V: Fixture,
    S: BuildHasher + Default + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::Map, map_args::<K, V>())
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let keys = IndexSet::with_hasher(ahash::RandomState::new());
        Ok(containers::pairs::<Self, K, V, _>(ctx, keys)
            .into_iter()
            .collect())
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(HashMap::with_hasher(S::default()))
    }
}

impl<K: Fixture + Ord, V: Fixture> Fixture for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::Map, map_args::<K, V>())
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        Ok(containers::pairs::<Self, K, V, _>(ctx, BTreeSet::new())
            .into_iter()
            .collect())
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(BTreeMap::new())
    }
}

impl<K, V> Fixture for im::HashMap<K, V>
where
    K: Fixture + Hash + Eq + Clone,
    V: Fixture + Clone,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableMap, map_args::<K, V>())
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let keys = IndexSet::with_hasher(ahash::RandomState::new());
        let pairs = containers::pairs::<Self, K, V, _>(ctx, keys);
        Ok(containers::convert::<Self, (K, V)>(ctx, pairs))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(im::HashMap::default())
    }
}

impl<K, V> Fixture for im::OrdMap<K, V>
where
    K: Fixture + Ord + Clone,
    V: Fixture + Clone,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::container::<Self>(Shape::ImmutableMap, map_args::<K, V>())
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        let pairs = containers::pairs::<Self, K, V, _>(ctx, BTreeSet::new());
        Ok(containers::convert::<Self, (K, V)>(ctx, pairs))
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(im::OrdMap::new())
    }
}

// ============================================================================
// Wrappers and tuples
// ============================================================================

impl<T: Fixture> Fixture for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::composite::<Self>()
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        ctx.compose::<Self>()
    }

    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        Some(None)
    }
}

impl<T: Fixture> Composite for Option<T> {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table
            .add(Constructor::new(
                "Some",
                vec![Parameter::of::<T>("value")],
                |args| Ok(Some(args.take::<T>()?)),
            ))
            .add(Constructor::parameterless("None", || None));
    }

    fn into_members(self) -> Members {
        let mut members = Members::with_capacity(1);
        if let Some(value) = self {
            members.push("value", value);
        }
        members
    }
}

impl<T: Fixture> Fixture for Box<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::composite::<Self>()
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        ctx.compose::<Self>()
    }

    fn fallback(ctx: &mut GenerationContext<'_>) -> Option<Self> {
        T::fallback(ctx).map(Box::new)
    }
}

impl<T: Fixture> Composite for Box<T> {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table.add(Constructor::new(
            "new",
            vec![Parameter::of::<T>("value")],
            |args| Ok(Box::new(args.take::<T>()?)),
        ));
    }

    fn into_members(self) -> Members {
        let mut members = Members::with_capacity(1);
        members.push("value", *self);
        members
    }
}

impl<T: Fixture> Fixture for Arc<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::composite::<Self>()
    }

    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
        ctx.compose::<Self>()
    }

    fn fallback(ctx: &mut GenerationContext<'_>) -> Option<Self> {
        T::fallback(ctx).map(Arc::new)
    }
}

impl<T: Fixture> Composite for Arc<T> {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table.add(Constructor::new(
            "new",
            vec![Parameter::of::<T>("value")],
            |args| Ok(Arc::new(args.take::<T>()?)),
        ));
    }

    fn into_members(self) -> Members {
        let mut members = Members::with_capacity(1);
        if let Ok(value) = Arc::try_unwrap(self) {
            members.push("value", value);
        }
        members
    }
}

macro_rules! tuple {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: Fixture),+> Fixture for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::composite::<Self>()
            }

            fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
                ctx.compose::<Self>()
            }
        }

        impl<$($name: Fixture),+> Composite for ($($name,)+) {
            fn constructors(table: &mut ConstructorTable<Self>) {
                table.add(Constructor::new(
                    "tuple",
                    vec![$(Parameter::of::<$name>(concat!("_", stringify!($index)))),+],
                    |args| Ok(($(args.take::<$name>()?,)+)),
                ));
            }

            fn into_members(self) -> Members {
                let mut members = Members::new();
                $(members.push(concat!("_", stringify!($index)), self.$index);)+
                members
            }
        }
    };
}

tuple!(A: 0, B: 1);
tuple!(A: 0, B: 1, C: 2);
tuple!(A: 0, B: 1, C: 2, D: 3);
