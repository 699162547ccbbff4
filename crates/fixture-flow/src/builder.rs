//! Post-synthesis member overrides.

use std::any::Any;
use std::fmt;

use crate::context::GenerationContext;
use crate::error::FixtureError;
use crate::fixture::Composite;
use crate::runtime::FixtureRuntime;

/// Typed accessor for one member `V` of `T`.
///
/// Built with [`field!`](crate::field) for a full accessor, or with
/// [`Field::named`] when only the member name is known. A field without a
/// setter, or any field of a type declared immutable, is applied by
/// reconstructing the value.
pub struct Field<T, V> {
    name: &'static str,
    get: Option<fn(&T) -> &V>,
    set: Option<fn(&mut T, V)>,
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Field<T, V> {}

impl<T, V> Field<T, V> {
    pub fn new(name: &'static str, get: fn(&T) -> &V, set: fn(&mut T, V)) -> Self {
        Self {
            name,
            get: Some(get),
            set: Some(set),
        }
    }

    /// An accessor that only knows the member's name.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            get: None,
            set: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the member, if this accessor has a getter.
    pub fn get<'a>(&self, target: &'a T) -> Option<&'a V> {
        self.get.map(|get| get(target))
    }
}

impl<T, V> fmt::Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("settable", &self.set.is_some())
            .finish()
    }
}

/// Full accessor for a named member: `field!(Order, quantity)`.
#[macro_export]
macro_rules! field {
    ($ty:ty, $member:ident) => {
        $crate::Field::<$ty, _>::new(
            stringify!($member),
            |target: &$ty| &target.$member,
            |target: &mut $ty, value| target.$member = value,
        )
    };
}

type Edit<T> = Box<dyn Fn(T, &mut GenerationContext<'_>) -> Result<T, FixtureError>>;

/// Builder returned by [`FixtureRuntime::build`].
///
/// Overrides are recorded with [`FixtureBuilder::with`] and
/// [`FixtureBuilder::without`] and applied in registration order to every
/// value the builder creates.
///
/// # Example
///
/// ```ignore
/// let order = runtime
///     .build::<Order>()
///     .with(field!(Order, quantity), 2)
///     .without(field!(Order, note))
///     .create();
/// assert_eq!(order.quantity, 2);
/// ```
pub struct FixtureBuilder<'r, T> {
    runtime: &'r FixtureRuntime,
    edits: Vec<(&'static str, Edit<T>)>,
}

impl<'r, T: Composite> FixtureBuilder<'r, T> {
    pub(crate) fn new(runtime: &'r FixtureRuntime) -> Self {
        Self {
            runtime,
            edits: Vec::new(),
        }
    }

    /// Set the member selected by `field` to `value`.
    pub fn with<V: Clone + 'static>(mut self, field: Field<T, V>, value: V) -> Self {
        let edit: Edit<T> = Box::new(move |base: T, ctx: &mut GenerationContext<'_>| {
            apply(base, ctx, field, value.clone())
        });
        self.edits.push((field.name(), edit));
        self
    }

    /// Reset the member selected by `field` to `V::default()`.
    pub fn without<V: Default + 'static>(mut self, field: Field<T, V>) -> Self {
        let edit: Edit<T> = Box::new(move |base: T, ctx: &mut GenerationContext<'_>| {
            apply(base, ctx, field, V::default())
        });
        self.edits.push((field.name(), edit));
        self
    }

    /// Names of the overridden members, in registration order.
    pub fn overridden(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edits.iter().map(|(name, _)| *name)
    }

    /// Synthesize one value and apply the recorded overrides.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be synthesized, or an override cannot be
    /// applied because no constructor parameter matches the member.
    pub fn create(&self) -> T {
        match self.try_create() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_create(&self) -> Result<T, FixtureError> {
        self.runtime.with_context(|ctx| -> Result<T, FixtureError> {
            let mut value = ctx.create::<T>()?;
            for (_, edit) in &self.edits {
                value = edit(value, ctx)?;
            }
            Ok(value)
        })
    }

    /// Apply the same overrides to `n` independently synthesized values.
    pub fn create_many(&self, n: usize) -> Vec<T> {
        (0..n).map(|_| self.create()).collect()
    }

    pub fn try_create_many(&self, n: usize) -> Result<Vec<T>, FixtureError> {
        (0..n).map(|_| self.try_create()).collect()
    }

    pub fn create_many_default(&self) -> Vec<T> {
        self.create_many(self.runtime.config().repeat_count)
    }
}

fn apply<T: Composite, V: 'static>(
    base: T,
    ctx: &mut GenerationContext<'_>,
    field: Field<T, V>,
    value: V,
) -> Result<T, FixtureError> {
    match field.set {
        Some(set) if !T::IMMUTABLE => {
            let mut base = base;
            set(&mut base, value);
            Ok(base)
        }
        _ => ctx.reconstruct(base, field.name, Box::new(value) as Box<dyn Any>),
    }
}
