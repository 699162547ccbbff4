//! Traits implemented by every type the generator can synthesize.

use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::FixtureError;
use crate::resolver::{ConstructorTable, Members};

/// A type that can be synthesized as a test fixture.
///
/// Implemented for primitives, std / `im` / `chrono` / `uuid` types, and for
/// user types through `#[derive(Fixture)]`. Do not call
/// [`Fixture::synthesize`] directly: go through
/// [`GenerationContext::create`], which applies overrides and the recursion
/// guard before dispatching here.
///
/// # Example
///
/// ```ignore
/// use fixture_flow::{Fixture, FixtureRuntime};
///
/// #[derive(Fixture)]
/// struct Customer {
///     id: u32,
///     name: String,
/// }
///
/// let customer: Customer = FixtureRuntime::new().create();
/// assert_ne!(customer.id, 0);
/// ```
pub trait Fixture: Sized + 'static {
    /// Identity and shape of the type.
    fn descriptor() -> TypeDescriptor;

    /// Build a value with the default strategy for the type's shape.
    fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError>;

    /// A value that can be produced without descending further.
    ///
    /// Used when a cycle or the depth ceiling stops descent, and to replace
    /// arguments and container elements whose synthesis failed. Leaves return
    /// a fresh draw, containers return an empty container, `Option` returns
    /// `None`, and composites use their zero-argument construction path if
    /// they have one.
    fn fallback(_ctx: &mut GenerationContext<'_>) -> Option<Self> {
        None
    }
}

/// A type built through constructors or factories.
///
/// The derive macro emits both this and the [`Fixture`] impl. A hand-written
/// impl pairs it with a `Fixture` impl whose bodies are
/// [`TypeDescriptor::composite`], [`GenerationContext::compose`] and
/// [`GenerationContext::compose_fallback`].
pub trait Composite: Fixture {
    /// `true` if members must be replaced by reconstruction rather than
    /// assigned in place.
    const IMMUTABLE: bool = false;

    /// Declares the construction paths, in declaration order.
    fn constructors(table: &mut ConstructorTable<Self>);

    /// Decomposes a value into its named members, used to reconstruct the
    /// value with one member replaced.
    fn into_members(self) -> Members {
        Members::new()
    }
}

/// A field-less enum.
pub trait Enumeration: Fixture {
    const VARIANT_COUNT: usize;

    /// The variant at `index` in declaration order.
    fn variant(index: usize) -> Option<Self>;
}
