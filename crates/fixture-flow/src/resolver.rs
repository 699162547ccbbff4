//! Constructor and factory selection for composite types.
//!
//! A composite declares its construction paths in a [`ConstructorTable`].
//! [`Plan::resolve`] picks one of them with a fixed priority:
//!
//! 1. the first zero-argument [`ConstructorKind::SampleFactory`];
//! 2. the [`ConstructorKind::Constructor`] or [`ConstructorKind::Factory`]
//!    with the most parameters, the earliest declaration winning a tie;
//! 3. the first [`ConstructorKind::Parameterless`] path.
//!
//! If none exists the type is unconstructable.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::context::GenerationContext;
use crate::error::{FixtureError, InvocationError};
use crate::fixture::{Composite, Fixture};

/// How a construction path was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorKind {
    /// A memberwise constructor, like a struct literal or `new`.
    Constructor,
    /// A static factory taking arguments, like `from_parts`.
    Factory,
    /// A zero-argument factory that creates a representative sample.
    SampleFactory,
    /// A zero-argument default path, like `Default::default`.
    Parameterless,
}

type SynthesizeFn = fn(&mut GenerationContext<'_>) -> Result<Box<dyn Any>, FixtureError>;
type FallbackFn = fn(&mut GenerationContext<'_>) -> Option<Box<dyn Any>>;
type InvokeFn<T> = dyn Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync;

fn synthesize_erased<P: Fixture>(
    ctx: &mut GenerationContext<'_>,
) -> Result<Box<dyn Any>, FixtureError> {
    ctx.create::<P>().map(|value| Box::new(value) as Box<dyn Any>)
}

fn fallback_erased<P: Fixture>(ctx: &mut GenerationContext<'_>) -> Option<Box<dyn Any>> {
    P::fallback(ctx).map(|value| Box::new(value) as Box<dyn Any>)
}

/// One typed parameter of a construction path.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    synthesize: SynthesizeFn,
    fallback: FallbackFn,
}

impl Parameter {
    /// A parameter named `name` whose argument is a synthesized `P`.
    pub fn of<P: Fixture>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            synthesize: synthesize_erased::<P>,
            fallback: fallback_erased::<P>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn synthesize(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Box<dyn Any>, FixtureError> {
        (self.synthesize)(ctx)
    }

    pub(crate) fn fallback(&self, ctx: &mut GenerationContext<'_>) -> Option<Box<dyn Any>> {
        (self.fallback)(ctx)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

/// Positional arguments handed to a construction path.
///
/// Each [`Arguments::take`] consumes the next argument in parameter order.
pub struct Arguments {
    values: Vec<Option<Box<dyn Any>>>,
    next: usize,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Box<dyn Any>>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
            next: 0,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Take the next argument as a `P`.
    pub fn take<P: 'static>(&mut self) -> Result<P, InvocationError> {
        let index = self.next;
        self.next += 1;
        let missing = InvocationError::MissingArgument {
            index,
            declared: self.values.len(),
        };
        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(missing)?;
        value
            .downcast::<P>()
            .map(|value| *value)
            .map_err(|_| InvocationError::TypeMismatch {
                index,
                expected: std::any::type_name::<P>(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A declared construction path of `T`.
pub struct Constructor<T> {
    name: &'static str,
    kind: ConstructorKind,
    params: Vec<Parameter>,
    invoke: Arc<InvokeFn<T>>,
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            params: self.params.clone(),
            invoke: self.invoke.clone(),
        }
    }
}

impl<T> Constructor<T> {
    fn with_kind<F>(name: &'static str, kind: ConstructorKind, params: Vec<Parameter>, f: F) -> Self
    where
        F: Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            params,
            invoke: Arc::new(f),
        }
    }

    /// A constructor taking `params`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// Constructor::new(
    ///     "new",
    ///     vec![Parameter::of::<String>("name"), Parameter::of::<u8>("age")],
    ///     |args| Person::new(args.take()?, args.take()?),
    /// )
    /// ```
    pub fn new<F>(name: &'static str, params: Vec<Parameter>, f: F) -> Self
    where
        F: Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::with_kind(name, ConstructorKind::Constructor, params, f)
    }

    /// A static factory taking `params`.
    pub fn factory<F>(name: &'static str, params: Vec<Parameter>, f: F) -> Self
    where
        F: Fn(&mut Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::with_kind(name, ConstructorKind::Factory, params, f)
    }

    /// A zero-argument factory producing a representative sample.
    ///
    /// Preferred over every other path.
    pub fn sample<F>(name: &'static str, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_kind(name, ConstructorKind::SampleFactory, Vec::new(), move |_| {
            Ok(f())
        })
    }

    /// A zero-argument default path, used when nothing greedier exists.
    pub fn parameterless<F>(name: &'static str, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_kind(name, ConstructorKind::Parameterless, Vec::new(), move |_| {
            Ok(f())
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ConstructorKind {
        self.kind
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &mut Arguments) -> anyhow::Result<T> {
        (self.invoke)(args)
    }

    fn is_greedy_candidate(&self) -> bool {
        matches!(
            self.kind,
            ConstructorKind::Constructor | ConstructorKind::Factory
        )
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish()
    }
}

/// Construction paths of `T` in declaration order.
pub struct ConstructorTable<T> {
    entries: Vec<Constructor<T>>,
}

impl<T> Default for ConstructorTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConstructorTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, constructor: Constructor<T>) -> &mut Self {
        self.entries.push(constructor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The resolved construction strategy of a composite type.
pub struct Plan<T> {
    constructors: Vec<Constructor<T>>,
    primary: usize,
    degrade: Option<usize>,
    greediest: Option<usize>,
}

impl<T: Composite> Plan<T> {
    /// Collect `T`'s constructors and resolve them.
    pub fn for_type() -> Result<Self, FixtureError> {
        let mut table = ConstructorTable::new();
        T::constructors(&mut table);
        Self::resolve(table)
    }
}

impl<T: 'static> Plan<T> {
    /// Pick the primary path, the degrade path and the greediest path.
    pub fn resolve(table: ConstructorTable<T>) -> Result<Self, FixtureError> {
        let constructors = table.entries;

        let sample = constructors
            .iter()
            .position(|c| c.kind == ConstructorKind::SampleFactory && c.params.is_empty());
        let greediest = constructors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_greedy_candidate())
            .fold(None::<(usize, usize)>, |best, (index, c)| match best {
                Some((_, arity)) if arity >= c.params.len() => best,
                _ => Some((index, c.params.len())),
            })
            .map(|(index, _)| index);
        let parameterless = constructors
            .iter()
            .position(|c| c.kind == ConstructorKind::Parameterless);

        let primary = sample
            .or(greediest)
            .or(parameterless)
            .ok_or(FixtureError::Unconstructable {
                type_name: std::any::type_name::<T>(),
            })?;

        // A sample factory that fails degrades to the greediest path.
        let degrade = constructors
            .iter()
            .enumerate()
            .position(|(index, c)| index != primary && c.params.is_empty())
            .or(if Some(primary) == sample {
                greediest
            } else {
                None
            });

        Ok(Self {
            constructors,
            primary,
            degrade,
            greediest,
        })
    }

    /// The path used for normal synthesis.
    pub fn primary(&self) -> &Constructor<T> {
        &self.constructors[self.primary]
    }

    /// The path tried once when the primary path fails.
    pub fn degrade(&self) -> Option<&Constructor<T>> {
        self.degrade.map(|index| &self.constructors[index])
    }

    /// The constructor or factory with the most parameters, used to
    /// reconstruct a value with one member replaced.
    pub fn greediest(&self) -> Option<&Constructor<T>> {
        self.greediest.map(|index| &self.constructors[index])
    }

    /// A zero-argument path, usable when descent must stop.
    pub fn recursion_safe(&self) -> Option<&Constructor<T>> {
        std::iter::once(self.primary())
            .chain(self.degrade())
            .find(|c| c.params.is_empty())
    }

    pub fn constructors(&self) -> &[Constructor<T>] {
        &self.constructors
    }
}

impl<T> fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("primary", &self.constructors[self.primary].name)
            .field("degrade", &self.degrade.map(|i| self.constructors[i].name))
            .field("greediest", &self.greediest.map(|i| self.constructors[i].name))
            .finish()
    }
}

/// Named member values of a decomposed composite.
#[derive(Default)]
pub struct Members {
    entries: Vec<(&'static str, Box<dyn Any>)>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push<V: 'static>(&mut self, name: &'static str, value: V) -> &mut Self {
        self.entries.push((name, Box::new(value)));
        self
    }

    /// Remove the member whose name matches `name`, ignoring ASCII case.
    pub fn take(&mut self, name: &str) -> Option<Box<dyn Any>> {
        let index = self
            .entries
            .iter()
            .position(|(member, _)| member.eq_ignore_ascii_case(name))?;
        Some(self.entries.swap_remove(index).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: Vec<Constructor<u32>>) -> ConstructorTable<u32> {
        let mut table = ConstructorTable::new();
        for entry in entries {
            table.add(entry);
        }
        table
    }

    fn ctor(name: &'static str, arity: usize) -> Constructor<u32> {
        let params = (0..arity).map(|_| Parameter::of::<u8>("x")).collect();
        Constructor::new(name, params, |_| Ok(0))
    }

    #[test]
    fn test_sample_factory_wins() {
        let plan = Plan::resolve(table(vec![
            ctor("wide", 3),
            Constructor::sample("sample", || 1),
            Constructor::parameterless("default", || 2),
        ]))
        .unwrap();
        assert_eq!(plan.primary().name(), "sample");
        assert_eq!(plan.degrade().map(|c| c.name()), Some("default"));
        assert_eq!(plan.greediest().map(|c| c.name()), Some("wide"));
    }

    #[test]
    fn test_sample_without_other_zero_arg_degrades_to_greediest() {
        let plan = Plan::resolve(table(vec![
            Constructor::sample("sample", || 1),
            ctor("wide", 2),
        ]))
        .unwrap();
        assert_eq!(plan.degrade().map(|c| c.name()), Some("wide"));
    }

    #[test]
    fn test_greediest_constructor() {
        let plan = Plan::resolve(table(vec![
            Constructor::parameterless("default", || 0),
            ctor("narrow", 1),
            Constructor::factory("from_parts", vec![Parameter::of::<u8>("a"); 4], |_| Ok(4)),
            ctor("middle", 2),
        ]))
        .unwrap();
        assert_eq!(plan.primary().name(), "from_parts");
        assert_eq!(plan.primary().kind(), ConstructorKind::Factory);
        assert_eq!(plan.degrade().map(|c| c.name()), Some("default"));
        assert_eq!(plan.recursion_safe().map(|c| c.name()), Some("default"));
    }

    #[test]
    fn test_tie_goes_to_earliest_declaration() {
        let plan = Plan::resolve(table(vec![ctor("first", 2), ctor("second", 2)])).unwrap();
        assert_eq!(plan.primary().name(), "first");
        assert!(plan.degrade().is_none());
        assert!(plan.recursion_safe().is_none());
    }

    #[test]
    fn test_parameterless_only() {
        let plan = Plan::resolve(table(vec![Constructor::parameterless("default", || 0)])).unwrap();
        assert_eq!(plan.primary().kind(), ConstructorKind::Parameterless);
        assert!(plan.greediest().is_none());
    }

    #[test]
    fn test_empty_table_is_unconstructable() {
        let err = Plan::<u32>::resolve(ConstructorTable::new()).unwrap_err();
        assert!(err.is_unconstructable());
    }

    #[test]
    fn test_arguments_take_in_order() {
        let mut args = Arguments::new(vec![Box::new(7u8), Box::new(String::from("x"))]);
        assert_eq!(args.take::<u8>().unwrap(), 7);
        assert_eq!(args.take::<String>().unwrap(), "x");
        assert_eq!(
            args.take::<u8>().unwrap_err(),
            InvocationError::MissingArgument {
                index: 2,
                declared: 2
            }
        );
    }

    #[test]
    fn test_arguments_type_mismatch() {
        let mut args = Arguments::new(vec![Box::new(7u8)]);
        assert!(matches!(
            args.take::<u16>(),
            Err(InvocationError::TypeMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_members_take_ignores_case() {
        let mut members = Members::new();
        members.push("Name", String::from("ada")).push("age", 36u8);
        let name = members.take("name").unwrap();
        assert_eq!(name.downcast_ref::<String>().map(String::as_str), Some("ada"));
        assert!(members.take("name").is_none());
        assert_eq!(members.names().collect::<Vec<_>>(), vec!["age"]);
    }
}
