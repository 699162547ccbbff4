//! Per-call generation state and the recursive `create` algorithm.

use std::any::{Any, TypeId};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::descriptor::{Shape, TypeDescriptor};
use crate::error::FixtureError;
use crate::fixture::{Composite, Enumeration, Fixture};
use crate::guard::VisitedSet;
use crate::primitive;
use crate::resolver::{Arguments, Constructor, Members, Parameter};
use crate::runtime::FixtureRuntime;
use crate::tracer::{SpanId, SynthesisOutcome, Tracer, TracerTypeKey};

/// Outcome of running one construction path.
enum Assembly<T> {
    Built(T),
    /// An argument could be neither synthesized nor replaced by a fallback.
    MissingArgument(FixtureError),
    /// The constructor itself returned an error.
    Failed(FixtureError),
}

/// State of one top-level `create` call.
///
/// Created fresh for every call on [`FixtureRuntime`] and dropped when the
/// call returns; nothing here is shared between calls. Producers registered
/// with [`FixtureRuntime::register_with`] receive it, so they can synthesize
/// parts of their value and read the call's random source.
pub struct GenerationContext<'r> {
    runtime: &'r FixtureRuntime,
    repeat_count: usize,
    max_depth: usize,
    depth: usize,
    visited: VisitedSet,
    rng: StdRng,
    now: DateTime<Utc>,
}

impl<'r> GenerationContext<'r> {
    pub(crate) fn new(runtime: &'r FixtureRuntime, seed: u64) -> Self {
        let config = runtime.config();
        Self {
            runtime,
            repeat_count: config.repeat_count,
            max_depth: config.max_depth,
            depth: 0,
            visited: VisitedSet::new(),
            rng: StdRng::seed_from_u64(seed),
            now: Utc::now(),
        }
    }

    pub fn runtime(&self) -> &'r FixtureRuntime {
        self.runtime
    }

    /// The random source of this call.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Reference time of this call; generated timestamps lie before it.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn repeat_count(&self) -> usize {
        self.repeat_count
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if an ancestor frame is constructing `T`.
    pub fn is_constructing<T: 'static>(&self) -> bool {
        self.visited.contains(TypeId::of::<T>())
    }

    fn tracer(&self) -> &'r dyn Tracer {
        self.runtime.tracer()
    }

    /// Synthesize a `T`.
    ///
    /// Checks, in order: a registered override, the customizers, the depth
    /// ceiling, and for composites the set of types under construction. Then dispatches on
    /// the type's shape. A cut-off frame answers with [`Fixture::fallback`].
    pub fn create<T: Fixture>(&mut self) -> Result<T, FixtureError> {
        let runtime = self.runtime;
        let tracer = self.tracer();
        let descriptor = runtime.descriptor::<T>();
        let key = TracerTypeKey::from(descriptor.as_ref());
        let span_id = tracer.new_span_id();
        tracer.on_create_start(span_id, key, self.depth);

        if let Some(value) = runtime.overrides().produce::<T>(self) {
            tracer.on_override_applied(key);
            tracer.on_create_end(span_id, key, SynthesisOutcome::Overridden);
            return Ok(value);
        }

        if let Some(value) = self.customized::<T>(&descriptor, key) {
            tracer.on_customized(key);
            tracer.on_create_end(span_id, key, SynthesisOutcome::Customized);
            return Ok(value);
        }

        let shape = descriptor.shape();
        if !shape.is_leaf() && self.depth > self.max_depth {
            tracer.on_depth_limit(key, self.depth);
            return self.cut_off(span_id, key);
        }

        let result = match shape {
            Shape::Primitive | Shape::Enum => T::synthesize(self),
            Shape::Composite => {
                if !self.visited.push(&descriptor) {
                    tracer.on_cycle_detected(self.visited.cycle_path(&descriptor));
                    return self.cut_off(span_id, key);
                }
                let result = self.descend(T::synthesize);
                self.visited.pop();
                result
            }
            _ => self.descend(T::synthesize),
        };

        let outcome = match &result {
            Ok(_) => SynthesisOutcome::Generated,
            Err(err) => SynthesisOutcome::Failed {
                message: err.to_string(),
            },
        };
        tracer.on_create_end(span_id, key, outcome);
        result
    }

    /// The first customizer answer for `T`, newest customizer first.
    ///
    /// An answer of another type is reported to the tracer and the next
    /// customizer is asked.
    fn customized<T: Fixture>(&mut self, descriptor: &TypeDescriptor, key: TracerTypeKey) -> Option<T> {
        for customizer in self.runtime.overrides().customizers() {
            let Some(value) = customizer.apply::<T>(descriptor, self) else {
                continue;
            };
            match value.downcast::<T>() {
                Ok(value) => return Some(*value),
                Err(_) => self.tracer().on_invocation_failed(
                    key,
                    "customize",
                    &anyhow::anyhow!("customizer answered `{}` with another type", key.type_name),
                ),
            }
        }
        None
    }

    fn descend<T>(
        &mut self,
        synthesize: fn(&mut GenerationContext<'_>) -> Result<T, FixtureError>,
    ) -> Result<T, FixtureError> {
        self.depth += 1;
        let result = synthesize(self);
        self.depth -= 1;
        result
    }

    fn cut_off<T: Fixture>(&mut self, span_id: SpanId, key: TracerTypeKey) -> Result<T, FixtureError> {
        let tracer = self.tracer();
        match T::fallback(self) {
            Some(value) => {
                tracer.on_create_end(span_id, key, SynthesisOutcome::Fallback);
                Ok(value)
            }
            None => {
                let err = FixtureError::RecursionLimit {
                    type_name: key.type_name,
                    depth: self.depth,
                };
                tracer.on_create_end(
                    span_id,
                    key,
                    SynthesisOutcome::Failed {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Synthesize `n` independent values of `T`.
    pub fn create_many<T: Fixture>(&mut self, n: usize) -> Result<Vec<T>, FixtureError> {
        (0..n).map(|_| self.create::<T>()).collect()
    }

    /// Uniformly chosen variant of a field-less enum.
    pub fn pick_variant<T: Enumeration>(&mut self) -> Result<T, FixtureError> {
        primitive::variant(&mut self.rng)
    }

    /// Build a composite through its resolved plan.
    ///
    /// Runs the primary construction path. If an argument is unavailable or
    /// the constructor fails, the plan's degrade path is tried once; if that
    /// is absent or fails too, the first failure is returned.
    pub fn compose<T: Composite>(&mut self) -> Result<T, FixtureError> {
        let plan = self.runtime.cache().plan::<T>(self.tracer())?;
        let first = match self.assemble(plan.primary()) {
            Assembly::Built(value) => return Ok(value),
            Assembly::MissingArgument(err) | Assembly::Failed(err) => err,
        };
        match plan.degrade() {
            Some(degrade) => match self.assemble(degrade) {
                Assembly::Built(value) => Ok(value),
                Assembly::MissingArgument(_) | Assembly::Failed(_) => Err(first),
            },
            None => Err(first),
        }
    }

    /// The recursion-safe value of a composite: its zero-argument path, if
    /// the plan has one.
    pub fn compose_fallback<T: Composite>(&mut self) -> Option<T> {
        let plan = self.runtime.cache().plan::<T>(self.tracer()).ok()?;
        let constructor = plan.recursion_safe()?;
        match constructor.invoke(&mut Arguments::empty()) {
            Ok(value) => Some(value),
            Err(err) => {
                self.invocation_failed::<T>(constructor, &err);
                None
            }
        }
    }

    fn assemble<T: Composite>(&mut self, constructor: &Constructor<T>) -> Assembly<T> {
        let mut values = Vec::with_capacity(constructor.params().len());
        for param in constructor.params() {
            match self.argument(param) {
                Ok(value) => values.push(value),
                Err(err) => {
                    let key = TracerTypeKey::from(self.descriptor::<T>().as_ref());
                    self.tracer().on_argument_unavailable(key, param.name());
                    return Assembly::MissingArgument(err);
                }
            }
        }
        match constructor.invoke(&mut Arguments::new(values)) {
            Ok(value) => Assembly::Built(value),
            Err(err) => {
                self.invocation_failed::<T>(constructor, &err);
                Assembly::Failed(FixtureError::Invocation {
                    type_name: std::any::type_name::<T>(),
                    member: constructor.name(),
                    cause: Arc::new(err),
                })
            }
        }
    }

    /// Synthesize one argument, substituting the fallback on failure.
    fn argument(&mut self, param: &Parameter) -> Result<Box<dyn Any>, FixtureError> {
        match param.synthesize(self) {
            Ok(value) => Ok(value),
            Err(err) => param.fallback(self).ok_or(err),
        }
    }

    fn invocation_failed<T: Fixture>(&self, constructor: &Constructor<T>, err: &anyhow::Error) {
        let key = TracerTypeKey::from(self.descriptor::<T>().as_ref());
        self.tracer()
            .on_invocation_failed(key, constructor.name(), err);
    }

    /// Rebuild `base` through the greediest constructor with the member
    /// named `member` replaced by `value`.
    ///
    /// Parameters are matched to members by name, ignoring ASCII case.
    /// Parameters without a matching member are synthesized.
    pub(crate) fn reconstruct<T: Composite>(
        &mut self,
        base: T,
        member: &'static str,
        value: Box<dyn Any>,
    ) -> Result<T, FixtureError> {
        let plan = self.runtime.cache().plan::<T>(self.tracer())?;
        let constructor = plan.greediest().ok_or(FixtureError::Unconstructable {
            type_name: std::any::type_name::<T>(),
        })?;

        let mut members: Members = base.into_members();
        let mut replacement = Some(value);
        let mut values = Vec::with_capacity(constructor.params().len());
        for param in constructor.params() {
            let supplied = if param.name().eq_ignore_ascii_case(member) {
                replacement.take()
            } else {
                None
            };
            let value = match supplied.or_else(|| members.take(param.name())) {
                Some(value) => value,
                None => self.argument(param)?,
            };
            values.push(value);
        }

        if replacement.is_some() {
            return Err(FixtureError::Invocation {
                type_name: std::any::type_name::<T>(),
                member: constructor.name(),
                cause: Arc::new(anyhow::anyhow!(
                    "no parameter of `{}` matches member `{member}`",
                    constructor.name()
                )),
            });
        }

        constructor
            .invoke(&mut Arguments::new(values))
            .map_err(|err| FixtureError::Invocation {
                type_name: std::any::type_name::<T>(),
                member: constructor.name(),
                cause: Arc::new(err),
            })
    }

    /// Descriptor of `T`, from the runtime's memo.
    pub fn descriptor<T: Fixture>(&self) -> Arc<TypeDescriptor> {
        self.runtime.descriptor::<T>()
    }
}
