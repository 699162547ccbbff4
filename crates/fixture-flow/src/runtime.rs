//! Fixture runtime and builder.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::builder::FixtureBuilder;
use crate::cache::{CacheStats, InvocationCache};
use crate::config::FixtureConfig;
use crate::context::GenerationContext;
use crate::descriptor::{DescriptorCache, TypeDescriptor};
use crate::error::FixtureError;
use crate::fixture::{Composite, Fixture};
use crate::overrides::OverrideRegistry;
use crate::tracer::{NoopTracer, Tracer};

/// The fixture runtime holds overrides, cached plans and invokers, and the
/// seed source shared by every `create` call.
///
/// This is cheap to clone - all data is behind `Arc`. Clones share
/// overrides, caches and the seed sequence. A runtime can be shared across
/// threads; every call gets its own [`GenerationContext`].
///
/// # Example
///
/// ```ignore
/// let runtime = FixtureRuntime::new();
///
/// let order: Order = runtime.create();
/// let orders: Vec<Order> = runtime.create_many(5);
///
/// runtime.register(|| Currency::Eur);
/// let priced: Invoice = runtime.create();
/// ```
pub struct FixtureRuntime {
    config: Arc<FixtureConfig>,
    overrides: Arc<OverrideRegistry>,
    cache: Arc<InvocationCache>,
    descriptors: Arc<DescriptorCache>,
    tracer: Arc<dyn Tracer>,
    seeds: Arc<Mutex<StdRng>>,
}

impl Default for FixtureRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FixtureRuntime {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            overrides: self.overrides.clone(),
            cache: self.cache.clone(),
            descriptors: self.descriptors.clone(),
            tracer: self.tracer.clone(),
            seeds: self.seeds.clone(),
        }
    }
}

impl FixtureRuntime {
    /// Create a new runtime with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for customizing the runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let runtime = FixtureRuntime::builder()
    ///     .repeat_count(5)
    ///     .max_depth(3)
    ///     .seed(42)
    ///     .build();
    /// ```
    pub fn builder() -> FixtureRuntimeBuilder {
        FixtureRuntimeBuilder::new()
    }

    /// Create a runtime from a configuration.
    pub fn with_config(config: FixtureConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub(crate) fn overrides(&self) -> &OverrideRegistry {
        &self.overrides
    }

    pub(crate) fn cache(&self) -> &InvocationCache {
        &self.cache
    }

    pub(crate) fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    pub(crate) fn descriptor<T: Fixture>(&self) -> Arc<TypeDescriptor> {
        self.descriptors.get::<T>()
    }

    /// Run `f` with a fresh generation context.
    ///
    /// The context draws its random seed from the runtime's seed source, so a
    /// seeded runtime replays the same sequence of calls identically.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut GenerationContext<'_>) -> R) -> R {
        let seed = self.seeds.lock().gen::<u64>();
        let mut ctx = GenerationContext::new(self, seed);
        f(&mut ctx)
    }

    /// Synthesize one `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` cannot be constructed at all: no usable constructor,
    /// factory or parameterless path, or a constructor that fails with no
    /// default path to fall back to. Use [`FixtureRuntime::try_create`] to
    /// handle that case.
    pub fn create<T: Fixture>(&self) -> T {
        match self.try_create() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Synthesize one `T`, returning the error instead of panicking.
    pub fn try_create<T: Fixture>(&self) -> Result<T, FixtureError> {
        self.with_context(|ctx| ctx.create::<T>())
    }

    /// Synthesize `n` independent values of `T`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`FixtureRuntime::create`].
    pub fn create_many<T: Fixture>(&self, n: usize) -> Vec<T> {
        (0..n).map(|_| self.create()).collect()
    }

    /// Synthesize `n` independent values of `T`, stopping at the first error.
    pub fn try_create_many<T: Fixture>(&self, n: usize) -> Result<Vec<T>, FixtureError> {
        (0..n).map(|_| self.try_create()).collect()
    }

    /// Synthesize `repeat_count` independent values of `T`.
    pub fn create_many_default<T: Fixture>(&self) -> Vec<T> {
        self.create_many(self.config.repeat_count)
    }

    /// Install or replace the override for `T`.
    ///
    /// Overrides are checked before any other strategy, for top-level calls
    /// and nested members alike.
    pub fn register<T, F>(&self, produce: F)
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.overrides.register::<T, _>(move |_| produce());
    }

    /// Install or replace an override that can synthesize through the
    /// calling context.
    ///
    /// A producer that requests its own type gets the default strategy, not
    /// itself.
    ///
    /// # Example
    ///
    /// ```ignore
    /// runtime.register_with(|ctx| Order {
    ///     status: Status::Paid,
    ///     // falls through to the default strategy for `Order`
    ///     ..ctx.create::<Order>().unwrap_or_default()
    /// });
    /// ```
    pub fn register_with<T, F>(&self, produce: F)
    where
        T: 'static,
        F: Fn(&mut GenerationContext<'_>) -> T + Send + Sync + 'static,
    {
        self.overrides.register::<T, _>(produce);
    }

    /// Remove the override for `T`. Returns `true` if one was registered.
    pub fn unregister<T: 'static>(&self) -> bool {
        self.overrides.unregister::<T>()
    }

    pub fn has_override<T: 'static>(&self) -> bool {
        self.overrides.contains::<T>()
    }

    /// Install a customizer that may answer for any requested type.
    ///
    /// Customizers run after the override for the type and before its
    /// default strategy, newest first. Returning `None` passes the request
    /// on. An answer whose type does not match is reported to the tracer
    /// and also passed on. A customizer asked again for the same type while
    /// it is answering is skipped.
    ///
    /// # Example
    ///
    /// ```ignore
    /// runtime.customize(|descriptor, ctx| {
    ///     if descriptor.name().ends_with("Email") {
    ///         let user = ctx.create::<String>().ok()?;
    ///         return Some(Box::new(Email(format!("{user}@example.com"))));
    ///     }
    ///     None
    /// });
    /// ```
    pub fn customize<F>(&self, customize: F)
    where
        F: Fn(&TypeDescriptor, &mut GenerationContext<'_>) -> Option<Box<dyn Any>>
            + Send
            + Sync
            + 'static,
    {
        self.overrides.customize(customize);
    }

    /// Remove every customizer. Returns how many were installed.
    pub fn clear_customizers(&self) -> usize {
        self.overrides.clear_customizers()
    }

    /// Start a builder that applies member overrides after synthesis.
    pub fn build<T: Composite>(&self) -> FixtureBuilder<'_, T> {
        FixtureBuilder::new(self)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Builder for [`FixtureRuntime`] with custom settings.
pub struct FixtureRuntimeBuilder {
    config: FixtureConfig,
    tracer: Arc<dyn Tracer>,
}

impl Default for FixtureRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: FixtureConfig::default(),
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Elements per container, and the size of `create_many_default`.
    pub fn repeat_count(mut self, count: usize) -> Self {
        self.config.repeat_count = count;
        self
    }

    /// Recursion ceiling.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Seed the runtime's random source for reproducible fixtures.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Replace all settings at once.
    pub fn config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the tracer that observes synthesis.
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Build the runtime with the configured settings.
    pub fn build(self) -> FixtureRuntime {
        let seeds = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        FixtureRuntime {
            config: Arc::new(self.config),
            overrides: Arc::new(OverrideRegistry::new()),
            cache: Arc::new(InvocationCache::new()),
            descriptors: Arc::new(DescriptorCache::new()),
            tracer: self.tracer,
            seeds: Arc::new(Mutex::new(seeds)),
        }
    }
}
