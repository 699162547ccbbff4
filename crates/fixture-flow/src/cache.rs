//! Type-erased cache of resolved plans and generic invokers.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use papaya::HashMap;

use crate::error::FixtureError;
use crate::fixture::Composite;
use crate::resolver::Plan;
use crate::tracer::Tracer;

/// Identity of a cached invoker: the declaring type, the member, and the
/// concrete type arguments for generic members.
///
/// `from_iter` closed over `u32` and `from_iter` closed over `String` are
/// different entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvokerKey {
    declaring: TypeId,
    declaring_name: &'static str,
    member: &'static str,
    type_args: Vec<TypeId>,
}

impl InvokerKey {
    /// Key of a non-generic member of `D`.
    pub fn new<D: Any>(member: &'static str) -> Self {
        Self::generic::<D>(member, Vec::new())
    }

    /// Key of a generic member of `D` closed over `type_args`.
    pub fn generic<D: Any>(member: &'static str, type_args: Vec<TypeId>) -> Self {
        Self {
            declaring: TypeId::of::<D>(),
            declaring_name: std::any::type_name::<D>(),
            member,
            type_args,
        }
    }

    pub fn declaring(&self) -> TypeId {
        self.declaring
    }

    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn type_args(&self) -> &[TypeId] {
        &self.type_args
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Resolved plans held.
    pub plans: usize,
    /// Invokers held.
    pub invokers: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that built a new entry.
    pub misses: u64,
}

type PlanSlot<T> = Result<Arc<Plan<T>>, FixtureError>;

/// Thread-safe, type-erased storage for plans and invokers.
///
/// Uses papaya's lock-free HashMap internally. Two threads populating the
/// same key concurrently may both build a value, but only one is kept and
/// every caller observes that one.
pub(crate) struct InvocationCache {
    plans: HashMap<TypeId, Arc<dyn Any + Send + Sync>, ahash::RandomState>,
    invokers: HashMap<InvokerKey, Arc<dyn Any + Send + Sync>, ahash::RandomState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for InvocationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationCache {
    pub fn new() -> Self {
        Self {
            plans: HashMap::with_hasher(ahash::RandomState::new()),
            invokers: HashMap::with_hasher(ahash::RandomState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The resolved plan of `T`, resolving it on first use.
    ///
    /// Resolution failures are cached too, so an unconstructable type is
    /// reported without re-resolving.
    pub fn plan<T: Composite>(&self, tracer: &dyn Tracer) -> Result<Arc<Plan<T>>, FixtureError> {
        let pinned = self.plans.pin();
        let mut built = false;
        let entry = pinned.get_or_insert_with(TypeId::of::<T>(), || {
            built = true;
            Arc::new(Plan::<T>::for_type().map(Arc::new)) as Arc<dyn Any + Send + Sync>
        });
        self.record(built, tracer, std::any::type_name::<T>(), "plan");
        match entry.clone().downcast::<PlanSlot<T>>() {
            Ok(slot) => (*slot).clone(),
            Err(_) => {
                tracer.on_cache_conflict(std::any::type_name::<T>(), "plan");
                Plan::<T>::for_type().map(Arc::new)
            }
        }
    }

    /// The invoker stored under `key`, built with `build` on first use.
    ///
    /// The key names the declaring type and the type arguments, which
    /// together fix `F`. If an entry under `key` still holds another type,
    /// the conflict is reported to the tracer and a fresh, uncached invoker
    /// is returned.
    pub fn invoker<F, B>(&self, key: InvokerKey, tracer: &dyn Tracer, build: B) -> F
    where
        F: Clone + Send + Sync + 'static,
        B: Fn() -> F,
    {
        let declaring = key.declaring_name;
        let member = key.member;
        let pinned = self.invokers.pin();
        let mut built = false;
        let entry = pinned.get_or_insert_with(key, || {
            built = true;
            Arc::new(build()) as Arc<dyn Any + Send + Sync>
        });
        self.record(built, tracer, declaring, member);
        match (**entry).downcast_ref::<F>() {
            Some(invoker) => invoker.clone(),
            None => {
                tracer.on_cache_conflict(declaring, member);
                build()
            }
        }
    }

    fn record(&self, built: bool, tracer: &dyn Tracer, declaring: &'static str, member: &'static str) {
        if built {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracer.on_cache_miss(declaring, member);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            plans: self.plans.pin().len(),
            invokers: self.invokers.pin().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
