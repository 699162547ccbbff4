//! Caller-registered producers and customizers that replace default
//! synthesis.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::sync::Arc;

use papaya::HashMap;
use parking_lot::RwLock;

use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;

// Producers and customizers running on this thread, with the type each one
// was asked for. Keyed by the producer's allocation, so runtime clones share
// it and independent runtimes do not.
thread_local! {
    static IN_PROGRESS: RefCell<Vec<(usize, TypeId)>> = const { RefCell::new(Vec::new()) };
}

type ProduceFn<T> = dyn Fn(&mut GenerationContext<'_>) -> T + Send + Sync;

type CustomizeFn =
    dyn Fn(&TypeDescriptor, &mut GenerationContext<'_>) -> Option<Box<dyn Any>> + Send + Sync;

struct Producer<T> {
    produce: Box<ProduceFn<T>>,
}

/// Marks a producer as running until dropped, including on unwind.
struct InProgress;

impl InProgress {
    fn enter(owner: usize, id: TypeId) -> Self {
        IN_PROGRESS.with(|stack| stack.borrow_mut().push((owner, id)));
        InProgress
    }

    fn is_active(owner: usize, id: TypeId) -> bool {
        IN_PROGRESS.with(|stack| stack.borrow().contains(&(owner, id)))
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        IN_PROGRESS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn identity<T: ?Sized>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

/// A type-predicate hook consulted for every requested type.
pub(crate) struct Customizer {
    customize: Box<CustomizeFn>,
}

impl Customizer {
    /// Ask this customizer for a `T`.
    ///
    /// Returns `None` when it declines, and also while this customizer is
    /// already answering a request for `T` on this thread.
    pub fn apply<T: 'static>(
        self: &Arc<Self>,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext<'_>,
    ) -> Option<Box<dyn Any>> {
        let owner = identity(self);
        let id = TypeId::of::<T>();
        if InProgress::is_active(owner, id) {
            return None;
        }
        let _guard = InProgress::enter(owner, id);
        (self.customize)(descriptor, ctx)
    }
}

/// Per-runtime registry of override producers, one per type, and of
/// customizers, newest first.
pub(crate) struct OverrideRegistry {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>, ahash::RandomState>,
    customizers: RwLock<Vec<Arc<Customizer>>>,
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(ahash::RandomState::new()),
            customizers: RwLock::new(Vec::new()),
        }
    }

    /// Install or replace the producer for `T`.
    pub fn register<T, F>(&self, produce: F)
    where
        T: 'static,
        F: Fn(&mut GenerationContext<'_>) -> T + Send + Sync + 'static,
    {
        let producer = Producer::<T> {
            produce: Box::new(produce),
        };
        let pinned = self.entries.pin();
        pinned.insert(TypeId::of::<T>(), Arc::new(producer) as Arc<dyn Any + Send + Sync>);
    }

    pub fn unregister<T: 'static>(&self) -> bool {
        let pinned = self.entries.pin();
        pinned.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        let pinned = self.entries.pin();
        pinned.contains_key(&TypeId::of::<T>())
    }

    /// Run the producer for `T`, if one is registered.
    ///
    /// Returns `None` while this producer is already running on this
    /// thread, so a producer that asks for its own type gets the default
    /// strategy instead of itself.
    pub fn produce<T: 'static>(&self, ctx: &mut GenerationContext<'_>) -> Option<T> {
        let id = TypeId::of::<T>();
        let producer = {
            let pinned = self.entries.pin();
            pinned
                .get(&id)
                .and_then(|entry| entry.clone().downcast::<Producer<T>>().ok())?
        };
        let owner = identity(&producer);
        if InProgress::is_active(owner, id) {
            return None;
        }
        let _guard = InProgress::enter(owner, id);
        Some((producer.produce)(ctx))
    }

    /// Install a customizer ahead of every earlier one.
    pub fn customize<F>(&self, customize: F)
    where
        F: Fn(&TypeDescriptor, &mut GenerationContext<'_>) -> Option<Box<dyn Any>>
            + Send
            + Sync
            + 'static,
    {
        let customizer = Arc::new(Customizer {
            customize: Box::new(customize),
        });
        self.customizers.write().insert(0, customizer);
    }

    /// Snapshot of the customizers, newest first.
    ///
    /// Taken so a customizer can install another one without deadlocking.
    pub fn customizers(&self) -> Vec<Arc<Customizer>> {
        self.customizers.read().clone()
    }

    pub fn clear_customizers(&self) -> usize {
        std::mem::take(&mut *self.customizers.write()).len()
    }
}
