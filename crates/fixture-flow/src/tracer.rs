//! Tracer trait for observing fixture synthesis.
//!
//! This module defines the [`Tracer`] trait and related types for observing
//! how the generator walks a type graph. The default [`NoopTracer`] costs
//! nothing when tracing is not needed. With the `tracing` cargo feature,
//! [`TracingTracer`] forwards every event to the `tracing` crate.
//!
//! # Example
//!
//! ```ignore
//! use fixture_flow::{FixtureRuntime, SpanId, Tracer, TracerTypeKey};
//! use std::sync::Arc;
//!
//! struct CycleLogger;
//!
//! impl Tracer for CycleLogger {
//!     fn new_span_id(&self) -> SpanId {
//!         SpanId(1)
//!     }
//!
//!     fn on_cycle_detected(&self, path: Vec<TracerTypeKey>) {
//!         eprintln!("cycle: {path:?}");
//!     }
//! }
//!
//! let runtime = FixtureRuntime::builder().tracer(Arc::new(CycleLogger)).build();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::descriptor::{Shape, TypeDescriptor};

/// Unique identifier for one `create` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(pub u64);

/// A synthesized type as seen by a tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TracerTypeKey {
    /// The type name (e.g., "alloc::vec::Vec<u32>")
    pub type_name: &'static str,
    /// The shape the type was classified as.
    pub shape: Shape,
}

impl TracerTypeKey {
    /// Create a new tracer type key.
    #[inline]
    pub fn new(type_name: &'static str, shape: Shape) -> Self {
        Self { type_name, shape }
    }
}

impl From<&TypeDescriptor> for TracerTypeKey {
    fn from(descriptor: &TypeDescriptor) -> Self {
        Self::new(descriptor.name(), descriptor.shape())
    }
}

/// How a `create` frame produced its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// The default strategy for the type's shape produced the value.
    Generated,
    /// A registered override produced the value.
    Overridden,
    /// A customizer produced the value.
    Customized,
    /// Descent was cut off and the type's recursion-safe fallback was used.
    Fallback,
    /// The frame failed; the parent frame decides how to recover.
    Failed { message: String },
}

/// Tracer trait for observing fixture synthesis.
///
/// All methods except [`Tracer::new_span_id`] have default empty
/// implementations, so you only override the events you care about.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a runtime shared across threads
/// calls its tracer from all of them.
pub trait Tracer: Send + Sync + 'static {
    /// Generate a new unique span ID.
    ///
    /// This is the only required method. Called at the start of every
    /// `create` frame, including nested ones.
    fn new_span_id(&self) -> SpanId;

    /// Called when a frame starts synthesizing a value.
    #[inline]
    fn on_create_start(&self, _span_id: SpanId, _ty: TracerTypeKey, _depth: usize) {}

    /// Called when a frame finishes.
    #[inline]
    fn on_create_end(&self, _span_id: SpanId, _ty: TracerTypeKey, _outcome: SynthesisOutcome) {}

    /// Called when a registered override replaced default synthesis.
    #[inline]
    fn on_override_applied(&self, _ty: TracerTypeKey) {}

    /// Called when a customizer answered for the type.
    #[inline]
    fn on_customized(&self, _ty: TracerTypeKey) {}

    /// Called when a composite is requested while an ancestor frame is still
    /// constructing it.
    ///
    /// `path` lists the composites under construction, outermost first,
    /// followed by the revisited type.
    #[inline]
    fn on_cycle_detected(&self, _path: Vec<TracerTypeKey>) {}

    /// Called when descent stops because the depth ceiling was exceeded.
    #[inline]
    fn on_depth_limit(&self, _ty: TracerTypeKey, _depth: usize) {}

    /// Called when a constructor or factory returned an error.
    #[inline]
    fn on_invocation_failed(
        &self,
        _ty: TracerTypeKey,
        _member: &'static str,
        _error: &anyhow::Error,
    ) {
    }

    /// Called when neither synthesis nor the fallback could supply an argument.
    #[inline]
    fn on_argument_unavailable(&self, _ty: TracerTypeKey, _parameter: &'static str) {}

    /// Called when a container element could not be synthesized and was
    /// dropped from the container.
    #[inline]
    fn on_element_failed(&self, _container: TracerTypeKey, _element: &'static str) {}

    /// Called when a plan or invoker is built for the first time.
    #[inline]
    fn on_cache_miss(&self, _declaring: &'static str, _member: &'static str) {}

    /// Called when a cache entry holds a value of another type than the
    /// caller expects. The caller gets a freshly built, uncached value.
    #[inline]
    fn on_cache_conflict(&self, _declaring: &'static str, _member: &'static str) {}
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`FixtureRuntime`](crate::FixtureRuntime).
pub struct NoopTracer;

/// Global span counter for NoopTracer.
static NOOP_SPAN_COUNTER: AtomicU64 = AtomicU64::new(1);

impl Tracer for NoopTracer {
    #[inline(always)]
    fn new_span_id(&self) -> SpanId {
        SpanId(NOOP_SPAN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Tracer that forwards events to the [`tracing`] crate.
///
/// Frame boundaries are emitted at `TRACE`, cut-offs and overrides at
/// `DEBUG`, and recovered failures at `WARN`.
#[cfg(feature = "tracing")]
#[derive(Default)]
pub struct TracingTracer {
    spans: AtomicU64,
}

#[cfg(feature = "tracing")]
impl TracingTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "tracing")]
impl Tracer for TracingTracer {
    fn new_span_id(&self) -> SpanId {
        SpanId(self.spans.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn on_create_start(&self, span_id: SpanId, ty: TracerTypeKey, depth: usize) {
        tracing::trace!(span = span_id.0, ty = ty.type_name, shape = ?ty.shape, depth, "create start");
    }

    fn on_create_end(&self, span_id: SpanId, ty: TracerTypeKey, outcome: SynthesisOutcome) {
        tracing::trace!(span = span_id.0, ty = ty.type_name, ?outcome, "create end");
    }

    fn on_override_applied(&self, ty: TracerTypeKey) {
        tracing::debug!(ty = ty.type_name, "override applied");
    }

    fn on_customized(&self, ty: TracerTypeKey) {
        tracing::debug!(ty = ty.type_name, "customizer applied");
    }

    fn on_cycle_detected(&self, path: Vec<TracerTypeKey>) {
        let path: Vec<&str> = path.iter().map(|key| key.type_name).collect();
        tracing::debug!(?path, "cycle detected, using fallback");
    }

    fn on_depth_limit(&self, ty: TracerTypeKey, depth: usize) {
        tracing::debug!(ty = ty.type_name, depth, "depth limit reached, using fallback");
    }

    fn on_invocation_failed(&self, ty: TracerTypeKey, member: &'static str, error: &anyhow::Error) {
        tracing::warn!(ty = ty.type_name, member, %error, "constructor failed");
    }

    fn on_argument_unavailable(&self, ty: TracerTypeKey, parameter: &'static str) {
        tracing::warn!(ty = ty.type_name, parameter, "argument unavailable");
    }

    fn on_element_failed(&self, container: TracerTypeKey, element: &'static str) {
        tracing::warn!(container = container.type_name, element, "container element dropped");
    }

    fn on_cache_miss(&self, declaring: &'static str, member: &'static str) {
        tracing::trace!(declaring, member, "invoker cache miss");
    }

    fn on_cache_conflict(&self, declaring: &'static str, member: &'static str) {
        tracing::warn!(declaring, member, "cache entry holds another type");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingTracer {
        start_count: AtomicUsize,
        end_count: AtomicUsize,
    }

    impl CountingTracer {
        fn new() -> Self {
            Self {
                start_count: AtomicUsize::new(0),
                end_count: AtomicUsize::new(0),
            }
        }
    }

    impl Tracer for CountingTracer {
        fn new_span_id(&self) -> SpanId {
            SpanId(1)
        }

        fn on_create_start(&self, _span_id: SpanId, _ty: TracerTypeKey, _depth: usize) {
            self.start_count.fetch_add(1, Ordering::Relaxed);
        }

        fn on_create_end(&self, _span_id: SpanId, _ty: TracerTypeKey, _outcome: SynthesisOutcome) {
            self.end_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_noop_tracer_span_id() {
        let tracer = NoopTracer;
        let id1 = tracer.new_span_id();
        let id2 = tracer.new_span_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_counting_tracer() {
        let tracer = CountingTracer::new();
        let key = TracerTypeKey::new("u32", Shape::Primitive);

        tracer.on_create_start(SpanId(1), key, 0);
        tracer.on_create_start(SpanId(2), key, 1);
        tracer.on_create_end(SpanId(1), key, SynthesisOutcome::Generated);

        assert_eq!(tracer.start_count.load(Ordering::Relaxed), 2);
        assert_eq!(tracer.end_count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_type_key_from_descriptor() {
        let descriptor = TypeDescriptor::composite::<String>();
        let key = TracerTypeKey::from(&descriptor);
        assert_eq!(key.shape, Shape::Composite);
        assert_eq!(key.type_name, std::any::type_name::<String>());
    }

    #[test]
    fn test_tracer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopTracer>();
        assert_send_sync::<Arc<CountingTracer>>();
    }
}
