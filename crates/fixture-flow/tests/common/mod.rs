//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fixture_flow::{SpanId, SynthesisOutcome, Tracer, TracerTypeKey};
use parking_lot::Mutex;

/// An event observed by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start { ty: &'static str, depth: usize },
    End { ty: &'static str, outcome: SynthesisOutcome },
    Override { ty: &'static str },
    Customized { ty: &'static str },
    Cycle { path: Vec<&'static str> },
    DepthLimit { ty: &'static str, depth: usize },
    InvocationFailed { ty: &'static str, member: &'static str, message: String },
    ArgumentUnavailable { ty: &'static str, parameter: &'static str },
    ElementFailed { container: &'static str, element: &'static str },
    CacheMiss { declaring: &'static str, member: &'static str },
}

/// A tracer that records every event in order.
#[derive(Default)]
pub struct RecordingTracer {
    next_span: AtomicU64,
    events: Mutex<Vec<Event>>,
}

impl RecordingTracer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl Tracer for RecordingTracer {
    fn new_span_id(&self) -> SpanId {
        SpanId(self.next_span.fetch_add(1, Ordering::Relaxed))
    }

    fn on_create_start(&self, _span_id: SpanId, ty: TracerTypeKey, depth: usize) {
        self.push(Event::Start {
            ty: ty.type_name,
            depth,
        });
    }

    fn on_create_end(&self, _span_id: SpanId, ty: TracerTypeKey, outcome: SynthesisOutcome) {
        self.push(Event::End {
            ty: ty.type_name,
            outcome,
        });
    }

    fn on_override_applied(&self, ty: TracerTypeKey) {
        self.push(Event::Override { ty: ty.type_name });
    }

    fn on_customized(&self, ty: TracerTypeKey) {
        self.push(Event::Customized { ty: ty.type_name });
    }

    fn on_cycle_detected(&self, path: Vec<TracerTypeKey>) {
        self.push(Event::Cycle {
            path: path.into_iter().map(|key| key.type_name).collect(),
        });
    }

    fn on_depth_limit(&self, ty: TracerTypeKey, depth: usize) {
        self.push(Event::DepthLimit {
            ty: ty.type_name,
            depth,
        });
    }

    fn on_invocation_failed(&self, ty: TracerTypeKey, member: &'static str, error: &anyhow::Error) {
        self.push(Event::InvocationFailed {
            ty: ty.type_name,
            member,
            message: error.to_string(),
        });
    }

    fn on_argument_unavailable(&self, ty: TracerTypeKey, parameter: &'static str) {
        self.push(Event::ArgumentUnavailable {
            ty: ty.type_name,
            parameter,
        });
    }

    fn on_element_failed(&self, container: TracerTypeKey, element: &'static str) {
        self.push(Event::ElementFailed {
            container: container.type_name,
            element,
        });
    }

    fn on_cache_miss(&self, declaring: &'static str, member: &'static str) {
        self.push(Event::CacheMiss { declaring, member });
    }
}
