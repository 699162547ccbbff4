//! Fixture-Flow: type-driven synthesis of fully populated test fixtures.
//!
//! Given a type, the runtime produces a structurally valid value of it
//! without the caller spelling out any field: nested composites,
//! collections and persistent containers are materialized recursively.
//!
//! # Key Features
//!
//! - **Shape dispatch**: every type is classified into a closed set of shapes
//!   (primitive, enum, array, sequence, set, map, their persistent
//!   counterparts, composite) and built by the strategy for that shape
//! - **Greediest constructor**: composites are built through their sample
//!   factory, else the constructor with the most parameters, else their
//!   parameterless path
//! - **Cycle safety**: self-referential and mutually recursive types
//!   terminate through a per-call visited set and a depth ceiling
//! - **Cached plans**: constructor resolution and generic converters are
//!   resolved once per type and shared across threads
//! - **Overrides**: per-type producers replace default synthesis, and
//!   builders replace individual members after synthesis
//!
//! # Example
//!
//! ```ignore
//! use fixture_flow::{field, Fixture, FixtureRuntime};
//! use std::collections::HashSet;
//!
//! #[derive(Debug, Fixture)]
//! struct Article {
//!     id: u32,
//!     title: String,
//!     tags: HashSet<String>,
//! }
//!
//! let runtime = FixtureRuntime::new();
//! let article: Article = runtime.create();
//! assert_ne!(article.id, 0);
//! assert!(article.tags.len() <= 3);
//!
//! let draft = runtime
//!     .build::<Article>()
//!     .with(field!(Article, title), "draft".to_string())
//!     .create();
//! assert_eq!(draft.title, "draft");
//! ```
//!
//! # Observability
//!
//! Implement [`Tracer`] to observe frames, overrides, cut-offs and recovered
//! failures. With the `tracing` feature, `TracingTracer` forwards these to
//! the `tracing` crate.

// Allow the derive macro to reference fixture_flow types when used inside this crate
extern crate self as fixture_flow;

mod builder;
mod cache;
mod config;
pub mod containers;
mod context;
mod descriptor;
mod error;
mod fixture;
mod guard;
mod impls;
mod overrides;
pub mod primitive;
mod resolver;
mod runtime;
pub mod tracer;

pub use builder::{Field, FixtureBuilder};
pub use cache::{CacheStats, InvokerKey};
pub use config::{FixtureConfig, DEFAULT_MAX_DEPTH, DEFAULT_REPEAT_COUNT};
pub use context::GenerationContext;
pub use descriptor::{Shape, TypeDescriptor};
pub use error::{FixtureError, InvocationError};
pub use fixture::{Composite, Enumeration, Fixture};
pub use fixture_flow_macros::Fixture;
pub use guard::VisitedSet;
pub use resolver::{
    Arguments, Constructor, ConstructorKind, ConstructorTable, Members, Parameter, Plan,
};
pub use runtime::{FixtureRuntime, FixtureRuntimeBuilder};
#[cfg(feature = "tracing")]
pub use tracer::TracingTracer;
pub use tracer::{NoopTracer, SpanId, SynthesisOutcome, Tracer, TracerTypeKey};
