//! Tests for composite construction: constructor selection, degradation,
//! cycles and the depth ceiling.

mod common;

use anyhow::anyhow;
use common::{Event, RecordingTracer};
use fixture_flow::{
    Composite, Constructor, ConstructorTable, Fixture, FixtureError, FixtureRuntime,
    GenerationContext, Parameter, SynthesisOutcome, TypeDescriptor,
};

/// Hand-written `Fixture` impl body shared by the types below.
macro_rules! composite_fixture {
    ($ty:ty) => {
        impl Fixture for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::composite::<Self>()
            }

            fn synthesize(ctx: &mut GenerationContext<'_>) -> Result<Self, FixtureError> {
                ctx.compose::<Self>()
            }

            fn fallback(ctx: &mut GenerationContext<'_>) -> Option<Self> {
                ctx.compose_fallback::<Self>()
            }
        }
    };
}

// ============================================================================
// Derived composites
// ============================================================================

#[derive(Debug, Fixture)]
struct Member {
    id: i64,
    name: String,
    tags: std::collections::HashSet<String>,
}

#[test]
fn test_members_populated() {
    let runtime = FixtureRuntime::builder().repeat_count(3).build();
    for member in runtime.create_many::<Member>(20) {
        assert_ne!(member.id, 0);
        assert!(member.id > 0);
        assert!(!member.name.trim().is_empty());
        assert!(!member.tags.is_empty());
        assert!(member.tags.len() <= 3);
        assert!(member.tags.iter().all(|tag| !tag.is_empty()));
    }
}

// ============================================================================
// Constructor selection
// ============================================================================

#[derive(Debug)]
struct Priced {
    amount: u32,
    currency: String,
    via: &'static str,
}

composite_fixture!(Priced);

impl Composite for Priced {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table
            .add(Constructor::parameterless("empty", || Priced {
                amount: 0,
                currency: String::new(),
                via: "empty",
            }))
            .add(Constructor::new(
                "amount_only",
                vec![Parameter::of::<u32>("amount")],
                |args| {
                    Ok(Priced {
                        amount: args.take::<u32>()?,
                        currency: "EUR".to_string(),
                        via: "amount_only",
                    })
                },
            ))
            .add(Constructor::factory(
                "of",
                vec![
                    Parameter::of::<u32>("amount"),
                    Parameter::of::<String>("currency"),
                ],
                |args| {
                    Ok(Priced {
                        amount: args.take::<u32>()?,
                        currency: args.take::<String>()?,
                        via: "of",
                    })
                },
            ));
    }
}

#[test]
fn test_greediest_constructor_wins() {
    let runtime = FixtureRuntime::new();
    let priced: Priced = runtime.create();
    assert_eq!(priced.via, "of");
    assert_ne!(priced.amount, 0);
    assert!(!priced.currency.is_empty());
}

#[derive(Debug)]
struct Tied(&'static str);

composite_fixture!(Tied);

impl Composite for Tied {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table
            .add(Constructor::new(
                "first",
                vec![Parameter::of::<u8>("a"), Parameter::of::<u8>("b")],
                |_| Ok(Tied("first")),
            ))
            .add(Constructor::new(
                "second",
                vec![Parameter::of::<u8>("a"), Parameter::of::<u8>("b")],
                |_| Ok(Tied("second")),
            ));
    }
}

#[test]
fn test_tie_goes_to_earliest_declaration() {
    let runtime = FixtureRuntime::new();
    for _ in 0..10 {
        assert_eq!(runtime.create::<Tied>().0, "first");
    }
}

#[derive(Debug)]
struct Sampled(&'static str);

composite_fixture!(Sampled);

impl Composite for Sampled {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table
            .add(Constructor::new(
                "wide",
                vec![Parameter::of::<u8>("a"), Parameter::of::<u8>("b")],
                |_| Ok(Sampled("wide")),
            ))
            .add(Constructor::sample("sample", || Sampled("sample")));
    }
}

#[test]
fn test_sample_factory_preferred() {
    let runtime = FixtureRuntime::new();
    assert_eq!(runtime.create::<Sampled>().0, "sample");
}

// ============================================================================
// Unconstructable and failing types
// ============================================================================

#[derive(Debug)]
struct Opaque;

composite_fixture!(Opaque);

impl Composite for Opaque {
    fn constructors(_table: &mut ConstructorTable<Self>) {}
}

#[test]
fn test_no_constructor_is_unconstructable() {
    let runtime = FixtureRuntime::new();
    let err = runtime.try_create::<Opaque>().unwrap_err();
    assert!(err.is_unconstructable());
    assert_eq!(err.type_name(), std::any::type_name::<Opaque>());
}

#[test]
#[should_panic(expected = "no usable constructor")]
fn test_create_panics_on_unconstructable() {
    FixtureRuntime::new().create::<Opaque>();
}

#[derive(Debug)]
struct Fragile {
    degraded: bool,
}

composite_fixture!(Fragile);

impl Composite for Fragile {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table
            .add(Constructor::new(
                "checked",
                vec![Parameter::of::<u32>("limit")],
                |_| Err(anyhow!("limit rejected")),
            ))
            .add(Constructor::parameterless("fallback", || Fragile {
                degraded: true,
            }));
    }
}

#[test]
fn test_failed_constructor_degrades() {
    let tracer = RecordingTracer::new();
    let runtime = FixtureRuntime::builder().tracer(tracer.clone()).build();

    let value: Fragile = runtime.create();
    assert!(value.degraded);

    let failures = tracer.count(|e| {
        matches!(
            e,
            Event::InvocationFailed { member: "checked", message, .. } if message == "limit rejected"
        )
    });
    assert_eq!(failures, 1);
}

#[derive(Debug)]
struct Broken;

composite_fixture!(Broken);

impl Composite for Broken {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table.add(Constructor::new(
            "new",
            vec![Parameter::of::<String>("name")],
            |_| Err(anyhow!("name rejected")),
        ));
    }
}

#[test]
fn test_failed_constructor_without_degrade_surfaces() {
    let runtime = FixtureRuntime::new();
    let err = runtime.try_create::<Broken>().unwrap_err();
    match &err {
        FixtureError::Invocation { member, .. } => assert_eq!(*member, "new"),
        other => panic!("unexpected error: {other}"),
    }
    let source = err.invocation_error().expect("invocation source");
    assert_eq!(source.to_string(), "name rejected");
}

#[derive(Debug)]
struct NeedsBroken {
    note: Option<Broken>,
}

composite_fixture!(NeedsBroken);

impl Composite for NeedsBroken {
    fn constructors(table: &mut ConstructorTable<Self>) {
        table.add(Constructor::new(
            "new",
            vec![Parameter::of::<Option<Broken>>("note")],
            |args| {
                Ok(NeedsBroken {
                    note: args.take::<Option<Broken>>()?,
                })
            },
        ));
    }
}

#[test]
fn test_failed_member_degrades_through_option() {
    let runtime = FixtureRuntime::new();
    let value: NeedsBroken = runtime.create();
    assert!(value.note.is_none());
}

// ============================================================================
// Cycles
// ============================================================================

#[derive(Debug, Fixture)]
struct Node {
    value: u32,
    next: Option<Box<Node>>,
}

#[test]
fn test_self_reference_terminates() {
    let tracer = RecordingTracer::new();
    let runtime = FixtureRuntime::builder().tracer(tracer.clone()).build();

    let node: Node = runtime.create();
    assert_ne!(node.value, 0);
    assert!(node.next.is_none());

    let cycles: Vec<Vec<&'static str>> = tracer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Cycle { path } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].first(), Some(&std::any::type_name::<Node>()));
    assert_eq!(cycles[0].last(), Some(&std::any::type_name::<Node>()));
}

#[derive(Debug, Fixture)]
struct Author {
    name: String,
    latest: Option<Box<Book>>,
}

#[derive(Debug, Fixture)]
struct Book {
    title: String,
    author: Option<Box<Author>>,
}

#[test]
fn test_mutual_recursion_terminates() {
    let runtime = FixtureRuntime::new();
    let author: Author = runtime.create();
    let book = author.latest.expect("book is built");
    assert!(!book.title.is_empty());
    assert!(book.author.is_none());
}

#[derive(Debug, Fixture)]
struct Category {
    name: String,
    children: Vec<Category>,
}

#[test]
fn test_recursive_collection_is_empty() {
    let runtime = FixtureRuntime::new();
    let category: Category = runtime.create();
    assert!(!category.name.is_empty());
    assert!(category.children.is_empty());
}

#[test]
fn test_siblings_are_not_cycles() {
    #[derive(Debug, Fixture)]
    struct Pair {
        left: Leaf,
        right: Leaf,
    }

    #[derive(Debug, Fixture)]
    struct Leaf {
        id: u64,
    }

    let tracer = RecordingTracer::new();
    let runtime = FixtureRuntime::builder().tracer(tracer.clone()).build();
    let pair: Pair = runtime.create();
    assert_ne!(pair.left.id, 0);
    assert_ne!(pair.right.id, 0);
    assert_eq!(tracer.count(|e| matches!(e, Event::Cycle { .. })), 0);
}

// ============================================================================
// Depth ceiling
// ============================================================================

#[derive(Debug, Fixture)]
struct Outer {
    inner: Inner,
}

#[derive(Debug, Fixture)]
struct Inner {
    core: Core,
}

#[derive(Debug, Fixture)]
#[fixture(default)]
struct Core {
    code: u16,
}

impl Default for Core {
    fn default() -> Self {
        Core { code: 404 }
    }
}

#[derive(Debug, Fixture)]
struct Rigid {
    code: u16,
}

#[derive(Debug, Fixture)]
struct RigidInner {
    rigid: Rigid,
}

#[derive(Debug, Fixture)]
struct RigidOuter {
    inner: RigidInner,
}

#[test]
fn test_depth_limit_uses_fallback() {
    let tracer = RecordingTracer::new();
    let runtime = FixtureRuntime::builder()
        .max_depth(1)
        .tracer(tracer.clone())
        .build();

    let outer: Outer = runtime.create();
    assert_eq!(outer.inner.core.code, 404);

    let limits = tracer.count(|e| {
        matches!(e, Event::DepthLimit { ty, depth: 2 } if *ty == std::any::type_name::<Core>())
    });
    assert_eq!(limits, 1);
    assert!(tracer.events().contains(&Event::End {
        ty: std::any::type_name::<Core>(),
        outcome: SynthesisOutcome::Fallback,
    }));
}

#[test]
fn test_depth_limit_without_fallback_fails() {
    let runtime = FixtureRuntime::builder().max_depth(1).build();
    let err = runtime.try_create::<RigidOuter>().unwrap_err();
    assert!(
        matches!(err, FixtureError::RecursionLimit { depth: 2, type_name } if type_name == std::any::type_name::<Rigid>()),
        "{err}"
    );
}

#[test]
fn test_default_depth_reaches_nested_members() {
    let runtime = FixtureRuntime::new();
    let outer: RigidOuter = runtime.create();
    assert_ne!(outer.inner.rigid.code, 0);
}

// ============================================================================
// Tuples and wrappers
// ============================================================================

#[test]
fn test_tuples_and_boxes() {
    let runtime = FixtureRuntime::new();
    let (id, name, flag): (u32, String, bool) = runtime.create();
    assert_ne!(id, 0);
    assert!(!name.is_empty());
    let _ = flag;

    let boxed: Box<String> = runtime.create();
    assert!(!boxed.is_empty());

    let shared: std::sync::Arc<u8> = runtime.create();
    assert_ne!(*shared, 0);

    let maybe: Option<u64> = runtime.create();
    assert!(maybe.is_some());
}
