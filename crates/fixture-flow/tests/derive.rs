//! Tests for `#[derive(Fixture)]`.

use std::collections::HashSet;

use fixture_flow::{
    Composite, Constructor, ConstructorKind, ConstructorTable, Enumeration, Fixture,
    FixtureRuntime, Parameter, Plan, Shape,
};

// ============================================================================
// Structs
// ============================================================================

#[derive(Debug, Fixture)]
struct Profile {
    handle: String,
    #[fixture(skip)]
    cached_score: Option<u32>,
    r#type: u8,
}

#[test]
fn test_skipped_field_uses_default() {
    let runtime = FixtureRuntime::new();
    let profile: Profile = runtime.create();
    assert!(!profile.handle.is_empty());
    assert_eq!(profile.cached_score, None);
    assert_ne!(profile.r#type, 0);

    let plan = Plan::<Profile>::for_type().unwrap();
    let names: Vec<_> = plan.primary().params().iter().map(|p| p.name()).collect();
    assert_eq!(names, ["handle", "type"]);
    assert_eq!(plan.primary().name(), "Profile");
}

#[derive(Debug, Fixture)]
struct Envelope<T> {
    payload: T,
    attempts: Vec<T>,
}

#[test]
fn test_generic_struct() {
    let runtime = FixtureRuntime::new();
    let envelope: Envelope<String> = runtime.create();
    assert!(!envelope.payload.is_empty());
    assert_eq!(envelope.attempts.len(), 3);

    let nested: Envelope<Envelope<u8>> = runtime.create();
    assert_eq!(nested.payload.attempts.len(), 3);
}

#[derive(Debug, Fixture)]
struct Tree<T> {
    value: T,
    children: Vec<Tree<T>>,
}

#[test]
fn test_generic_self_referential_struct() {
    let runtime = FixtureRuntime::new();
    let tree: Tree<u32> = runtime.create();
    assert_ne!(tree.value, 0);
    assert!(tree.children.is_empty());

    let forest: Vec<Tree<String>> = runtime.create();
    assert_eq!(forest.len(), 3);
    assert!(forest.iter().all(|t| !t.value.is_empty() && t.children.is_empty()));
}

#[derive(Debug, Fixture)]
struct Marker;

#[test]
fn test_unit_struct() {
    let runtime = FixtureRuntime::new();
    let _: Marker = runtime.create();
    // A field-less struct has a zero-argument path, so it is recursion safe.
    assert!(runtime.with_context(Marker::fallback).is_some());
}

#[derive(Debug, Default, Fixture)]
#[fixture(sample = Settings::sample, default)]
struct Settings {
    retries: u8,
    verbose: bool,
}

impl Settings {
    fn sample() -> Self {
        Settings {
            retries: 3,
            verbose: true,
        }
    }
}

#[test]
fn test_sample_and_default_paths() {
    let runtime = FixtureRuntime::new();
    let settings: Settings = runtime.create();
    assert_eq!(settings.retries, 3);
    assert!(settings.verbose);

    let plan = Plan::<Settings>::for_type().unwrap();
    assert_eq!(plan.primary().kind(), ConstructorKind::SampleFactory);
    assert_eq!(plan.greediest().map(|c| c.name()), Some("Settings"));
    let kinds: Vec<_> = plan.constructors().iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        [
            ConstructorKind::SampleFactory,
            ConstructorKind::Constructor,
            ConstructorKind::Parameterless,
        ]
    );
}

#[derive(Debug, Fixture)]
#[fixture(constructors = Temperature::declare)]
struct Temperature {
    kelvin: f64,
}

impl Temperature {
    fn declare(table: &mut ConstructorTable<Self>) {
        table.add(Constructor::factory(
            "from_celsius",
            vec![Parameter::of::<u8>("celsius")],
            |args| {
                Ok(Temperature {
                    kelvin: f64::from(args.take::<u8>()?) + 273.15,
                })
            },
        ));
    }
}

#[test]
fn test_custom_constructors_replace_memberwise() {
    let runtime = FixtureRuntime::new();
    let temperature: Temperature = runtime.create();
    assert!(temperature.kelvin > 273.15);

    let mut table = ConstructorTable::new();
    Temperature::constructors(&mut table);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_struct_members() {
    let profile = Profile {
        handle: "ada".to_string(),
        cached_score: Some(1),
        r#type: 2,
    };
    let mut members = profile.into_members();
    assert_eq!(members.names().collect::<Vec<_>>(), ["handle", "type"]);
    let handle = members.take("HANDLE").and_then(|v| v.downcast::<String>().ok());
    assert_eq!(handle.as_deref().map(String::as_str), Some("ada"));
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Fixture)]
enum Channel {
    Email,
    Sms,
    #[fixture(skip)]
    Pager,
}

#[test]
fn test_enumeration_skips_variants() {
    assert_eq!(Channel::VARIANT_COUNT, 2);
    assert_eq!(Channel::variant(0), Some(Channel::Email));
    assert_eq!(Channel::variant(1), Some(Channel::Sms));
    assert_eq!(Channel::variant(2), None);

    let runtime = FixtureRuntime::new();
    let drawn: HashSet<Channel> = runtime.create_many(50).into_iter().collect();
    assert!(!drawn.contains(&Channel::Pager));
    assert_eq!(Channel::descriptor().shape(), Shape::Enum);
}

#[derive(Debug, PartialEq, Fixture)]
enum Payment {
    Cash,
    Card { number: String, cvv: u16 },
    Transfer(String),
}

#[test]
fn test_data_enum_uses_richest_variant() {
    let runtime = FixtureRuntime::new();
    match runtime.create::<Payment>() {
        Payment::Card { number, cvv } => {
            assert!(!number.is_empty());
            assert_ne!(cvv, 0);
        }
        other => panic!("unexpected variant {other:?}"),
    }
    assert_eq!(Payment::descriptor().shape(), Shape::Composite);

    let plan = Plan::<Payment>::for_type().unwrap();
    let names: Vec<_> = plan.constructors().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["Cash", "Card", "Transfer"]);
    assert_eq!(plan.recursion_safe().map(|c| c.name()), Some("Cash"));
}

#[test]
fn test_data_enum_members() {
    let members = Payment::Transfer("iban".to_string()).into_members();
    assert_eq!(members.names().collect::<Vec<_>>(), ["_0"]);
    assert!(Payment::Cash.into_members().is_empty());
}
