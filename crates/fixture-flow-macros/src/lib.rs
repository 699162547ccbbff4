//! Procedural macros for fixture-flow.
//!
//! This crate provides the `Fixture` derive, which makes a struct or enum
//! synthesizable without writing its constructor table by hand.
//!
//! # Example
//!
//! ```ignore
//! use fixture_flow::Fixture;
//!
//! #[derive(Fixture)]
//! pub struct Order {
//!     pub id: u64,
//!     pub lines: Vec<OrderLine>,
//!     #[fixture(skip)]
//!     pub cached_total: Option<u64>,
//! }
//!
//! // Generates:
//! // impl Fixture for Order { ... }
//! // impl Composite for Order {
//! //     fn constructors(table) { table.add(Constructor::new("Order", [id, lines], ...)); }
//! //     fn into_members(self) -> Members { ... }
//! // }
//! ```

mod derive;

use darling::FromDeriveInput as _;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

use crate::derive::{generate_fixture, FixtureInput};

/// Derive `Fixture` for a struct or enum.
///
/// Structs and enums with data become composites. A struct gets one
/// memberwise constructor taking every non-skipped field; an enum gets one
/// constructor per variant. Enums whose variants are all units become
/// enumerations and are built by picking a variant uniformly.
///
/// # Container attributes
///
/// - `immutable`: apply builder overrides by reconstruction instead of assignment
/// - `sample = path`: zero-argument `fn() -> Self` preferred over every other path
/// - `default`: register `Default::default` as the parameterless path
/// - `constructors = path`: `fn(&mut ConstructorTable<Self>)` declaring the
///   constructors; replaces the memberwise constructor
///
/// # Field and variant attributes
///
/// - `skip`: on a field, fill it with `Default::default()` instead of
///   synthesizing it; on a variant, never build it
///
/// # Example
///
/// ```ignore
/// use fixture_flow::Fixture;
///
/// #[derive(Fixture, Default)]
/// #[fixture(immutable, default)]
/// pub struct Money {
///     amount: i64,
///     currency: Currency,
/// }
///
/// #[derive(Fixture)]
/// pub enum Currency {
///     Eur,
///     Usd,
///     #[fixture(skip)]
///     Legacy,
/// }
/// ```
#[proc_macro_derive(Fixture, attributes(fixture))]
pub fn derive_fixture(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let input = match FixtureInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    match generate_fixture(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
