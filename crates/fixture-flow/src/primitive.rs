//! Leaf value generation.
//!
//! Every generated leaf satisfies the basic testability constraints: strings
//! are never blank, integers are never zero or the type's minimum, floats are
//! finite and positive, identifiers are fresh and timestamps are recent.

use std::ops::Range;

use chrono::{DateTime, TimeDelta, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::error::FixtureError;
use crate::fixture::Enumeration;

/// Range of generated string lengths, inclusive.
pub const STRING_LENGTH: (usize, usize) = (3, 10);

/// Range of generated floating-point values.
pub const FLOAT_RANGE: Range<f64> = 0.01..1000.0;

/// How far back generated timestamps may lie, in seconds.
pub const TIMESTAMP_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// Range of generated `std::time::Duration`s, in whole seconds.
pub const DURATION_SECS: (u64, u64) = (1, 86_400);

/// Integer sanitization: the type's minimum becomes 1, then the absolute
/// value is taken, then 0 becomes 1.
pub trait Sanitize: Copy {
    fn sanitize(self) -> Self;
}

macro_rules! sanitize_signed {
    ($($ty:ty),* $(,)?) => {$(
        impl Sanitize for $ty {
            #[inline]
            fn sanitize(self) -> Self {
                let value = if self == <$ty>::MIN { 1 } else { self.abs() };
                if value == 0 { 1 } else { value }
            }
        }
    )*};
}

macro_rules! sanitize_unsigned {
    ($($ty:ty),* $(,)?) => {$(
        impl Sanitize for $ty {
            #[inline]
            fn sanitize(self) -> Self {
                if self == 0 { 1 } else { self }
            }
        }
    )*};
}

sanitize_signed!(i8, i16, i32, i64, i128, isize);
sanitize_unsigned!(u8, u16, u32, u64, u128, usize);

/// A uniformly drawn, sanitized integer.
pub fn integer<T, R>(rng: &mut R) -> T
where
    T: Sanitize,
    rand::distributions::Standard: rand::distributions::Distribution<T>,
    R: Rng,
{
    rng.gen::<T>().sanitize()
}

pub fn float64<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(FLOAT_RANGE)
}

pub fn float32<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(FLOAT_RANGE.start as f32..FLOAT_RANGE.end as f32)
}

pub fn boolean<R: Rng>(rng: &mut R) -> bool {
    rng.gen_bool(0.5)
}

pub fn character<R: Rng>(rng: &mut R) -> char {
    char::from(rng.sample(Alphanumeric))
}

/// Lowercase ASCII word of 3 to 10 letters.
pub fn string<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(STRING_LENGTH.0..=STRING_LENGTH.1);
    let raw = (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    sanitize_string(raw, rng)
}

/// Replaces a blank string with `"s"` followed by six hex digits of a fresh
/// identifier.
pub fn sanitize_string<R: Rng>(value: String, rng: &mut R) -> String {
    if !value.trim().is_empty() {
        return value;
    }
    let id = identifier(rng).simple().to_string();
    format!("s{}", &id[..6])
}

/// Random (version 4 layout) identifier drawn from `rng`.
pub fn identifier<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// A timestamp within the window before `now`.
pub fn timestamp<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> DateTime<Utc> {
    let back = rng.gen_range(0..TIMESTAMP_WINDOW_SECS);
    now - TimeDelta::seconds(back)
}

pub fn duration<R: Rng>(rng: &mut R) -> std::time::Duration {
    std::time::Duration::from_secs(rng.gen_range(DURATION_SECS.0..=DURATION_SECS.1))
}

/// Uniformly chosen variant of a field-less enum.
pub fn variant<T: Enumeration, R: Rng>(rng: &mut R) -> Result<T, FixtureError> {
    let unconstructable = || FixtureError::Unconstructable {
        type_name: std::any::type_name::<T>(),
    };
    if T::VARIANT_COUNT == 0 {
        return Err(unconstructable());
    }
    T::variant(rng.gen_range(0..T::VARIANT_COUNT)).ok_or_else(unconstructable)
}
