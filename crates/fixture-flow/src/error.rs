//! Error types for fixture synthesis.

use std::sync::Arc;

/// Errors produced while synthesizing a fixture.
///
/// Most failures are recovered close to where they happen: a failed argument
/// is replaced by its type's fallback, a failed constructor degrades to the
/// type's default path, and a failed container element is substituted or
/// skipped. What reaches the caller of
/// [`FixtureRuntime::try_create`](crate::FixtureRuntime::try_create) is the
/// first failure of a frame that had nothing left to fall back to.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FixtureError {
    /// No usable constructor, factory, or parameterless path exists.
    ///
    /// Also reported for enums without variants, which have no value at all.
    #[error("no usable constructor, factory or parameterless path for `{type_name}`")]
    Unconstructable {
        /// Name of the type that could not be constructed.
        type_name: &'static str,
    },

    /// The chosen constructor or factory failed and no default path was left.
    #[error("`{type_name}::{member}` failed: {cause}")]
    Invocation {
        /// Name of the type being constructed.
        type_name: &'static str,
        /// Name of the constructor or factory that failed.
        member: &'static str,
        /// The error returned by the constructor.
        cause: Arc<anyhow::Error>,
    },

    /// Descent stopped (cycle or depth ceiling) and the type has no
    /// recursion-safe fallback value.
    ///
    /// Parent frames recover from this through their own fallbacks; it
    /// reaches the caller only when no ancestor has one.
    #[error("recursion stopped at `{type_name}` (depth {depth}) and no fallback value exists")]
    RecursionLimit {
        /// Name of the type whose synthesis was cut off.
        type_name: &'static str,
        /// Depth at which descent stopped.
        depth: usize,
    },
}

impl FixtureError {
    /// Returns `true` if this error means the type can never be constructed.
    pub fn is_unconstructable(&self) -> bool {
        matches!(self, FixtureError::Unconstructable { .. })
    }

    /// Returns the invocation error of a failed constructor, if any.
    pub fn invocation_error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            FixtureError::Invocation { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Name of the type the error is about.
    pub fn type_name(&self) -> &'static str {
        match self {
            FixtureError::Unconstructable { type_name }
            | FixtureError::Invocation { type_name, .. }
            | FixtureError::RecursionLimit { type_name, .. } => type_name,
        }
    }
}

/// Errors raised while reading constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// The constructor asked for more arguments than it declared.
    #[error("argument {index} requested but only {declared} declared")]
    MissingArgument {
        /// Zero-based position of the requested argument.
        index: usize,
        /// Number of declared parameters.
        declared: usize,
    },

    /// The argument at `index` does not have the requested type.
    #[error("argument {index} is not a `{expected}`")]
    TypeMismatch {
        /// Zero-based position of the argument.
        index: usize,
        /// Name of the type the constructor asked for.
        expected: &'static str,
    },
}
