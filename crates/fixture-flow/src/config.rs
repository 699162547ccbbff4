//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Default number of elements per container and default `create_many` size.
pub const DEFAULT_REPEAT_COUNT: usize = 3;

/// Default recursion ceiling.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Settings shared by every `create` call of a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Elements per container, and the size of `create_many_default`.
    pub repeat_count: usize,

    /// Hard recursion ceiling. Once a frame's depth exceeds this, descent
    /// stops and the type's fallback is used.
    pub max_depth: usize,

    /// Seed for reproducibility (None = random).
    pub seed: Option<u64>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            repeat_count: DEFAULT_REPEAT_COUNT,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }
}

impl FixtureConfig {
    pub fn with_repeat_count(mut self, count: usize) -> Self {
        self.repeat_count = count;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
