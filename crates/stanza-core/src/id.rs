//! Stanza id generation.
//!
//! Ids are `prefix + counter`. The prefix is a short random alphanumeric
//! string chosen once per generator, which keeps ids from different
//! processes apart without any coordination; the counter keeps ids from the
//! same generator apart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of a default prefix.
pub const DEFAULT_PREFIX_LEN: usize = 5;

/// Source of stanza ids.
///
/// Implementations must be safe to call from many threads at once and must
/// never hand out the same id twice.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Prefix + atomic counter generator.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Generator with a random `DEFAULT_PREFIX_LEN` prefix.
    pub fn new() -> Self {
        Self::with_random_prefix(DEFAULT_PREFIX_LEN)
    }

    /// Generator with a random alphanumeric prefix of `len` chars, then `-`.
    pub fn with_random_prefix(len: usize) -> Self {
        Self::with_prefix(format!("{}-", random_string(len)))
    }

    /// Generator with a fixed prefix (deterministic output).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        // fetch_add is the whole read-increment; no two callers share a value.
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

static GLOBAL: OnceLock<Arc<SequentialIdGenerator>> = OnceLock::new();

/// Process-wide generator shared by envelopes that were not given their own.
pub fn global() -> Arc<dyn IdGenerator> {
    GLOBAL
        .get_or_init(|| Arc::new(SequentialIdGenerator::new()))
        .clone()
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
