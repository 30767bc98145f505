//! Identity for tail stream sessions.
//!
//! Every event in a single tail stream shares one [`TailId`]. The id is an
//! opaque correlation key: downstream aggregators only compare, clone, and
//! print it. Uniqueness requirements differ wildly between local development
//! and production fleets, so id *generation* sits behind the [`IdFactory`]
//! trait and hosts inject whichever policy fits (random UUIDs locally,
//! request-scoped correlation ids in production).

use core::fmt;
use serde::{Deserialize, Serialize};

/// An opaque identifier for a tail stream session.
///
/// Treat the contents as an opaque string: the only supported operations are
/// comparison, cloning, hashing, and display. `TailId::from_string(x)`
/// round-trips (`to_string()` returns `x` unchanged).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TailId(String);

impl TailId {
    /// Wraps an arbitrary string as a tail id.
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TailId({})", self.0)
    }
}

impl From<&str> for TailId {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl From<String> for TailId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Source of fresh tail ids.
///
/// Collisions are tolerated statistically; implementations should make them
/// astronomically unlikely at the scale they are deployed to.
pub trait IdFactory {
    /// Mints a fresh id for a new tail stream session.
    fn new_id(&self) -> TailId;
}

/// Id factory producing random version-4 UUIDs.
///
/// Intended for local development and standalone deployments. Production
/// environments usually substitute a factory that returns correlation ids
/// sourced from the ambient request context.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdFactory;

impl IdFactory for UuidIdFactory {
    fn new_id(&self) -> TailId {
        TailId(uuid::Uuid::new_v4().to_string())
    }
}

/// Deterministic id factory for tests: `prefix-0`, `prefix-1`, ...
#[derive(Debug)]
pub struct SequentialIdFactory {
    prefix: String,
    counter: core::cell::Cell<u64>,
}

impl SequentialIdFactory {
    /// Creates a factory with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: core::cell::Cell::new(0),
        }
    }
}

impl IdFactory for SequentialIdFactory {
    fn new_id(&self) -> TailId {
        let n = self.counter.get();
        self.counter.set(n + 1);
        TailId(format!("{}-{n}", self.prefix))
    }
}
