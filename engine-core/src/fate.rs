//! The Fate Resolver boundary. Kept as a trait (unlike the other
//! single-implementation components) specifically so scenario tests can
//! stub it to a fixed value, per the testable-properties requirement that
//! `Fate` be deterministically pinnable in a test.

use crate::model::Fate;

/// Produces a [`Fate`] modifier for one non-timeout turn.
///
/// The production implementation (`engine-fate::RandomFateResolver`) draws
/// from a cryptographic-quality source; test implementations
/// (`engine-testkit::FixedFateResolver`) return a configured value.
pub trait FateResolver: Send + Sync {
    /// Resolve a fate modifier for the next turn.
    fn resolve(&self) -> Fate;
}
