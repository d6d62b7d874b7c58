#![deny(missing_docs)]
//! Weighted-random implementation of `engine_core::FateResolver`.
//!
//! Draws a `0..100` integer from `OsRng` and splits it 25/50/25 into
//! `Lucky`/`Normal`/`Unlucky`. For deterministic tests, use
//! `engine_testkit::FixedFateResolver` instead.

use engine_core::{Fate, FateResolver};
use rand::{rngs::OsRng, Rng};

/// Draws `Fate::Lucky` 25% of the time, `Fate::Normal` 50%, and
/// `Fate::Unlucky` 25% of the time.
pub struct RandomFateResolver;

impl RandomFateResolver {
    /// Construct a resolver backed by the OS random number generator.
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomFateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FateResolver for RandomFateResolver {
    fn resolve(&self) -> Fate {
        match OsRng.gen_range(0..100) {
            0..=24 => Fate::Lucky,
            25..=74 => Fate::Normal,
            _ => Fate::Unlucky,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_to_a_valid_fate_many_times() {
        let resolver = RandomFateResolver::new();
        for _ in 0..1000 {
            let fate = resolver.resolve();
            assert!(matches!(fate, Fate::Lucky | Fate::Normal | Fate::Unlucky));
        }
    }

    #[test]
    fn distribution_roughly_matches_25_50_25_over_many_draws() {
        let resolver = RandomFateResolver::new();
        let mut lucky = 0;
        let mut normal = 0;
        let mut unlucky = 0;
        for _ in 0..20_000 {
            match resolver.resolve() {
                Fate::Lucky => lucky += 1,
                Fate::Normal => normal += 1,
                Fate::Unlucky => unlucky += 1,
            }
        }
        assert!((4_500..5_500).contains(&lucky), "lucky count {lucky}");
        assert!((9_000..11_000).contains(&normal), "normal count {normal}");
        assert!((4_500..5_500).contains(&unlucky), "unlucky count {unlucky}");
    }
}
