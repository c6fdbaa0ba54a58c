// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use proptest::{
    strategy::{Strategy, ValueTree},
    test_runner::{Config, RngAlgorithm, TestRng, TestRunner},
};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// Deterministic source of values drawn from proptest strategies.
pub struct ValueGenerator {
    runner: TestRunner,
}

impl ValueGenerator {
    /// Creates a generator whose stream depends only on `seed`.
    pub fn from_seed(seed: impl Hash) -> Self {
        // ChaCha wants 32 bytes: hash the seed four times with different hasher seeds.
        let mut seed_bytes = [0u8; 32];
        for (ix, chunk) in seed_bytes.chunks_exact_mut(8).enumerate() {
            let mut hasher = XxHash64::with_seed(ix as u64);
            seed.hash(&mut hasher);
            chunk.copy_from_slice(&hasher.finish().to_le_bytes());
        }
        Self::from_rng(TestRng::from_seed(RngAlgorithm::ChaCha, &seed_bytes))
    }

    /// Splits off a generator seeded from this one, so that each fixture's values do not depend
    /// on how many values earlier fixtures consumed.
    pub fn partial_clone(&mut self) -> Self {
        Self::from_rng(self.runner.new_rng())
    }

    pub fn generate<S: Strategy>(&mut self, strategy: S) -> S::Value {
        strategy
            .new_tree(&mut self.runner)
            .expect("strategies used by fixtures never reject")
            .current()
    }

    fn from_rng(rng: TestRng) -> Self {
        Self {
            runner: TestRunner::new_with_rng(Config::default(), rng),
        }
    }
}
