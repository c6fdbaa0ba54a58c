// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ExorcismError;

/// The largest starting cover accepted by default.
pub const DEFAULT_MAX_STARTING_CUBES: usize = 20_000;

/// Tunables for one minimization run.
///
/// Defaults: quality 0, literal cleanup enabled, queues sized at `capacity² / 20`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinimizerConfig {
    /// Number of additional non-improving rounds tolerated before the improvement phase stops.
    pub quality: u32,
    /// Whether rewrites that keep the cube count but remove literals are taken, both in the
    /// improvement phase and in a literal-cleanup phase after it.
    pub decrease_literals: bool,
    /// Starting covers with more cubes than this are rejected before any allocation.
    pub max_starting_cubes: usize,
    /// Arena slots allocated on top of the starting cube count.
    pub spare_cubes: usize,
    /// Each adjacency queue holds `capacity² / queue_divisor` pairs.
    pub queue_divisor: usize,
    /// Lower bound on the per-queue capacity.
    pub min_queue_capacity: usize,
    /// Distance-2/3 sweep pairs per improvement round.
    pub improvement_sweeps: usize,
    /// Distance-2/3 sweep pairs in the literal-cleanup phase.
    pub cleanup_rounds: usize,
}

impl MinimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_decrease_literals(mut self, decrease_literals: bool) -> Self {
        self.decrease_literals = decrease_literals;
        self
    }

    pub fn with_max_starting_cubes(mut self, max_starting_cubes: usize) -> Self {
        self.max_starting_cubes = max_starting_cubes;
        self
    }

    pub fn with_spare_cubes(mut self, spare_cubes: usize) -> Self {
        self.spare_cubes = spare_cubes;
        self
    }

    pub fn with_queue_capacity(mut self, queue_divisor: usize, min_queue_capacity: usize) -> Self {
        self.queue_divisor = queue_divisor;
        self.min_queue_capacity = min_queue_capacity;
        self
    }

    pub fn with_improvement_sweeps(mut self, improvement_sweeps: usize) -> Self {
        self.improvement_sweeps = improvement_sweeps;
        self
    }

    pub fn with_cleanup_rounds(mut self, cleanup_rounds: usize) -> Self {
        self.cleanup_rounds = cleanup_rounds;
        self
    }

    pub fn validate(&self) -> Result<(), ExorcismError> {
        if self.queue_divisor == 0 {
            return Err(ExorcismError::InvalidConfig("queue divisor must be at least 1"));
        }
        if self.improvement_sweeps == 0 {
            return Err(ExorcismError::InvalidConfig(
                "improvement rounds need at least one sweep",
            ));
        }
        Ok(())
    }

    /// Returns the per-queue pair capacity for an arena of `cube_capacity` slots.
    pub fn queue_capacity(&self, cube_capacity: usize) -> usize {
        let scaled = cube_capacity.saturating_mul(cube_capacity) / self.queue_divisor.max(1);
        scaled.max(self.min_queue_capacity)
    }

    /// The improvement phase escalates to an aggressive round once this many rounds in a row
    /// have been fruitless.
    #[inline]
    pub(crate) fn escalation_threshold(&self) -> u32 {
        u32::from(self.quality > 0).max(1)
    }

    /// The improvement phase stops once this many rounds in a row have been fruitless.
    #[inline]
    pub(crate) fn plateau_limit(&self) -> u32 {
        self.quality.saturating_add(1)
    }
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            quality: 0,
            decrease_literals: true,
            max_starting_cubes: DEFAULT_MAX_STARTING_CUBES,
            spare_cubes: 256,
            queue_divisor: 20,
            min_queue_capacity: 4096,
            improvement_sweeps: 6,
            cleanup_rounds: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_capacity() {
        let config = MinimizerConfig::default();
        assert_eq!(config.queue_capacity(10), 4096, "small arenas use the floor");
        assert_eq!(config.queue_capacity(1000), 50_000);

        let tight = config.with_queue_capacity(1, 0);
        assert_eq!(tight.queue_capacity(3), 9);
    }

    #[test]
    fn test_schedule_limits() {
        let config = MinimizerConfig::default();
        assert_eq!(config.plateau_limit(), 1);
        assert_eq!(config.escalation_threshold(), 1);

        let config = config.with_quality(3);
        assert_eq!(config.plateau_limit(), 4);
        assert_eq!(config.escalation_threshold(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(MinimizerConfig::default().validate().is_ok());
        assert!(matches!(
            MinimizerConfig::default()
                .with_queue_capacity(0, 16)
                .validate(),
            Err(ExorcismError::InvalidConfig(_))
        ));
    }
}
