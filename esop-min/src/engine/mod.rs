// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The iterative cube-rewriting engine.
//!
//! An [`Exorcism`] owns everything one minimization run needs: the [`CubeArena`] holding the
//! cover, the [`AdjacencyQueues`] of candidate pairs, and the schedule state. The controller
//! (`controller.rs`) drives ExorLink sweeps (`link.rs`) over the queues until the cover stops
//! improving.

mod arena;
mod controller;
mod cost;
mod link;
mod packed;
mod queues;

pub use arena::{CubeArena, CubeHandle, RingIter};
pub use controller::MinimizeSummary;
pub use cost::{Cost, Gain, LinkMode, Metric};
pub use link::{cube_groups, LinkOutcome};
pub use packed::{
    InputKey, LinkPosition, PackedCube, FIELDS_PER_WORD, MAX_LINK_DISTANCE, WORD_BITS,
};
pub use queues::{AdjacencyQueues, CandidatePair, Distance};

use crate::config::MinimizerConfig;

/// State of one minimization run.
#[derive(Clone, Debug)]
pub struct Exorcism {
    arena: CubeArena,
    queues: AdjacencyQueues,
    config: MinimizerConfig,
    stats: RunStats,
    rounds_without_gain: u32,
    starting_cost: Cost,
}

/// Counters collected over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Improvement rounds executed.
    pub rounds: usize,
    /// Improvement rounds that escalated to cross-output and distance-4 sweeps.
    pub aggressive_rounds: usize,
    /// Accepted ExorLink rewrites, indexed by distance class (2, 3, 4).
    pub rewrites: [usize; 3],
    /// Cubes folded into a neighbor at distance 1.
    pub merges: usize,
    /// Pairs of identical cubes removed.
    pub cancellations: usize,
    /// Rewrites abandoned because the arena had no room for them.
    pub capacity_rejections: usize,
    /// Zero-output cubes discarded while seeding.
    pub empty_cubes: usize,
    /// Candidate pairs discarded because their queue was full.
    pub dropped_pairs: usize,
}

impl RunStats {
    pub fn total_rewrites(&self) -> usize {
        self.rewrites.iter().sum()
    }
}

impl Exorcism {
    #[inline]
    pub fn arena(&self) -> &CubeArena {
        &self.arena
    }

    #[inline]
    pub fn queues(&self) -> &AdjacencyQueues {
        &self.queues
    }

    #[inline]
    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Number of consecutive improvement rounds without gain.
    #[inline]
    pub fn rounds_without_gain(&self) -> u32 {
        self.rounds_without_gain
    }

    /// Cost of the cover as it was handed in, before any merging.
    #[inline]
    pub fn starting_cost(&self) -> Cost {
        self.starting_cost
    }

    #[inline]
    pub fn cost(&self) -> Cost {
        self.arena.cost()
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.arena.input_len()
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.arena.output_len()
    }

    /// Walks the current cover front to back.
    pub fn cubes(&self) -> impl Iterator<Item = CubeRef<'_>> + '_ {
        self.arena.handles().map(move |handle| CubeRef {
            arena: &self.arena,
            handle,
        })
    }
}

/// Read-only view of one cube of the cover.
#[derive(Clone, Copy, Debug)]
pub struct CubeRef<'a> {
    arena: &'a CubeArena,
    handle: CubeHandle,
}

impl<'a> CubeRef<'a> {
    #[inline]
    pub fn handle(&self) -> CubeHandle {
        self.handle
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.arena.id(self.handle)
    }

    #[inline]
    pub fn literal(&self, var: usize) -> Option<bool> {
        self.arena.literal(self.handle, var)
    }

    #[inline]
    pub fn output(&self, output_ix: usize) -> bool {
        self.arena.output(self.handle, output_ix)
    }

    #[inline]
    pub fn literal_count(&self) -> usize {
        self.arena.literal_count(self.handle)
    }

    #[inline]
    pub fn output_weight(&self) -> usize {
        self.arena.output_weight(self.handle)
    }

    #[inline]
    pub fn packed(&self) -> &'a PackedCube {
        self.arena.cube(self.handle)
    }
}
