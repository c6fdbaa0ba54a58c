// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::value_generator::ValueGenerator;
use color_eyre::{eyre::bail, Result};
use esop_min::{
    config::MinimizerConfig,
    cover::Cover,
    engine::{Cost, MinimizeSummary},
};
use log::{debug, info};
use proptest::prelude::*;
use std::fmt;

pub struct AllFixtures;

impl AllFixtures {
    /// Minimizes `count` random 8-input, 4-output covers and checks each result against its
    /// starting cover.
    pub fn minimize_8_4(count: usize, quality: u32) -> Result<SweepTotals> {
        let mut value_gen = ValueGenerator::from_seed("esop-min_8_4");
        let config = MinimizerConfig::new().with_quality(quality);

        let mut totals = SweepTotals::default();
        for cover_ix in 0..count {
            let mut gen = value_gen.partial_clone();
            let cover = gen.generate(any_with::<Cover<8, 4>>(Some((1, 48))));
            let (minimized, summary) = cover.minimize_with_summary(&config)?;

            if let Err(values) = minimized.check_logically_equivalent(&cover) {
                bail!(
                    "cover {} is not equivalent after minimization, at inputs {:?}\n\
                     starting cover:\n{}\nminimized cover:\n{}",
                    cover_ix,
                    values,
                    cover.matrix_display(),
                    minimized.matrix_display(),
                );
            }

            debug!("cover {}: {}", cover_ix, summary);
            totals.add(&summary);
        }

        info!("minimized {} covers: {}", count, totals);
        Ok(totals)
    }
}

/// Aggregate statistics over a fixture sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepTotals {
    pub covers: usize,
    pub starting_cost: Cost,
    pub final_cost: Cost,
    pub rounds: usize,
    pub aggressive_rounds: usize,
    pub rewrites: [usize; 3],
    pub dropped_pairs: usize,
}

impl SweepTotals {
    fn add(&mut self, summary: &MinimizeSummary) {
        self.covers += 1;
        self.starting_cost.cubes += summary.starting_cost.cubes;
        self.starting_cost.literals += summary.starting_cost.literals;
        self.final_cost.cubes += summary.final_cost.cubes;
        self.final_cost.literals += summary.final_cost.literals;
        self.rounds += summary.stats.rounds;
        self.aggressive_rounds += summary.stats.aggressive_rounds;
        for (total, count) in self.rewrites.iter_mut().zip(summary.stats.rewrites) {
            *total += count;
        }
        self.dropped_pairs += summary.stats.dropped_pairs;
    }
}

impl fmt::Display for SweepTotals {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "covers:       {}", self.covers)?;
        writeln!(f, "starting:     {}", self.starting_cost)?;
        writeln!(f, "minimized:    {}", self.final_cost)?;
        writeln!(
            f,
            "rounds:       {} ({} aggressive)",
            self.rounds, self.aggressive_rounds
        )?;
        write!(
            f,
            "rewrites:     {} at distance 2, {} at 3, {} at 4",
            self.rewrites[0], self.rewrites[1], self.rewrites[2]
        )?;
        if self.dropped_pairs > 0 {
            write!(f, "\ndropped:      {} pairs", self.dropped_pairs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimize_sweep() {
        let totals = AllFixtures::minimize_8_4(4, 0).unwrap();
        assert_eq!(totals.covers, 4);
        assert!(totals.final_cost <= totals.starting_cost);
        assert_eq!(totals, AllFixtures::minimize_8_4(4, 0).unwrap(), "sweeps are deterministic");
    }
}
