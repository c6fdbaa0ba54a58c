// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seeding and the minimization schedule.

use crate::{
    config::MinimizerConfig,
    engine::{
        arena::CubeArena,
        cost::{Cost, Gain, LinkMode, Metric},
        link::LinkOutcome,
        packed::PackedCube,
        queues::{AdjacencyQueues, Distance, Overflow},
        Exorcism, RunStats,
    },
    errors::{CubePart, ExorcismError},
};
use log::{debug, info, trace};
use std::fmt;

const IMPROVE_THREE: LinkMode = LinkMode::STRICT;
const CLEANUP: LinkMode = LinkMode::STRICT
    .with_metric(Metric::Literals)
    .with_accept_on_tie(true);

/// Result of [`Exorcism::minimize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinimizeSummary {
    /// Cost of the cover as handed in.
    pub starting_cost: Cost,
    /// Cost after seeding, which already folds identical and adjacent cubes.
    pub seeded_cost: Cost,
    pub final_cost: Cost,
    pub improvement_gain: Gain,
    pub cleanup_gain: Gain,
    pub stats: RunStats,
}

impl MinimizeSummary {
    /// Overall reduction from the starting cover.
    pub fn gain(&self) -> Gain {
        Gain::between(self.starting_cost, self.final_cost)
    }
}

impl fmt::Display for MinimizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} rounds, {} rewrites)",
            self.starting_cost,
            self.final_cost,
            self.stats.rounds,
            self.stats.total_rewrites()
        )
    }
}

impl Exorcism {
    /// Loads a starting cover.
    ///
    /// Each record is a pair of literal and output iterators of the given widths. Records with no
    /// outputs set are dropped, and every other cube is folded into the cover as it arrives:
    /// identical cubes cancel and cubes at distance 1 merge. All pairs of the settled cover at
    /// distance 2, 3 and 4 are queued.
    pub fn new<I, O>(
        input_len: usize,
        output_len: usize,
        cubes: impl IntoIterator<Item = (I, O)>,
        config: MinimizerConfig,
    ) -> Result<Self, ExorcismError>
    where
        I: IntoIterator<Item = Option<bool>>,
        O: IntoIterator<Item = bool>,
    {
        config.validate()?;
        let records: Vec<(I, O)> = cubes.into_iter().collect();
        if records.len() > config.max_starting_cubes {
            return Err(ExorcismError::StartingCoverTooLarge {
                count: records.len(),
                limit: config.max_starting_cubes,
            });
        }

        let arena =
            CubeArena::allocate(input_len, output_len, records.len() + config.spare_cubes)?;
        let queues = AdjacencyQueues::new(config.queue_capacity(arena.capacity()), arena.capacity());
        let mut exorcism = Self {
            arena,
            queues,
            config,
            stats: RunStats::default(),
            rounds_without_gain: 0,
            starting_cost: Cost::default(),
        };

        for (index, (inputs, outputs)) in records.into_iter().enumerate() {
            let cube = PackedCube::from_parts(input_len, output_len, inputs, outputs).map_err(
                |(part, actual)| ExorcismError::WidthMismatch {
                    index,
                    part,
                    actual,
                    expected: match part {
                        CubePart::Input => input_len,
                        CubePart::Output => output_len,
                    },
                },
            )?;
            exorcism.starting_cost.cubes += 1;
            exorcism.starting_cost.literals += cube.literal_count();

            if cube.output_weight() == 0 {
                trace!("dropping starting cube {} with no outputs", index);
                exorcism.stats.empty_cubes += 1;
                continue;
            }
            let handle = exorcism.insert(cube)?;
            exorcism.settle_and_register(handle, Overflow::Fail)?;
        }

        debug!(
            "seeded {} inputs x {} outputs: {} -> {}, queues {}/{}/{} (capacity {})",
            input_len,
            output_len,
            exorcism.starting_cost,
            exorcism.cost(),
            exorcism.queues.len(Distance::Two),
            exorcism.queues.len(Distance::Three),
            exorcism.queues.len(Distance::Four),
            exorcism.queues.capacity(),
        );
        Ok(exorcism)
    }

    /// Runs the improvement phase, then the literal cleanup phase if enabled.
    pub fn minimize(&mut self) -> Result<MinimizeSummary, ExorcismError> {
        let seeded_cost = self.cost();
        let improvement_gain = self.run_improvement_phase()?;
        let cleanup_gain = if self.config.decrease_literals {
            self.run_literal_cleanup()?
        } else {
            Gain::ZERO
        };

        self.stats.dropped_pairs = self.queues.dropped();
        let summary = MinimizeSummary {
            starting_cost: self.starting_cost,
            seeded_cost,
            final_cost: self.cost(),
            improvement_gain,
            cleanup_gain,
            stats: self.stats.clone(),
        };
        info!("minimized cover: {}", summary);
        Ok(summary)
    }

    /// Repeats improvement rounds until `quality + 1` rounds in a row gain nothing.
    ///
    /// A round sweeps distance 2 and 3 pairs several times. Once more than one round in a row has
    /// been fruitless, each round is followed by an aggressive sweep that also links pairs with
    /// different outputs and distance 4 pairs. Rewrites must remove a cube, except that with
    /// `decrease_literals` set the distance 2 and aggressive sweeps also take rewrites that keep
    /// the cube count and remove literals. Calling this again once the cover has plateaued does
    /// nothing.
    pub fn run_improvement_phase(&mut self) -> Result<Gain, ExorcismError> {
        let improve_two = LinkMode::STRICT.with_accept_on_tie(self.config.decrease_literals);
        let aggressive_mode = improve_two.with_cross_output(true);

        let mut total = Gain::ZERO;
        while self.rounds_without_gain < self.config.plateau_limit() {
            let before = self.cost();
            for _ in 0..self.config.improvement_sweeps {
                self.sweep(Distance::Two, improve_two)?;
                self.sweep(Distance::Three, IMPROVE_THREE)?;
            }
            let mut gain = Gain::between(before, self.cost());
            self.note_round(gain);

            let aggressive = self.rounds_without_gain > self.config.escalation_threshold();
            if aggressive {
                let before = self.cost();
                for distance in Distance::ALL {
                    self.sweep(distance, aggressive_mode)?;
                }
                let aggressive_gain = Gain::between(before, self.cost());
                if aggressive_gain.is_positive() {
                    self.rounds_without_gain = 0;
                }
                gain += aggressive_gain;
                self.stats.aggressive_rounds += 1;
            }

            total += gain;
            debug!(
                "round {}{}: {}, now {}",
                self.stats.rounds,
                if aggressive { " (aggressive)" } else { "" },
                gain,
                self.cost()
            );
        }
        Ok(total)
    }

    fn note_round(&mut self, gain: Gain) {
        self.stats.rounds += 1;
        if gain.is_positive() {
            self.rounds_without_gain = 0;
        } else {
            self.rounds_without_gain += 1;
        }
    }

    /// Sweeps distance 2 and 3 pairs for literal reductions that keep the cube count.
    pub fn run_literal_cleanup(&mut self) -> Result<Gain, ExorcismError> {
        let before = self.cost();
        for _ in 0..self.config.cleanup_rounds {
            self.sweep(Distance::Two, CLEANUP)?;
            self.sweep(Distance::Three, CLEANUP)?;
        }
        let gain = Gain::between(before, self.cost());
        debug!("literal cleanup: {}, now {}", gain, self.cost());
        Ok(gain)
    }

    /// Offers every pair currently queued at `distance` to ExorLink, oldest first.
    ///
    /// Pairs that were deferred or rejected go back to the front of the queue; pairs queued by
    /// rewrites during the sweep wait for the next one.
    pub fn sweep(&mut self, distance: Distance, mode: LinkMode) -> Result<Gain, ExorcismError> {
        let before = self.cost();
        let pairs = self.queues.drain(&self.arena, distance);
        let offered = pairs.len();
        let mut kept = Vec::new();
        let mut applied = 0;

        for pair in pairs {
            match self.link(pair, mode)? {
                LinkOutcome::Applied(_) => applied += 1,
                LinkOutcome::Deferred | LinkOutcome::Rejected => kept.push(pair),
                LinkOutcome::Stale | LinkOutcome::NoRoom => {}
            }
        }
        self.queues.restore(&self.arena, distance, kept);

        let gain = Gain::between(before, self.cost());
        trace!(
            "sweep at {} ({:?}): {} of {} pairs applied, {}",
            distance,
            mode.metric,
            applied,
            offered,
            gain
        );
        Ok(gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::packed::parse_cube;
    use proptest::prelude::*;
    use test_log::test;

    type Record = (Vec<Option<bool>>, Vec<bool>);

    fn record(input: &str, output: &str) -> Record {
        let cube = parse_cube(input, output);
        (cube.literals().collect(), cube.outputs().collect())
    }

    fn records(cubes: &[(&str, &str)]) -> Vec<Record> {
        cubes
            .iter()
            .map(|(input, output)| record(input, output))
            .collect()
    }

    fn eval_records(records: &[Record], values: &[bool], output_len: usize) -> Vec<bool> {
        let mut result = vec![false; output_len];
        for (inputs, outputs) in records {
            let contains = inputs
                .iter()
                .zip(values)
                .all(|(literal, value)| literal.map_or(true, |literal| literal == *value));
            if contains {
                for (ix, output) in outputs.iter().enumerate() {
                    result[ix] ^= output;
                }
            }
        }
        result
    }

    fn eval_exorcism(exorcism: &Exorcism, values: &[bool]) -> Vec<bool> {
        let mut result = vec![false; exorcism.output_len()];
        for cube in exorcism.cubes() {
            if cube.packed().contains_assignment(values) {
                for ix in 0..result.len() {
                    result[ix] ^= cube.output(ix);
                }
            }
        }
        result
    }

    fn assert_equivalent(records: &[Record], exorcism: &Exorcism) {
        let input_len = exorcism.input_len();
        for bits in 0..1usize << input_len {
            let values: Vec<bool> = (0..input_len).map(|i| bits >> i & 1 == 1).collect();
            assert_eq!(
                eval_records(records, &values, exorcism.output_len()),
                eval_exorcism(exorcism, &values),
                "mismatch at {:?}",
                values
            );
        }
    }

    #[test]
    fn test_seeding_merges_adjacent() {
        let cubes = records(&[("01-", "1"), ("00-", "1")]);
        let mut exorcism = Exorcism::new(3, 1, cubes.clone(), MinimizerConfig::new()).unwrap();
        assert_eq!(exorcism.starting_cost(), Cost { cubes: 2, literals: 4 });
        assert_eq!(exorcism.cost(), Cost { cubes: 1, literals: 1 });

        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.gain(), Gain { cubes: 1, literals: 3 });
        let cover: Vec<_> = exorcism
            .cubes()
            .map(|cube| format!("{:?}", cube.packed()))
            .collect();
        assert_eq!(cover, vec!["0-- 1"]);
        assert_equivalent(&cubes, &exorcism);
    }

    #[test]
    fn test_seeding_cancels_and_drops() {
        let cubes = records(&[("01", "1"), ("11", "0"), ("01", "1"), ("10", "1")]);
        let exorcism = Exorcism::new(2, 1, cubes.clone(), MinimizerConfig::new()).unwrap();
        assert_eq!(exorcism.starting_cost(), Cost { cubes: 4, literals: 8 });
        assert_eq!(exorcism.cost(), Cost { cubes: 1, literals: 2 });
        assert_eq!(exorcism.stats().empty_cubes, 1);
        assert_eq!(exorcism.stats().cancellations, 1);
        assert_equivalent(&cubes, &exorcism);
    }

    #[test]
    fn test_empty_cover() {
        let mut exorcism =
            Exorcism::new(4, 2, Vec::<Record>::new(), MinimizerConfig::new()).unwrap();
        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.final_cost, Cost::default());
        assert_eq!(summary.gain(), Gain::ZERO);
        assert_eq!(exorcism.cubes().count(), 0);
    }

    #[test]
    fn test_starting_cover_too_large() {
        let config = MinimizerConfig::new().with_spare_cubes(0);
        let cubes = (0..20_001).map(|_| (vec![Some(true)], vec![true]));
        assert_eq!(
            Exorcism::new(1, 1, cubes, config.clone()).unwrap_err(),
            ExorcismError::StartingCoverTooLarge {
                count: 20_001,
                limit: 20_000,
            }
        );

        // Exactly at the limit is fine: the cubes cancel pairwise.
        let cubes = (0..20_000).map(|_| (vec![Some(true)], vec![true]));
        let exorcism = Exorcism::new(1, 1, cubes, config).unwrap();
        assert_eq!(exorcism.cost(), Cost::default());
    }

    #[test]
    fn test_width_mismatch() {
        let cubes = vec![record("01", "1"), (vec![Some(true)], vec![true])];
        assert_eq!(
            Exorcism::new(2, 1, cubes, MinimizerConfig::new()).unwrap_err(),
            ExorcismError::WidthMismatch {
                index: 1,
                part: CubePart::Input,
                actual: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_queue_capacity_exceeded() {
        // Four distance-2 pairs do not fit in three entries.
        let cubes = records(&[("0000", "1"), ("0011", "1"), ("1100", "1"), ("1111", "1")]);
        let config = MinimizerConfig::new().with_queue_capacity(usize::MAX, 3);
        let err = Exorcism::new(4, 1, cubes, config).unwrap_err();
        assert!(
            matches!(
                err,
                ExorcismError::QueueCapacityExceeded {
                    distance: Distance::Two,
                    capacity: 3,
                    ..
                }
            ),
            "{}",
            err
        );
    }

    #[test]
    fn test_improvement_is_idempotent() {
        // Inclusive OR of two variables, as three minterms.
        let cubes = records(&[("10", "1"), ("01", "1"), ("11", "1")]);
        let mut exorcism = Exorcism::new(2, 1, cubes.clone(), MinimizerConfig::new()).unwrap();
        exorcism.run_improvement_phase().unwrap();
        let cost = exorcism.cost();
        let rounds = exorcism.stats().rounds;
        assert_eq!(exorcism.rounds_without_gain(), 1);

        assert_eq!(exorcism.run_improvement_phase().unwrap(), Gain::ZERO);
        assert_eq!(exorcism.cost(), cost);
        assert_eq!(exorcism.stats().rounds, rounds);
        assert_equivalent(&cubes, &exorcism);
    }

    #[test]
    fn test_cleanup_toggle() {
        let cubes = records(&[("000", "1"), ("011", "1")]);

        let mut exorcism = Exorcism::new(
            3,
            1,
            cubes.clone(),
            MinimizerConfig::new().with_decrease_literals(false),
        )
        .unwrap();
        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.cleanup_gain, Gain::ZERO);

        let mut exorcism = Exorcism::new(3, 1, cubes.clone(), MinimizerConfig::new()).unwrap();
        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.final_cost.cubes, 2);
        assert!(summary.final_cost.literals <= 4);
        assert_equivalent(&cubes, &exorcism);
    }

    #[test]
    fn test_literal_only_rewrites_need_decrease_literals() {
        // Every rewrite of x'y'z' ⊕ x'yz keeps two cubes and only saves literals.
        let cubes = records(&[("000", "1"), ("011", "1")]);
        let config = MinimizerConfig::new()
            .with_decrease_literals(false)
            .with_quality(1);
        let mut exorcism = Exorcism::new(3, 1, cubes.clone(), config).unwrap();
        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.improvement_gain, Gain::ZERO);
        assert_eq!(summary.cleanup_gain, Gain::ZERO);
        assert_eq!(summary.stats.total_rewrites(), 0);
        assert!(summary.stats.aggressive_rounds >= 1);
        assert_eq!(summary.final_cost, Cost { cubes: 2, literals: 6 });
        assert_equivalent(&cubes, &exorcism);

        let config = MinimizerConfig::new().with_quality(1);
        let mut exorcism = Exorcism::new(3, 1, cubes.clone(), config).unwrap();
        let summary = exorcism.minimize().unwrap();
        assert_eq!(summary.improvement_gain, Gain { cubes: 0, literals: 2 });
        assert_eq!(summary.final_cost, Cost { cubes: 2, literals: 4 });
        assert_equivalent(&cubes, &exorcism);
    }

    #[test]
    fn test_aggressive_round_links_across_outputs() {
        // f0 = x0' x1', f1 = x0' x1' ⊕ x0 x1'. The pair only links across outputs.
        let cubes = records(&[("00", "11"), ("10", "01")]);
        let config = MinimizerConfig::new().with_quality(1);
        let mut exorcism = Exorcism::new(2, 2, cubes.clone(), config).unwrap();
        let summary = exorcism.minimize().unwrap();
        assert!(summary.stats.aggressive_rounds >= 1);
        assert_eq!(summary.final_cost, Cost { cubes: 2, literals: 3 });
        assert_equivalent(&cubes, &exorcism);
    }

    fn literal() -> impl Strategy<Value = Option<bool>> {
        prop_oneof![Just(None), Just(Some(false)), Just(Some(true))]
    }

    fn cover_strategy() -> impl Strategy<Value = (usize, usize, Vec<Record>)> {
        (1usize..=6, 1usize..=4).prop_flat_map(|(input_len, output_len)| {
            let record = (
                prop::collection::vec(literal(), input_len),
                prop::collection::vec(any::<bool>(), output_len),
            );
            (
                Just(input_len),
                Just(output_len),
                prop::collection::vec(record, 0..24),
            )
        })
    }

    proptest! {
        #[test]
        fn proptest_minimize_preserves_function(
            (input_len, output_len, cubes) in cover_strategy(),
            quality in 0u32..3,
        ) {
            let config = MinimizerConfig::new().with_quality(quality).with_spare_cubes(32);
            let mut exorcism = Exorcism::new(input_len, output_len, cubes.clone(), config).unwrap();
            let seeded = exorcism.cost();
            let summary = exorcism.minimize().unwrap();

            assert_equivalent(&cubes, &exorcism);
            prop_assert!(summary.final_cost <= seeded);
            prop_assert!(summary.final_cost <= summary.starting_cost);
            prop_assert_eq!(summary.final_cost, exorcism.cost());
            prop_assert_eq!(exorcism.arena().active_count(), exorcism.arena().cover_len());
        }

        #[test]
        fn proptest_strict_sweeps_never_increase_cost(
            (input_len, output_len, cubes) in cover_strategy(),
        ) {
            let mut exorcism =
                Exorcism::new(input_len, output_len, cubes, MinimizerConfig::new()).unwrap();
            for distance in Distance::ALL {
                let before = exorcism.cost();
                let gain = exorcism
                    .sweep(distance, LinkMode::STRICT.with_cross_output(true))
                    .unwrap();
                prop_assert!(exorcism.cost() <= before);
                prop_assert!(gain.is_positive() || gain.is_zero());
            }
        }
    }
}
