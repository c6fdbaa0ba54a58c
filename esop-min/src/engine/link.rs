// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ExorLink rewrite.
//!
//! Two cubes `A` and `B` differing in the `d` positions `p_1 .. p_d` satisfy, for any ordering
//! `π` of those positions,
//!
//! ```text
//! A ⊕ B = ⊕_k  B[π_1 .. π_(k-1)] · (A ⊕ B)[π_k] · A[π_(k+1) .. π_d]
//! ```
//!
//! where each term keeps every other position as in `A`. Every ordering yields one group of `d`
//! cubes that can replace the pair. Each cube of a group is then matched against the rest of the
//! cover: a copy of an existing cube cancels it, a distance-1 neighbor absorbs it, and anything
//! else is inserted. The best group under the sweep's [`LinkMode`] is applied exactly as
//! predicted, so the measured gain is never below the predicted one.

use crate::{
    engine::{
        arena::CubeHandle,
        cost::{Gain, LinkMode},
        packed::{LinkPosition, PackedCube, MAX_LINK_DISTANCE},
        queues::{CandidatePair, Overflow},
        Exorcism,
    },
    errors::ExorcismError,
};
use arrayvec::ArrayVec;
use itertools::Itertools;
use log::trace;

/// What happened to a candidate pair offered to ExorLink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A cube group replaced the pair.
    Applied(Gain),
    /// One of the cubes was released or rewritten after the pair was queued.
    Stale,
    /// The cubes have different outputs and the mode only links same-output pairs.
    Deferred,
    /// No cube group is acceptable under the mode.
    Rejected,
    /// The best group needs more free slots than the arena has.
    NoRoom,
}

/// Returns every cube group equivalent to `first ⊕ second`, one per ordering of `positions`,
/// in lexicographic ordering order.
pub fn cube_groups(
    first: &PackedCube,
    second: &PackedCube,
    positions: &[LinkPosition],
) -> Vec<ArrayVec<PackedCube, MAX_LINK_DISTANCE>> {
    let d = positions.len();
    (0..d)
        .permutations(d)
        .map(|order| {
            let mut from_second = 0u8;
            order
                .into_iter()
                .map(|xor_ix| {
                    let cube = link_cube(first, second, positions, xor_ix, from_second);
                    from_second |= 1 << xor_ix;
                    cube
                })
                .collect()
        })
        .collect()
}

// Positions in `from_second` take their value from `second`, position `xor_ix` takes the XOR of
// both values, and the rest stay as in `first`.
fn link_cube(
    first: &PackedCube,
    second: &PackedCube,
    positions: &[LinkPosition],
    xor_ix: usize,
    from_second: u8,
) -> PackedCube {
    let mut cube = first.clone();
    for (ix, &position) in positions.iter().enumerate() {
        if ix == xor_ix {
            cube.xor_position(position, second);
        } else if from_second & (1 << ix) != 0 {
            cube.copy_position(position, second);
        }
    }
    cube
}

/// How `cube` relates to a cube already in the cover.
#[derive(Clone, Debug)]
enum Closeness {
    Identical,
    Adjacent(PackedCube),
}

// Returns `Identical` for equal cubes, and for cubes at distance 1 the single cube equal to
// `other ⊕ cube`.
fn closeness(cube: &PackedCube, other: &PackedCube) -> Option<Closeness> {
    let input_distance = cube.input_distance(other);
    let position = match (input_distance, cube.outputs_equal(other)) {
        (0, true) => return Some(Closeness::Identical),
        (0, false) => LinkPosition::Output,
        (1, true) => *other.link_positions(cube)?.first()?,
        _ => return None,
    };
    let mut merged = other.clone();
    merged.xor_position(position, cube);
    Some(Closeness::Adjacent(merged))
}

#[derive(Clone, Debug)]
enum Placement {
    Insert,
    Cancel(CubeHandle),
    Merge(CubeHandle, PackedCube),
}

#[derive(Clone, Debug)]
struct PlannedCube {
    cube: PackedCube,
    placement: Placement,
}

#[derive(Clone, Debug)]
struct LinkPlan {
    cubes: ArrayVec<PlannedCube, MAX_LINK_DISTANCE>,
    gain: Gain,
    inserts: usize,
}

impl Exorcism {
    /// Offers `pair` to ExorLink under `mode` and returns the cost reduction achieved.
    ///
    /// Stale, deferred and rejected pairs leave the cover untouched and return [`Gain::ZERO`].
    pub fn apply(&mut self, pair: CandidatePair, mode: LinkMode) -> Result<Gain, ExorcismError> {
        match self.link(pair, mode)? {
            LinkOutcome::Applied(gain) => Ok(gain),
            _ => Ok(Gain::ZERO),
        }
    }

    /// Offers `pair` to ExorLink under `mode`.
    pub fn link(
        &mut self,
        pair: CandidatePair,
        mode: LinkMode,
    ) -> Result<LinkOutcome, ExorcismError> {
        let (first, second) = match (self.arena.get(pair.first), self.arena.get(pair.second)) {
            (Some(first), Some(second)) => (first.clone(), second.clone()),
            _ => return Ok(LinkOutcome::Stale),
        };
        if !first.outputs_overlap(&second) {
            return Ok(LinkOutcome::Rejected);
        }
        let positions = match first.link_positions(&second) {
            Some(positions) if positions.len() == pair.distance.get() => positions,
            _ => return Ok(LinkOutcome::Rejected),
        };
        if !mode.cross_output && positions.contains(&LinkPosition::Output) {
            return Ok(LinkOutcome::Deferred);
        }

        let plan = match self.plan(pair, &first, &second, &positions, mode) {
            Some(plan) => plan,
            None => return Ok(LinkOutcome::Rejected),
        };
        if plan.inserts > self.arena.free_count() + 2 {
            trace!(
                "{:?} x {:?}: group needs {} slots, {} free",
                first,
                second,
                plan.inserts,
                self.arena.free_count() + 2
            );
            self.stats.capacity_rejections += 1;
            return Ok(LinkOutcome::NoRoom);
        }

        let predicted = plan.gain;
        let gain = self.execute(pair, plan)?;
        debug_assert!(
            gain.cubes >= predicted.cubes && gain.literals >= predicted.literals,
            "measured gain {:?} below predicted {:?}",
            gain,
            predicted
        );
        self.stats.rewrites[pair.distance.index()] += 1;
        trace!(
            "linked {:?} x {:?} at {}: {}",
            first,
            second,
            pair.distance,
            gain
        );
        Ok(LinkOutcome::Applied(gain))
    }

    // Evaluates every cube group and returns the best one the mode accepts. Ties go to the
    // earliest ordering.
    fn plan(
        &self,
        pair: CandidatePair,
        first: &PackedCube,
        second: &PackedCube,
        positions: &[LinkPosition],
        mode: LinkMode,
    ) -> Option<LinkPlan> {
        let d = positions.len();
        let excluded = [pair.first, pair.second];
        let retired = Gain {
            cubes: 2,
            literals: (first.literal_count() + second.literal_count()) as isize,
        };

        // A group cube is determined by its XOR position and the set of positions taken from
        // `second`, so there are at most d * 2^d distinct ones.
        let mut memo: Vec<Option<(PackedCube, Placement)>> = vec![None; d << d];
        let mut best: Option<LinkPlan> = None;

        for order in (0..d).permutations(d) {
            let mut claimed = ArrayVec::<CubeHandle, MAX_LINK_DISTANCE>::new();
            let mut cubes = ArrayVec::<PlannedCube, MAX_LINK_DISTANCE>::new();
            let mut gain = retired;
            let mut inserts = 0;
            let mut from_second = 0u8;

            for xor_ix in order {
                let key = (xor_ix << d) | usize::from(from_second);
                let (cube, placement) = memo[key]
                    .get_or_insert_with(|| {
                        let cube = link_cube(first, second, positions, xor_ix, from_second);
                        let placement = self.place(&cube, &excluded);
                        (cube, placement)
                    })
                    .clone();
                from_second |= 1 << xor_ix;

                let placement = match placement {
                    Placement::Cancel(other) | Placement::Merge(other, _)
                        if claimed.contains(&other) =>
                    {
                        Placement::Insert
                    }
                    placement => placement,
                };
                match &placement {
                    Placement::Insert => {
                        gain.cubes -= 1;
                        gain.literals -= cube.literal_count() as isize;
                        inserts += 1;
                    }
                    Placement::Cancel(other) => {
                        gain.cubes += 1;
                        gain.literals += self.arena.literal_count(*other) as isize;
                        claimed.push(*other);
                    }
                    Placement::Merge(other, merged) => {
                        gain.literals += self.arena.literal_count(*other) as isize
                            - merged.literal_count() as isize;
                        claimed.push(*other);
                    }
                }
                cubes.push(PlannedCube { cube, placement });
            }

            if !mode.accepts(gain) {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |best| mode.rank(gain) > mode.rank(best.gain))
            {
                best = Some(LinkPlan {
                    cubes,
                    gain,
                    inserts,
                });
            }
        }

        best
    }

    /// Returns the cubes of the cover whose input fields differ from `cube`'s in at most one
    /// field, in slot order. Every cube that can cancel or merge with `cube` is among them.
    ///
    /// Looks up the cube's own input fields and each of the `2 * inputs` input fields one
    /// literal away, so the cost does not grow with the cover.
    pub fn nearby(&self, cube: &PackedCube) -> Vec<CubeHandle> {
        let mut found: Vec<CubeHandle> = std::iter::once(cube.input_key())
            .chain(cube.adjacent_input_keys())
            .flat_map(|key| self.arena.linked_with_input(&key).collect_vec())
            .collect();
        found.sort_unstable_by_key(|handle| handle.slot());
        found
    }

    // Finds where `cube` would land in the current cover, ignoring the `excluded` pair.
    fn place(&self, cube: &PackedCube, excluded: &[CubeHandle]) -> Placement {
        let mut best: Option<(CubeHandle, PackedCube, isize)> = None;
        for other in self.nearby(cube) {
            if excluded.contains(&other) {
                continue;
            }
            let other_cube = self.arena.cube(other);
            match closeness(cube, other_cube) {
                None => {}
                Some(Closeness::Identical) => return Placement::Cancel(other),
                Some(Closeness::Adjacent(merged)) => {
                    let delta =
                        merged.literal_count() as isize - other_cube.literal_count() as isize;
                    if best.as_ref().map_or(true, |(_, _, best)| delta < *best) {
                        best = Some((other, merged, delta));
                    }
                }
            }
        }
        best.map_or(Placement::Insert, |(other, merged, _)| {
            Placement::Merge(other, merged)
        })
    }

    fn execute(&mut self, pair: CandidatePair, plan: LinkPlan) -> Result<Gain, ExorcismError> {
        let before = self.arena.cost();
        self.retire(pair.first);
        self.retire(pair.second);

        let mut touched = ArrayVec::<CubeHandle, MAX_LINK_DISTANCE>::new();
        for PlannedCube { cube, placement } in plan.cubes {
            match placement {
                Placement::Insert => touched.push(self.insert(cube)?),
                Placement::Cancel(other) => {
                    self.retire(other);
                    self.stats.cancellations += 1;
                }
                Placement::Merge(other, merged) => {
                    touched.push(self.replace(other, merged));
                    self.stats.merges += 1;
                }
            }
        }

        for handle in touched {
            self.settle_and_register(handle, Overflow::Drop)?;
        }
        Ok(Gain::between(before, self.arena.cost()))
    }

    /// Adds `cube` at the back of the cover without registering it.
    pub(super) fn insert(&mut self, cube: PackedCube) -> Result<CubeHandle, ExorcismError> {
        let handle = self.arena.acquire()?;
        self.arena.write(handle, cube);
        self.arena.push_back(handle);
        Ok(handle)
    }

    /// Settles `handle` against the cover, then queues the pairs of whatever cube remains.
    pub(super) fn settle_and_register(
        &mut self,
        handle: CubeHandle,
        overflow: Overflow,
    ) -> Result<(), ExorcismError> {
        if !self.arena.is_live(handle) {
            return Ok(());
        }
        if let Some(handle) = self.settle(handle) {
            self.queues.register_cube(&self.arena, handle, overflow)?;
        }
        Ok(())
    }

    // Folds `handle` into the cover for as long as it cancels against or merges with another
    // cube. Returns the surviving handle, or `None` if the cube cancelled out.
    fn settle(&mut self, handle: CubeHandle) -> Option<CubeHandle> {
        let mut current = handle;
        loop {
            let cube = self.arena.cube(current);
            let found = self
                .nearby(cube)
                .into_iter()
                .filter(|&other| other != current)
                .find_map(|other| {
                    closeness(cube, self.arena.cube(other)).map(|closeness| (other, closeness))
                });

            match found {
                None => return Some(current),
                Some((other, Closeness::Identical)) => {
                    self.retire(current);
                    self.retire(other);
                    self.stats.cancellations += 1;
                    return None;
                }
                Some((other, Closeness::Adjacent(merged))) => {
                    self.retire(current);
                    current = self.replace(other, merged);
                    self.stats.merges += 1;
                }
            }
        }
    }

    fn replace(&mut self, handle: CubeHandle, cube: PackedCube) -> CubeHandle {
        let new_handle = self.arena.rewrite(handle, cube);
        self.queues.unregister_cube(&self.arena, handle);
        new_handle
    }

    fn retire(&mut self, handle: CubeHandle) {
        self.arena.release(handle);
        self.queues.unregister_cube(&self.arena, handle);
    }
}
