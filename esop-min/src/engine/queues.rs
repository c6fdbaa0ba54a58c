// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worklists of cube pairs that ExorLink may rewrite.
//!
//! There is one FIFO queue per distance class. Pairs are discovered when a cube is registered,
//! by scanning the cover front to back for cubes registered earlier, and are never rebuilt
//! wholesale. Entries whose cubes were released or rewritten since registration are stale: they
//! are skipped when a queue is drained and purged whenever a queue runs out of room.

use crate::{
    engine::{
        arena::{CubeArena, CubeHandle},
        packed::MAX_LINK_DISTANCE,
    },
    errors::ExorcismError,
};
use log::trace;
use std::{collections::VecDeque, fmt};

/// Distance class of a candidate pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Distance {
    Two,
    Three,
    Four,
}

impl Distance {
    pub const ALL: [Distance; 3] = [Distance::Two, Distance::Three, Distance::Four];

    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    /// Number of differing positions.
    #[inline]
    pub fn get(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.get() - 2
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "distance {}", self.get())
    }
}

/// Two cubes that differ in exactly `distance` positions and share at least one output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    pub first: CubeHandle,
    pub second: CubeHandle,
    pub distance: Distance,
}

impl CandidatePair {
    #[inline]
    pub fn is_live(&self, arena: &CubeArena) -> bool {
        arena.is_live(self.first) && arena.is_live(self.second)
    }
}

/// What to do when a queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overflow {
    /// Report [`ExorcismError::QueueCapacityExceeded`].
    Fail,
    /// Drop the pair.
    Drop,
}

#[derive(Clone, Debug)]
pub struct AdjacencyQueues {
    queues: [VecDeque<(CubeHandle, CubeHandle)>; 3],
    // Per arena slot, the registered generation.
    registered: Vec<Option<u32>>,
    capacity: usize,
    dropped: usize,
    retired: usize,
}

impl AdjacencyQueues {
    /// Creates empty queues holding up to `capacity` pairs each, for an arena of `slots` slots.
    pub fn new(capacity: usize, slots: usize) -> Self {
        Self {
            queues: Default::default(),
            registered: vec![None; slots],
            capacity,
            dropped: 0,
            retired: 0,
        }
    }

    /// Per-queue capacity in pairs.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries (including stale ones) waiting in the queue for `distance`.
    #[inline]
    pub fn len(&self, distance: Distance) -> usize {
        self.queues[distance.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    /// Number of pairs discarded because their queue was full.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn is_registered(&self, handle: CubeHandle) -> bool {
        self.registered.get(handle.slot()).copied().flatten() == Some(handle.generation())
    }

    /// Queues every pair formed by `handle` and a registered cube in the cover at distance 2, 3
    /// or 4 with overlapping outputs, then marks `handle` registered. Returns the number of pairs
    /// queued.
    pub(crate) fn register_cube(
        &mut self,
        arena: &CubeArena,
        handle: CubeHandle,
        overflow: Overflow,
    ) -> Result<usize, ExorcismError> {
        let cube = arena.cube(handle);
        let mut queued = 0;

        for other in arena.handles() {
            if other == handle || !self.is_registered(other) {
                continue;
            }
            let other_cube = arena.cube(other);
            let input_distance = cube.input_distance(other_cube);
            if input_distance > MAX_LINK_DISTANCE || !cube.outputs_overlap(other_cube) {
                continue;
            }
            let distance = input_distance + usize::from(!cube.outputs_equal(other_cube));
            let distance = match Distance::from_count(distance) {
                Some(distance) => distance,
                None => continue,
            };
            if self.push(arena, (other, handle), distance, overflow)? {
                queued += 1;
            }
        }

        self.registered[handle.slot()] = Some(handle.generation());
        Ok(queued)
    }

    /// Notes that `handle` was released or rewritten.
    ///
    /// Its entries are already unreachable because the arena bumped the slot generation; once
    /// enough cubes have been retired the queues are compacted.
    pub(crate) fn unregister_cube(&mut self, arena: &CubeArena, handle: CubeHandle) {
        debug_assert!(!arena.is_live(handle), "only retired cubes are unregistered");
        if self.is_registered(handle) {
            self.registered[handle.slot()] = None;
        }
        self.retired += 1;
        if self.retired > self.capacity.max(1) {
            self.purge_stale(arena);
        }
    }

    /// Takes every live pair out of the queue for `distance`, oldest first.
    ///
    /// Pairs queued after this call wait for the next drain.
    pub fn drain(&mut self, arena: &CubeArena, distance: Distance) -> Vec<CandidatePair> {
        std::mem::take(&mut self.queues[distance.index()])
            .into_iter()
            .map(|(first, second)| CandidatePair {
                first,
                second,
                distance,
            })
            .filter(|pair| pair.is_live(arena))
            .collect()
    }

    /// Puts pairs that were drained but not consumed back at the front of their queue.
    ///
    /// If the queue overflows, the oldest pairs are dropped first, so the restored pairs go
    /// before anything registered since the drain.
    pub(crate) fn restore(
        &mut self,
        arena: &CubeArena,
        distance: Distance,
        pairs: impl IntoIterator<Item = CandidatePair>,
    ) {
        let queue = &mut self.queues[distance.index()];
        let newer = std::mem::take(queue);
        queue.extend(
            pairs
                .into_iter()
                .filter(|pair| pair.is_live(arena))
                .map(|pair| (pair.first, pair.second)),
        );
        queue.extend(newer);

        if queue.len() > self.capacity {
            queue.retain(|&(first, second)| arena.is_live(first) && arena.is_live(second));
        }
        if queue.len() > self.capacity {
            let excess = queue.len() - self.capacity;
            trace!("dropping {} pairs at {}", excess, distance);
            queue.drain(..excess);
            self.dropped += excess;
        }
    }

    /// Removes every entry naming a released or rewritten cube.
    pub fn purge_stale(&mut self, arena: &CubeArena) {
        for queue in &mut self.queues {
            queue.retain(|&(first, second)| arena.is_live(first) && arena.is_live(second));
        }
        self.retired = 0;
    }

    fn push(
        &mut self,
        arena: &CubeArena,
        pair: (CubeHandle, CubeHandle),
        distance: Distance,
        overflow: Overflow,
    ) -> Result<bool, ExorcismError> {
        let queue = &mut self.queues[distance.index()];
        if queue.len() >= self.capacity {
            queue.retain(|&(first, second)| arena.is_live(first) && arena.is_live(second));
        }
        if queue.len() >= self.capacity {
            return match overflow {
                Overflow::Fail => Err(ExorcismError::QueueCapacityExceeded {
                    distance,
                    capacity: self.capacity,
                    cube_count: arena.cover_len(),
                }),
                Overflow::Drop => {
                    trace!("{} queue full, dropping pair {:?}", distance, pair);
                    self.dropped += 1;
                    Ok(false)
                }
            };
        }
        queue.push_back(pair);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::packed::parse_cube;

    fn arena_with(cubes: &[(&str, &str)]) -> (CubeArena, Vec<CubeHandle>) {
        let (input_len, output_len) = (cubes[0].0.len(), cubes[0].1.len());
        let mut arena = CubeArena::allocate(input_len, output_len, cubes.len() + 2).unwrap();
        let handles = cubes
            .iter()
            .map(|(input, output)| {
                let handle = arena.acquire().unwrap();
                arena.write(handle, parse_cube(input, output));
                arena.push_back(handle);
                handle
            })
            .collect();
        (arena, handles)
    }

    #[test]
    fn test_register_classifies_pairs() {
        let (arena, handles) = arena_with(&[
            ("0000", "10"),
            ("0011", "10"), // distance 2 from 0
            ("0111", "11"), // distance 4 from 0, distance 2 from 1
            ("1111", "01"), // outputs disjoint from 0 and 1
        ]);
        let mut queues = AdjacencyQueues::new(16, arena.capacity());
        for &handle in &handles {
            queues
                .register_cube(&arena, handle, Overflow::Fail)
                .unwrap();
        }
        assert!(handles.iter().all(|&handle| queues.is_registered(handle)));

        let mut queues_copy = queues.clone();
        let two = queues_copy.drain(&arena, Distance::Two);
        assert_eq!(
            two.iter()
                .map(|pair| (pair.first.slot(), pair.second.slot()))
                .collect::<Vec<_>>(),
            vec![(0, 1), (1, 2), (2, 3)],
            "pairs are ordered (older, newer) in registration order"
        );
        assert!(queues_copy.drain(&arena, Distance::Three).is_empty());
        let four = queues_copy.drain(&arena, Distance::Four);
        assert_eq!(four.len(), 1);
        assert_eq!((four[0].first.slot(), four[0].second.slot()), (0, 2));
        assert!(queues_copy.is_empty());
    }

    #[test]
    fn test_stale_pairs_are_skipped() {
        let (mut arena, handles) = arena_with(&[("00", "1"), ("11", "1"), ("01", "1")]);
        let mut queues = AdjacencyQueues::new(16, arena.capacity());
        for &handle in &handles {
            queues
                .register_cube(&arena, handle, Overflow::Fail)
                .unwrap();
        }
        assert_eq!(queues.len(Distance::Two), 1);

        arena.release(handles[1]);
        queues.unregister_cube(&arena, handles[1]);
        assert!(!queues.is_registered(handles[1]));
        assert!(queues.drain(&arena, Distance::Two).is_empty());
    }

    #[test]
    fn test_overflow() {
        let (mut arena, handles) = arena_with(&[("00", "1"), ("11", "1"), ("--", "1")]);
        let mut queues = AdjacencyQueues::new(1, arena.capacity());
        for &handle in &handles[..2] {
            queues
                .register_cube(&arena, handle, Overflow::Fail)
                .unwrap();
        }
        assert_eq!(queues.len(Distance::Two), 1);

        let err = queues
            .register_cube(&arena, handles[2], Overflow::Fail)
            .unwrap_err();
        assert!(matches!(
            err,
            ExorcismError::QueueCapacityExceeded {
                distance: Distance::Two,
                capacity: 1,
                cube_count: 3,
            }
        ));

        assert_eq!(
            queues
                .register_cube(&arena, handles[2], Overflow::Drop)
                .unwrap(),
            0
        );
        assert_eq!(queues.dropped(), 2);

        // Retiring a cube frees room on the next push.
        arena.release(handles[0]);
        queues.unregister_cube(&arena, handles[0]);
        assert_eq!(
            queues
                .register_cube(&arena, handles[2], Overflow::Drop)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_restore_keeps_age_order() {
        let (arena, handles) = arena_with(&[("000", "1"), ("011", "1"), ("110", "1")]);
        let mut queues = AdjacencyQueues::new(16, arena.capacity());
        for &handle in &handles[..2] {
            queues
                .register_cube(&arena, handle, Overflow::Fail)
                .unwrap();
        }
        let drained = queues.drain(&arena, Distance::Two);
        assert_eq!(drained.len(), 1);

        queues
            .register_cube(&arena, handles[2], Overflow::Fail)
            .unwrap();
        queues.restore(&arena, Distance::Two, drained.clone());
        let again = queues.drain(&arena, Distance::Two);
        assert_eq!(again[0], drained[0]);
        assert_eq!(again.len(), 3);
    }

    #[test]
    fn test_restore_overflow_drops_oldest() {
        let (arena, handles) = arena_with(&[("000", "1"), ("011", "1"), ("110", "1")]);
        let mut queues = AdjacencyQueues::new(2, arena.capacity());
        for &handle in &handles[..2] {
            queues
                .register_cube(&arena, handle, Overflow::Fail)
                .unwrap();
        }
        let drained = queues.drain(&arena, Distance::Two);
        assert_eq!(drained.len(), 1);

        queues
            .register_cube(&arena, handles[2], Overflow::Fail)
            .unwrap();
        assert_eq!(queues.len(Distance::Two), 2);

        queues.restore(&arena, Distance::Two, drained.clone());
        assert_eq!(queues.dropped(), 1);
        let kept = queues.drain(&arena, Distance::Two);
        assert_eq!(kept.len(), 2);
        assert!(!kept.contains(&drained[0]), "the restored pair is the oldest");
        assert!(kept
            .iter()
            .all(|pair| pair.first == handles[2] || pair.second == handles[2]));
    }
}
