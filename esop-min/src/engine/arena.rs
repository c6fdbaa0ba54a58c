// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-capacity cube storage.
//!
//! All cubes of one run live in a pool of slots allocated up front. Slots are named by
//! generational [`CubeHandle`]s: releasing a slot or rewriting its cube in place bumps the
//! generation, so any handle taken before that point (for example one sitting in an adjacency
//! queue) is recognizably stale. Live cubes that belong to the cover are threaded through an
//! intrusive doubly-linked ring of slot indices, and indexed by their input fields so that
//! cubes within distance one of a given cube can be found without walking the ring.

use crate::{
    engine::{
        packed::{InputKey, PackedCube},
        Cost,
    },
    errors::ExorcismError,
};
use std::collections::{hash_map::Entry, HashMap};

/// Names one generation of one arena slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CubeHandle {
    slot: u32,
    generation: u32,
}

impl CubeHandle {
    #[inline]
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug)]
struct CubeRecord {
    enabled: bool,
    id: u8,
    generation: u32,
    literal_count: u16,
    output_weight: u16,
    linked: bool,
    prev: Option<u32>,
    next: Option<u32>,
    cube: PackedCube,
}

impl CubeRecord {
    fn vacant(generation: u32, input_len: usize, output_len: usize) -> Self {
        Self {
            enabled: false,
            id: 0,
            generation,
            literal_count: 0,
            output_weight: 0,
            linked: false,
            prev: None,
            next: None,
            cube: PackedCube::zeroed(input_len, output_len),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CubeArena {
    input_len: usize,
    output_len: usize,
    records: Vec<CubeRecord>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    active_count: usize,
    linked_count: usize,
    linked_literals: usize,
    // Slots of linked cubes, keyed by input fields.
    by_input: HashMap<InputKey, Vec<u32>>,
    last_id: u8,
}

impl CubeArena {
    /// Allocates an arena with room for `max_cubes` cubes of the given widths.
    pub fn allocate(
        input_len: usize,
        output_len: usize,
        max_cubes: usize,
    ) -> Result<Self, ExorcismError> {
        if input_len > usize::from(u16::MAX) || output_len > usize::from(u16::MAX) {
            return Err(ExorcismError::InvalidConfig(
                "cubes are limited to 65535 inputs and 65535 outputs",
            ));
        }
        if max_cubes > u32::MAX as usize {
            return Err(ExorcismError::InvalidConfig(
                "arena capacity must fit in 32 bits",
            ));
        }

        let records = (0..max_cubes)
            .map(|_| CubeRecord::vacant(0, input_len, output_len))
            .collect();
        // Pop from the back so that slot 0 is handed out first.
        let free = (0..max_cubes as u32).rev().collect();

        Ok(Self {
            input_len,
            output_len,
            records,
            free,
            head: None,
            tail: None,
            active_count: 0,
            linked_count: 0,
            linked_literals: 0,
            by_input: HashMap::new(),
            last_id: 0,
        })
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Number of acquired (not free) slots.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of cubes in the ring, i.e. in the cover.
    #[inline]
    pub fn cover_len(&self) -> usize {
        self.linked_count
    }

    /// Total literal count of the cubes in the ring.
    #[inline]
    pub fn total_literals(&self) -> usize {
        self.linked_literals
    }

    #[inline]
    pub fn cost(&self) -> Cost {
        Cost {
            cubes: self.linked_count,
            literals: self.linked_literals,
        }
    }

    /// Hands out a free slot holding a freshly zeroed cube.
    pub fn acquire(&mut self) -> Result<CubeHandle, ExorcismError> {
        let slot = self.free.pop().ok_or(ExorcismError::OutOfCubes {
            capacity: self.capacity(),
        })?;

        let id = self.next_id();
        let record = &mut self.records[slot as usize];
        let generation = record.generation;
        *record = CubeRecord::vacant(generation, self.input_len, self.output_len);
        record.enabled = true;
        record.id = id;
        self.active_count += 1;
        self.check_invariant();

        Ok(CubeHandle { slot, generation })
    }

    /// Unlinks the cube if necessary, zeroes its slot and returns it to the free list.
    ///
    /// Releasing a stale handle is a no-op and returns false.
    pub fn release(&mut self, handle: CubeHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        if self.records[handle.slot()].linked {
            self.unlink(handle);
        }

        let record = &mut self.records[handle.slot()];
        *record = CubeRecord::vacant(
            record.generation.wrapping_add(1),
            self.input_len,
            self.output_len,
        );
        self.free.push(handle.slot);
        self.active_count -= 1;
        self.check_invariant();
        true
    }

    #[inline]
    pub fn is_live(&self, handle: CubeHandle) -> bool {
        self.records
            .get(handle.slot())
            .map_or(false, |record| {
                record.enabled && record.generation == handle.generation
            })
    }

    #[inline]
    pub fn is_linked(&self, handle: CubeHandle) -> bool {
        self.is_live(handle) && self.records[handle.slot()].linked
    }

    pub fn get(&self, handle: CubeHandle) -> Option<&PackedCube> {
        self.is_live(handle)
            .then(|| &self.records[handle.slot()].cube)
    }

    /// Returns the cube behind a live handle.
    ///
    /// Panics if the handle is stale.
    pub fn cube(&self, handle: CubeHandle) -> &PackedCube {
        self.get(handle)
            .unwrap_or_else(|| panic!("stale cube handle {:?}", handle))
    }

    pub fn id(&self, handle: CubeHandle) -> u8 {
        self.live_record(handle).id
    }

    pub fn literal_count(&self, handle: CubeHandle) -> usize {
        usize::from(self.live_record(handle).literal_count)
    }

    pub fn output_weight(&self, handle: CubeHandle) -> usize {
        usize::from(self.live_record(handle).output_weight)
    }

    pub fn literal(&self, handle: CubeHandle, var: usize) -> Option<bool> {
        self.cube(handle).literal(var)
    }

    pub fn output(&self, handle: CubeHandle, output_ix: usize) -> bool {
        self.cube(handle).output(output_ix)
    }

    pub fn set_literal(&mut self, handle: CubeHandle, var: usize, literal: Option<bool>) {
        let mut cube = self.cube(handle).clone();
        cube.set_literal(var, literal);
        self.write(handle, cube);
    }

    pub fn set_output(&mut self, handle: CubeHandle, output_ix: usize, value: bool) {
        let mut cube = self.cube(handle).clone();
        cube.set_output(output_ix, value);
        self.write(handle, cube);
    }

    /// Replaces the cube behind `handle`, keeping its handle and ring position.
    pub fn write(&mut self, handle: CubeHandle, cube: PackedCube) {
        debug_assert_eq!(cube.input_len(), self.input_len);
        debug_assert_eq!(cube.output_len(), self.output_len);

        let literal_count = cube.literal_count();
        let linked = self.live_record(handle).linked;
        if linked {
            self.unindex(handle.slot);
        }

        let record = self.live_record_mut(handle);
        let old_literals = usize::from(record.literal_count);
        record.literal_count = literal_count as u16;
        record.output_weight = cube.output_weight() as u16;
        record.cube = cube;

        if linked {
            self.linked_literals = self.linked_literals - old_literals + literal_count;
            self.index(handle.slot);
        }
    }

    /// Replaces the cube behind `handle` and returns a new handle for it.
    ///
    /// The old handle becomes stale, which retires every queue entry taken for the old cube.
    pub fn rewrite(&mut self, handle: CubeHandle, cube: PackedCube) -> CubeHandle {
        self.write(handle, cube);
        let id = self.next_id();
        let record = self.live_record_mut(handle);
        record.generation = record.generation.wrapping_add(1);
        record.id = id;
        CubeHandle {
            slot: handle.slot,
            generation: record.generation,
        }
    }

    /// Links `handle` into the ring after `after`, or at the front if `after` is `None`.
    pub fn splice_in(&mut self, handle: CubeHandle, after: Option<CubeHandle>) {
        assert!(
            !self.is_linked(handle) && self.is_live(handle),
            "only live, unlinked cubes can be spliced in"
        );
        let slot = handle.slot;
        let next = match after {
            Some(after) => {
                assert!(self.is_linked(after), "splice anchor must be in the ring");
                let next = self.records[after.slot()].next;
                self.records[after.slot()].next = Some(slot);
                next
            }
            None => {
                let next = self.head;
                self.head = Some(slot);
                next
            }
        };
        match next {
            Some(next) => self.records[next as usize].prev = Some(slot),
            None => self.tail = Some(slot),
        }

        let record = &mut self.records[slot as usize];
        record.prev = after.map(|after| after.slot);
        record.next = next;
        record.linked = true;
        self.linked_count += 1;
        self.linked_literals += usize::from(record.literal_count);
        self.index(slot);
    }

    /// Links `handle` at the back of the ring.
    pub fn push_back(&mut self, handle: CubeHandle) {
        let after = self.tail.map(|slot| self.handle_at(slot));
        self.splice_in(handle, after);
    }

    /// Removes `handle` from the ring without releasing its slot.
    pub fn unlink(&mut self, handle: CubeHandle) {
        assert!(self.is_linked(handle), "only linked cubes can be unlinked");
        let record = &mut self.records[handle.slot()];
        let (prev, next) = (record.prev.take(), record.next.take());
        record.linked = false;
        let literals = usize::from(record.literal_count);

        match prev {
            Some(prev) => self.records[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.records[next as usize].prev = prev,
            None => self.tail = prev,
        }
        self.linked_count -= 1;
        self.linked_literals -= literals;
        self.unindex(handle.slot);
    }

    /// Walks the ring front to back.
    pub fn handles(&self) -> RingIter<'_> {
        RingIter {
            arena: self,
            next: self.head,
        }
    }

    /// Returns the linked cubes whose input fields equal `key`, in no particular order.
    pub fn linked_with_input<'a>(
        &'a self,
        key: &InputKey,
    ) -> impl Iterator<Item = CubeHandle> + 'a {
        self.by_input
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&slot| self.handle_at(slot))
    }

    fn index(&mut self, slot: u32) {
        let key = self.records[slot as usize].cube.input_key();
        self.by_input.entry(key).or_default().push(slot);
    }

    fn unindex(&mut self, slot: u32) {
        let key = self.records[slot as usize].cube.input_key();
        if let Entry::Occupied(mut entry) = self.by_input.entry(key) {
            entry.get_mut().retain(|&other| other != slot);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    #[inline]
    fn handle_at(&self, slot: u32) -> CubeHandle {
        CubeHandle {
            slot,
            generation: self.records[slot as usize].generation,
        }
    }

    fn next_id(&mut self) -> u8 {
        self.last_id = match self.last_id.wrapping_add(1) {
            0 => 1,
            id => id,
        };
        self.last_id
    }

    fn live_record(&self, handle: CubeHandle) -> &CubeRecord {
        assert!(self.is_live(handle), "stale cube handle {:?}", handle);
        &self.records[handle.slot()]
    }

    fn live_record_mut(&mut self, handle: CubeHandle) -> &mut CubeRecord {
        assert!(self.is_live(handle), "stale cube handle {:?}", handle);
        &mut self.records[handle.slot()]
    }

    #[inline]
    fn check_invariant(&self) {
        debug_assert_eq!(
            self.active_count + self.free.len(),
            self.capacity(),
            "active + free must equal capacity"
        );
    }
}

pub struct RingIter<'a> {
    arena: &'a CubeArena,
    next: Option<u32>,
}

impl<'a> Iterator for RingIter<'a> {
    type Item = CubeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.arena.records[slot as usize].next;
        Some(self.arena.handle_at(slot))
    }
}
