// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bit-packed cube storage.
//!
//! Every input variable occupies a 2-bit field holding the set of values the variable may take:
//!
//! | code | literal      |
//! |------|--------------|
//! | `01` | `x'` (0)     |
//! | `10` | `x` (1)      |
//! | `11` | absent (`-`) |
//! | `00` | void         |
//!
//! With this encoding the XOR of two distinct literal functions of the same variable is the
//! bitwise XOR of their codes, which is what makes the ExorLink substitutions cheap. The output
//! mask is one bit per output and is treated as a single multi-valued position.

use arrayvec::ArrayVec;
use bitvec::prelude::*;
use std::fmt;

/// Width of a storage word in bits.
pub const WORD_BITS: usize = u32::BITS as usize;
/// Number of 2-bit input fields per storage word.
pub const FIELDS_PER_WORD: usize = WORD_BITS / 2;
/// Largest pair distance handled by ExorLink.
pub const MAX_LINK_DISTANCE: usize = 4;

pub(crate) const NEGATIVE: u8 = 0b01;
pub(crate) const POSITIVE: u8 = 0b10;
pub(crate) const ABSENT: u8 = 0b11;

// Low bit of every 2-bit field.
const FIELD_LOW_BITS: u32 = 0x5555_5555;

/// The input fields of a cube, used to look up cubes by their inputs.
pub type InputKey = BitVec<u32, Lsb0>;

/// A position in which two cubes can differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkPosition {
    Input(usize),
    Output,
}

/// A runtime-width cube: packed input fields plus an output mask.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedCube {
    input: BitVec<u32, Lsb0>,
    output: BitVec<u32, Lsb0>,
}

impl PackedCube {
    /// Returns a cube with all storage zeroed (every input field void, no outputs).
    pub fn zeroed(input_len: usize, output_len: usize) -> Self {
        Self {
            input: BitVec::repeat(false, 2 * input_len),
            output: BitVec::repeat(false, output_len),
        }
    }

    /// Returns the cube with every input absent and no outputs set.
    pub fn universe(input_len: usize, output_len: usize) -> Self {
        Self {
            input: BitVec::repeat(true, 2 * input_len),
            output: BitVec::repeat(false, output_len),
        }
    }

    /// Builds a cube from literal and output iterators.
    ///
    /// Returns `Err((part, actual))` if either iterator yields the wrong number of values.
    pub fn from_parts(
        input_len: usize,
        output_len: usize,
        inputs: impl IntoIterator<Item = Option<bool>>,
        outputs: impl IntoIterator<Item = bool>,
    ) -> Result<Self, (crate::errors::CubePart, usize)> {
        use crate::errors::CubePart;

        let mut cube = Self::universe(input_len, output_len);
        let mut seen = 0;
        for literal in inputs {
            if seen < input_len {
                cube.set_literal(seen, literal);
            }
            seen += 1;
        }
        if seen != input_len {
            return Err((CubePart::Input, seen));
        }

        let mut seen = 0;
        for value in outputs {
            if seen < output_len {
                cube.output.set(seen, value);
            }
            seen += 1;
        }
        if seen != output_len {
            return Err((CubePart::Output, seen));
        }

        Ok(cube)
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input.len() / 2
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// Returns the `(word_index, bit_offset)` address of an input field.
    #[inline]
    pub fn field_address(var: usize) -> (usize, usize) {
        (var / FIELDS_PER_WORD, (var % FIELDS_PER_WORD) * 2)
    }

    #[inline]
    fn field_start(var: usize) -> usize {
        let (word, offset) = Self::field_address(var);
        word * WORD_BITS + offset
    }

    #[inline]
    pub(crate) fn code(&self, var: usize) -> u8 {
        let start = Self::field_start(var);
        self.input[start..start + 2].load_le::<u8>()
    }

    #[inline]
    pub(crate) fn set_code(&mut self, var: usize, code: u8) {
        let start = Self::field_start(var);
        self.input[start..start + 2].store_le(code & 0b11);
    }

    #[inline]
    pub fn input_key(&self) -> InputKey {
        self.input.clone()
    }

    /// Returns the input keys of every cube whose inputs differ from this one's in exactly one
    /// field: two per input variable.
    pub fn adjacent_input_keys(&self) -> impl Iterator<Item = InputKey> + '_ {
        (0..self.input_len()).flat_map(move |var| {
            let code = self.code(var);
            let start = Self::field_start(var);
            [NEGATIVE, POSITIVE, ABSENT]
                .into_iter()
                .filter(move |&other| other != code)
                .map(move |other| {
                    let mut key = self.input.clone();
                    key[start..start + 2].store_le(other);
                    key
                })
        })
    }

    pub fn literal(&self, var: usize) -> Option<bool> {
        match self.code(var) {
            NEGATIVE => Some(false),
            POSITIVE => Some(true),
            ABSENT => None,
            _ => unreachable!("input field {} is void", var),
        }
    }

    pub fn set_literal(&mut self, var: usize, literal: Option<bool>) {
        let code = match literal {
            Some(false) => NEGATIVE,
            Some(true) => POSITIVE,
            None => ABSENT,
        };
        self.set_code(var, code);
    }

    #[inline]
    pub fn output(&self, output_ix: usize) -> bool {
        self.output[output_ix]
    }

    #[inline]
    pub fn set_output(&mut self, output_ix: usize, value: bool) {
        self.output.set(output_ix, value);
    }

    pub fn literals(&self) -> impl Iterator<Item = Option<bool>> + '_ {
        (0..self.input_len()).map(move |var| self.literal(var))
    }

    pub fn outputs(&self) -> impl Iterator<Item = bool> + '_ {
        self.output.iter().by_vals()
    }

    /// Returns input storage word `ix` with bits past the last field cleared.
    #[inline]
    fn input_word(&self, ix: usize) -> u32 {
        let words = self.input.as_raw_slice();
        let live_bits = self.input.len() - ix * WORD_BITS;
        if live_bits >= WORD_BITS {
            words[ix]
        } else {
            words[ix] & ((1_u32 << live_bits) - 1)
        }
    }

    #[inline]
    fn input_word_count(&self) -> usize {
        (self.input.len() + WORD_BITS - 1) / WORD_BITS
    }

    /// Number of inputs that appear as a literal.
    pub fn literal_count(&self) -> usize {
        let absent: usize = (0..self.input_word_count())
            .map(|ix| {
                let word = self.input_word(ix);
                (word & (word >> 1) & FIELD_LOW_BITS).count_ones() as usize
            })
            .sum();
        self.input_len() - absent
    }

    /// Number of outputs this cube is XORed into.
    #[inline]
    pub fn output_weight(&self) -> usize {
        self.output.count_ones()
    }

    /// Number of input fields in which `self` and `other` differ.
    pub fn input_distance(&self, other: &Self) -> usize {
        debug_assert_eq!(self.input.len(), other.input.len());
        (0..self.input_word_count())
            .map(|ix| {
                let diff = self.input_word(ix) ^ other.input_word(ix);
                ((diff | (diff >> 1)) & FIELD_LOW_BITS).count_ones() as usize
            })
            .sum()
    }

    #[inline]
    pub fn outputs_equal(&self, other: &Self) -> bool {
        self.output == other.output
    }

    /// Returns true if some output is set in both cubes.
    pub fn outputs_overlap(&self, other: &Self) -> bool {
        self.output.iter_ones().any(|ix| other.output[ix])
    }

    /// Input distance plus one if the output masks differ.
    #[inline]
    pub fn distance(&self, other: &Self) -> usize {
        self.input_distance(other) + usize::from(!self.outputs_equal(other))
    }

    /// Returns the positions in which `self` and `other` differ, inputs first, or `None` if
    /// there are more than [`MAX_LINK_DISTANCE`] of them.
    pub fn link_positions(
        &self,
        other: &Self,
    ) -> Option<ArrayVec<LinkPosition, MAX_LINK_DISTANCE>> {
        let mut positions = ArrayVec::new();
        for ix in 0..self.input_word_count() {
            let diff = self.input_word(ix) ^ other.input_word(ix);
            let mut fields = (diff | (diff >> 1)) & FIELD_LOW_BITS;
            while fields != 0 {
                let bit = fields.trailing_zeros() as usize;
                positions
                    .try_push(LinkPosition::Input(ix * FIELDS_PER_WORD + bit / 2))
                    .ok()?;
                fields &= fields - 1;
            }
        }
        if !self.outputs_equal(other) {
            positions.try_push(LinkPosition::Output).ok()?;
        }
        Some(positions)
    }

    /// Copies the value at `position` from `source`.
    pub fn copy_position(&mut self, position: LinkPosition, source: &Self) {
        match position {
            LinkPosition::Input(var) => self.set_code(var, source.code(var)),
            LinkPosition::Output => self.output.copy_from_bitslice(&source.output),
        }
    }

    /// XORs the value at `position` of `other` into `self`.
    ///
    /// For two distinct literals of the same variable this yields the third one; for output
    /// masks it is the symmetric difference.
    pub fn xor_position(&mut self, position: LinkPosition, other: &Self) {
        match position {
            LinkPosition::Input(var) => {
                let code = self.code(var) ^ other.code(var);
                self.set_code(var, code);
            }
            LinkPosition::Output => {
                for ix in other.output.iter_ones() {
                    let value = self.output[ix];
                    self.output.set(ix, !value);
                }
            }
        }
    }

    /// Returns true if the input part of this cube contains the given assignment.
    pub fn contains_assignment(&self, values: &[bool]) -> bool {
        values
            .iter()
            .enumerate()
            .all(|(var, &value)| self.code(var) & (1 << u8::from(value)) != 0)
    }
}

impl fmt::Debug for PackedCube {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for var in 0..self.input_len() {
            let ch = match self.code(var) {
                NEGATIVE => '0',
                POSITIVE => '1',
                ABSENT => '-',
                _ => '~',
            };
            write!(f, "{}", ch)?;
        }
        write!(f, " ")?;
        for value in self.outputs() {
            write!(f, "{}", if value { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn parse_cube(input: &str, output: &str) -> PackedCube {
    let inputs = input.chars().map(|ch| match ch {
        '0' => Some(false),
        '1' => Some(true),
        '-' => None,
        _ => panic!("invalid input char {:?}", ch),
    });
    let outputs = output.chars().map(|ch| ch == '1');
    PackedCube::from_parts(input.len(), output.len(), inputs, outputs)
        .expect("widths match the strings")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_address() {
        assert_eq!(PackedCube::field_address(0), (0, 0));
        assert_eq!(PackedCube::field_address(15), (0, 30));
        assert_eq!(PackedCube::field_address(16), (1, 0));
        assert_eq!(PackedCube::field_address(21), (1, 10));
    }

    #[test]
    fn test_zeroed_is_void() {
        let cube = PackedCube::zeroed(20, 3);
        assert!((0..20).all(|var| cube.code(var) == 0));
        assert_eq!(cube.output_weight(), 0);
        // Void fields are not absent.
        assert_eq!(cube.literal_count(), 20);
    }

    #[test]
    fn test_literals_round_trip() {
        let mut cube = PackedCube::universe(18, 2);
        cube.set_literal(0, Some(true));
        cube.set_literal(16, Some(false));
        cube.set_literal(17, Some(true));
        cube.set_output(1, true);

        assert_eq!(cube.literal(0), Some(true));
        assert_eq!(cube.literal(1), None);
        assert_eq!(cube.literal(16), Some(false));
        assert_eq!(cube.literal(17), Some(true));
        assert_eq!(cube.literal_count(), 3);
        assert_eq!(cube.output_weight(), 1);
        assert_eq!(format!("{:?}", cube), "1---------------01 01");
    }

    #[test]
    fn test_distance() {
        let a = parse_cube("01-1", "10");
        let b = parse_cube("00-0", "10");
        let c = parse_cube("00-0", "11");
        assert_eq!(a.input_distance(&b), 2);
        assert_eq!(a.distance(&b), 2);
        assert_eq!(a.distance(&c), 3);
        assert!(a.outputs_overlap(&c));
        assert!(!a.outputs_overlap(&parse_cube("01-1", "01")));

        let positions = a.link_positions(&c).unwrap();
        assert_eq!(
            positions.as_slice(),
            &[
                LinkPosition::Input(1),
                LinkPosition::Input(3),
                LinkPosition::Output
            ]
        );
        assert!(parse_cube("00000", "1")
            .link_positions(&parse_cube("11111", "1"))
            .is_none());
    }

    #[test]
    fn test_distance_across_words() {
        let mut a = PackedCube::universe(40, 1);
        let mut b = PackedCube::universe(40, 1);
        a.set_literal(3, Some(true));
        b.set_literal(3, Some(true));
        a.set_literal(39, Some(false));
        b.set_literal(20, Some(true));
        assert_eq!(a.input_distance(&b), 2);
        assert_eq!(
            a.link_positions(&b).unwrap().as_slice(),
            &[LinkPosition::Input(20), LinkPosition::Input(39)]
        );
    }

    #[test]
    fn test_adjacent_input_keys() {
        let cube = parse_cube("0-1", "1");
        let keys: Vec<_> = cube.adjacent_input_keys().collect();
        assert_eq!(keys.len(), 6);
        assert!(!keys.contains(&cube.input_key()));
        for key in keys {
            let mut neighbor = cube.clone();
            neighbor.input = key;
            assert_eq!(neighbor.input_distance(&cube), 1, "{:?}", neighbor);
        }
    }

    #[test]
    fn test_xor_position() {
        let neg = parse_cube("0", "1");
        let pos = parse_cube("1", "1");
        let absent = parse_cube("-", "1");

        let mut cube = neg.clone();
        cube.xor_position(LinkPosition::Input(0), &pos);
        assert_eq!(cube, absent, "x' xor x = 1");

        let mut cube = pos.clone();
        cube.xor_position(LinkPosition::Input(0), &absent);
        assert_eq!(cube, neg, "x xor 1 = x'");

        let mut cube = parse_cube("1", "110");
        cube.xor_position(LinkPosition::Output, &parse_cube("1", "011"));
        assert_eq!(cube, parse_cube("1", "101"));
    }

    #[test]
    fn test_contains_assignment() {
        let cube = parse_cube("1-0", "1");
        assert!(cube.contains_assignment(&[true, false, false]));
        assert!(cube.contains_assignment(&[true, true, false]));
        assert!(!cube.contains_assignment(&[false, true, false]));
        assert!(!cube.contains_assignment(&[true, true, true]));
    }
}
