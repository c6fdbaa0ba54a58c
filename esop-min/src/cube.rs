// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    engine::CubeRef,
    errors::InvalidCubeNumeric,
};
use itertools::Itertools;
use std::{array, borrow::Cow, fmt};

/// A product term together with the set of outputs it feeds.
///
/// In an ESOP cover every output is the XOR of the input parts of the cubes whose output mask
/// contains it.
#[derive(Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Cube<const IL: usize, const OL: usize> {
    pub input: [Option<bool>; IL],
    pub output: [bool; OL],
}

impl<const IL: usize> Cube<IL, 0> {
    #[inline]
    pub fn new0(input: [Option<bool>; IL]) -> Self {
        Self { input, output: [] }
    }
}

impl<const IL: usize, const OL: usize> Cube<IL, OL> {
    pub const INPUT_LEN: usize = IL;
    pub const OUTPUT_LEN: usize = OL;

    #[inline]
    pub fn new(input: [Option<bool>; IL], output: [bool; OL]) -> Self {
        Self { input, output }
    }

    /// Builds a cube from the Espresso book codes: inputs `0`, `1` or `2` (absent), outputs `3`
    /// (off) or `4` (on).
    pub fn from_numeric(input: [u8; IL], output: [u8; OL]) -> Result<Self, InvalidCubeNumeric> {
        let mut cube = Self::new([None; IL], [false; OL]);
        for (literal, code) in cube.input.iter_mut().zip(input) {
            *literal = match code {
                0 => Some(false),
                1 => Some(true),
                2 => None,
                _ => return Err(InvalidCubeNumeric),
            };
        }
        for (bit, code) in cube.output.iter_mut().zip(output) {
            *bit = match code {
                3 => false,
                4 => true,
                _ => return Err(InvalidCubeNumeric),
            };
        }
        Ok(cube)
    }

    /// The constant-one cube feeding only `output_ix`.
    pub fn universe(output_ix: usize) -> Self {
        assert!(output_ix < OL, "output ix {} must be in range 0..{}", output_ix, OL);
        Self::new([None; IL], array::from_fn(|ix| ix == output_ix))
    }

    /// The constant-one cube feeding every output.
    pub fn total_universe() -> Self {
        Self::new([None; IL], [true; OL])
    }

    #[inline]
    pub fn matrix_display(&self) -> CubeMatrixDisplay<'_, IL, OL> {
        CubeMatrixDisplay::new(self)
    }

    #[inline]
    pub fn algebraic_display(&self) -> CubeAlgebraicDisplay<'_, IL, OL> {
        CubeAlgebraicDisplay::new(self)
    }

    /// Number of inputs that appear as a literal.
    pub fn literal_count(&self) -> usize {
        self.input.iter().filter(|c| c.is_some()).count()
    }

    /// Number of outputs this cube feeds.
    pub fn output_weight(&self) -> usize {
        self.output.iter().filter(|&&c| c).count()
    }

    /// Returns true if the input part evaluates to true for `values`.
    pub fn contains_input(&self, values: &[bool; IL]) -> bool {
        self.input
            .iter()
            .zip(values)
            .all(|(literal, value)| literal.map_or(true, |literal| literal == *value))
    }

    /// Returns what this cube XORs into each output for the given input values.
    pub fn contribution(&self, values: &[bool; IL]) -> [bool; OL] {
        if self.contains_input(values) {
            self.output
        } else {
            [false; OL]
        }
    }

    /// Number of inputs that differ, plus one if the output masks differ.
    ///
    /// Two cubes at distance 0 cancel each other, and two cubes at distance 1 can always be
    /// replaced by one.
    ///
    /// # Examples
    ///
    /// ```
    /// use esop_min::cube::Cube;
    ///
    /// let cube1 = Cube::from_numeric([0, 1, 2], [4, 3]).unwrap();
    /// let cube2 = Cube::from_numeric([1, 1, 0], [4, 3]).unwrap();
    /// let cube3 = Cube::from_numeric([1, 1, 0], [4, 4]).unwrap();
    ///
    /// assert_eq!(cube1.distance(&cube1), 0);
    /// assert_eq!(cube1.distance(&cube2), 2);
    /// assert_eq!(cube1.distance(&cube3), 3);
    /// ```
    pub fn distance(&self, other: &Cube<IL, OL>) -> usize {
        let input_distance = self
            .input
            .iter()
            .zip(&other.input)
            .filter(|(c, d)| c != d)
            .count();
        input_distance + usize::from(self.output != other.output)
    }

    pub(crate) fn as_input_cube(&self) -> Cube<IL, 0> {
        Cube::new0(self.input)
    }

    /// Copies a cube out of a minimizer's cover.
    ///
    /// Panics if the cover's widths differ from `IL` and `OL`.
    pub fn from_cube_ref(cube: CubeRef<'_>) -> Self {
        let packed = cube.packed();
        assert_eq!(
            (packed.input_len(), packed.output_len()),
            (IL, OL),
            "cube widths must match"
        );
        Self {
            input: array::from_fn(|var| cube.literal(var)),
            output: array::from_fn(|output_ix| cube.output(output_ix)),
        }
    }
}

pub struct CubeMatrixDisplay<'a, const IL: usize, const OL: usize> {
    cube: &'a Cube<IL, OL>,
    format: MatrixDisplayFormat,
    internal_separator: Cow<'a, str>,
    input_output_separator: Cow<'a, str>,
}

impl<'a, const IL: usize, const OL: usize> CubeMatrixDisplay<'a, IL, OL> {
    pub fn new(cube: &'a Cube<IL, OL>) -> Self {
        Self {
            cube,
            format: MatrixDisplayFormat::default(),
            internal_separator: Cow::Borrowed(""),
            input_output_separator: Cow::Borrowed(" "),
        }
    }

    pub fn with_format(mut self, format: MatrixDisplayFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_internal_separator(mut self, separator: impl Into<Cow<'a, str>>) -> Self {
        self.internal_separator = separator.into();
        self
    }

    pub fn with_input_output_separator(mut self, separator: impl Into<Cow<'a, str>>) -> Self {
        self.input_output_separator = separator.into();
        self
    }
}

impl<'a, const IL: usize, const OL: usize> fmt::Display for CubeMatrixDisplay<'a, IL, OL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let format = self.format;
        let separator = &*self.internal_separator;
        write!(
            f,
            "{}",
            self.cube
                .input
                .iter()
                .map(|&literal| format.char_for_input(literal))
                .format(separator)
        )?;
        if IL > 0 && OL > 0 {
            f.write_str(&self.input_output_separator)?;
        }
        write!(
            f,
            "{}",
            self.cube
                .output
                .iter()
                .map(|&bit| format.char_for_output(bit))
                .format(separator)
        )
    }
}

/// Character set for [`CubeMatrixDisplay`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatrixDisplayFormat {
    /// PLA layout: `10-1 101`.
    #[default]
    Dashes,

    /// Espresso book codes: `1021 434`.
    Numeric,
}

impl MatrixDisplayFormat {
    pub fn char_for_input(self, input: Option<bool>) -> char {
        match (input, self) {
            (Some(false), _) => '0',
            (Some(true), _) => '1',
            (None, Self::Dashes) => '-',
            (None, Self::Numeric) => '2',
        }
    }

    pub fn char_for_output(self, output: bool) -> char {
        let base = match self {
            Self::Dashes => b'0',
            Self::Numeric => b'3',
        };
        char::from(base + u8::from(output))
    }
}

/// Displays a cube as `AC: ab'`: the outputs it feeds, then its product term.
///
/// A product with no literals is written `1`.
pub struct CubeAlgebraicDisplay<'a, const IL: usize, const OL: usize> {
    cube: &'a Cube<IL, OL>,
}

impl<'a, const IL: usize, const OL: usize> CubeAlgebraicDisplay<'a, IL, OL> {
    pub fn new(cube: &'a Cube<IL, OL>) -> Self {
        Self { cube }
    }
}

impl<'a, const IL: usize, const OL: usize> fmt::Display for CubeAlgebraicDisplay<'a, IL, OL> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if OL != 0 {
            for output_ix in self.cube.output.iter().positions(|&bit| bit) {
                write!(f, "{}", AlgebraicSymbol::output(output_ix))?;
            }
            f.write_str(": ")?;
        }

        let mut literals = self
            .cube
            .input
            .iter()
            .enumerate()
            .filter_map(|(var, literal)| literal.map(|positive| (var, positive)))
            .peekable();
        if literals.peek().is_none() {
            return f.write_str("1");
        }
        for (var, positive) in literals {
            write!(f, "{}", AlgebraicSymbol::input(var))?;
            if !positive {
                f.write_str("'")?;
            }
        }
        Ok(())
    }
}

/// Name of a variable in algebraic output: inputs are `a`..`z`, then `ba`, `bb` and so on, and
/// outputs use the upper-case alphabet the same way.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AlgebraicSymbol {
    ix: usize,
    first_letter: u8,
}

impl AlgebraicSymbol {
    #[inline]
    pub(crate) fn input(input_ix: usize) -> Self {
        Self {
            ix: input_ix,
            first_letter: b'a',
        }
    }

    #[inline]
    pub(crate) fn output(output_ix: usize) -> Self {
        Self {
            ix: output_ix,
            first_letter: b'A',
        }
    }
}

impl fmt::Display for AlgebraicSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ix >= 26 {
            let prefix = Self {
                ix: self.ix / 26,
                ..*self
            };
            write!(f, "{}", prefix)?;
        }
        let letter = self.first_letter + (self.ix % 26) as u8;
        write!(f, "{}", char::from(letter))
    }
}
