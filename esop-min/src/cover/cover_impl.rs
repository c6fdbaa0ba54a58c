// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::MinimizerConfig,
    cover::{CoverAlgebraicDisplay, CoverMatrixDisplay},
    cube::Cube,
    engine::{Cost, Exorcism, MinimizeSummary},
    errors::{ExorcismError, InvalidCubeNumeric},
};

use super::caches::{ColumnUse, CoverCache, CoverSummary};

/// An exclusive-or sum of products.
///
/// Each output is the XOR of the input parts of the cubes that feed it. Cube order carries no
/// meaning, but unlike a sum of products the same cube may appear twice (and then cancels out),
/// so the cubes are kept in a list rather than a set.
#[derive(Clone, Default)]
pub struct Cover<const IL: usize, const OL: usize> {
    elements: Vec<Cube<IL, OL>>,
    cache: CoverCache<IL, OL>,
}

impl<const IL: usize, const OL: usize> Cover<IL, OL> {
    pub const INPUT_LEN: usize = IL;
    pub const OUTPUT_LEN: usize = OL;

    pub fn new(elements: impl IntoIterator<Item = Cube<IL, OL>>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            cache: CoverCache::default(),
        }
    }

    pub fn from_numeric(
        numeric: impl IntoIterator<Item = ([u8; IL], [u8; OL])>,
    ) -> Result<Self, InvalidCubeNumeric> {
        let elements: Vec<_> = numeric
            .into_iter()
            .map(|(input, output)| Cube::from_numeric(input, output))
            .collect::<Result<_, _>>()?;
        Ok(Self::new(elements))
    }

    /// Copies the current cover out of a minimizer.
    ///
    /// Panics if the minimizer's widths differ from `IL` and `OL`.
    pub fn from_exorcism(exorcism: &Exorcism) -> Self {
        Self::new(exorcism.cubes().map(Cube::from_cube_ref))
    }

    #[inline]
    pub fn cube_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn literal_count(&self) -> usize {
        self.summary().cost.literals
    }

    /// Cube count and literal count.
    #[inline]
    pub fn cost(&self) -> Cost {
        self.summary().cost
    }

    #[inline]
    pub fn meaningful_input_count(&self) -> usize {
        self.summary().meaningful_input_count
    }

    #[inline]
    pub fn meaningful_input_ixs(&self) -> impl Iterator<Item = usize> + '_ {
        self.summary()
            .columns
            .iter()
            .enumerate()
            .filter_map(|(ix, column)| column.is_meaningful().then(|| ix))
    }

    pub fn column_use(&self, input_ix: usize) -> ColumnUse {
        assert!(
            input_ix < IL,
            "input ix {} must be in range 0..{}",
            input_ix,
            IL
        );
        self.summary().columns[input_ix]
    }

    #[inline]
    pub fn elements(&self) -> &[Cube<IL, OL>] {
        &self.elements
    }

    #[inline]
    pub fn elements_mut(&mut self) -> &mut Vec<Cube<IL, OL>> {
        self.cache.invalidate();
        &mut self.elements
    }

    #[inline]
    pub fn into_elements(self) -> Vec<Cube<IL, OL>> {
        self.elements
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn matrix_display(&self) -> CoverMatrixDisplay<'_, IL, OL> {
        CoverMatrixDisplay::new(self)
    }

    #[inline]
    pub fn algebraic_display(&self) -> CoverAlgebraicDisplay<'_, IL, OL> {
        CoverAlgebraicDisplay::new(self)
    }

    /// Returns the input parts of the cubes feeding output `output_ix`.
    pub fn output_component(&self, output_ix: usize) -> impl Iterator<Item = Cube<IL, 0>> + '_ {
        assert!(
            output_ix < OL,
            "output ix {} must be in range 0..{}",
            output_ix,
            OL
        );
        self.elements
            .iter()
            .filter_map(move |elem| elem.output[output_ix].then(|| elem.as_input_cube()))
    }

    /// Returns the value of every output for the given input values.
    pub fn evaluate(&self, values: &[bool; IL]) -> [bool; OL] {
        let mut res = [false; OL];
        for elem in &self.elements {
            for (out, contribution) in res.iter_mut().zip(elem.contribution(values)) {
                *out ^= contribution;
            }
        }
        res
    }

    /// Checks that `self` and `other` compute the same function.
    ///
    /// Inputs that appear in neither cover cannot affect the result, so only assignments to the
    /// meaningful inputs of either cover are enumerated. Returns the first assignment on which
    /// the covers differ.
    pub fn check_logically_equivalent(&self, other: &Self) -> Result<(), [bool; IL]> {
        let meaningful_ixs: Vec<_> = (0..IL)
            .filter(|&ix| {
                self.column_use(ix).is_meaningful() || other.column_use(ix).is_meaningful()
            })
            .collect();
        assert!(
            meaningful_ixs.len() < u64::BITS as usize,
            "too many meaningful inputs ({}) to enumerate",
            meaningful_ixs.len()
        );

        for input_bits in 0..1_u64 << meaningful_ixs.len() {
            let mut values = [false; IL];
            for (bit, &input_ix) in meaningful_ixs.iter().enumerate() {
                values[input_ix] = (input_bits >> bit) & 1 == 1;
            }
            if self.evaluate(&values) != other.evaluate(&values) {
                return Err(values);
            }
        }
        Ok(())
    }

    /// Returns a cover computing the same function with as few cubes, then literals, as the
    /// minimizer finds.
    pub fn minimize(&self, config: &MinimizerConfig) -> Result<Self, ExorcismError> {
        self.minimize_with_summary(config)
            .map(|(cover, _)| cover)
    }

    /// Like [`Self::minimize`], also returning the run's [`MinimizeSummary`].
    pub fn minimize_with_summary(
        &self,
        config: &MinimizerConfig,
    ) -> Result<(Self, MinimizeSummary), ExorcismError> {
        let mut exorcism = Exorcism::new(
            IL,
            OL,
            self.elements.iter().map(|elem| (elem.input, elem.output)),
            config.clone(),
        )?;
        let summary = exorcism.minimize()?;
        Ok((Self::from_exorcism(&exorcism), summary))
    }

    fn summary(&self) -> &CoverSummary<IL> {
        self.cache.get_or_init_summary(&self.elements)
    }
}

/// Covers compare as multisets of cubes.
impl<const IL: usize, const OL: usize> PartialEq for Cover<IL, OL> {
    fn eq(&self, other: &Self) -> bool {
        if self.elements.len() != other.elements.len() {
            return false;
        }
        let mut a: Vec<_> = self.elements.iter().collect();
        let mut b: Vec<_> = other.elements.iter().collect();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl<const IL: usize, const OL: usize> Eq for Cover<IL, OL> {}

impl<const IL: usize, const OL: usize> FromIterator<Cube<IL, OL>> for Cover<IL, OL> {
    fn from_iter<T: IntoIterator<Item = Cube<IL, OL>>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_log::test;

    #[test]
    fn test_evaluate_is_parity() {
        // a ⊕ ab ⊕ b
        let cover = Cover::from_numeric([([1, 2], [4]), ([1, 1], [4]), ([2, 1], [4])]).unwrap();
        assert_eq!(cover.evaluate(&[false, false]), [false]);
        assert_eq!(cover.evaluate(&[true, false]), [true]);
        assert_eq!(cover.evaluate(&[false, true]), [true]);
        assert_eq!(cover.evaluate(&[true, true]), [true]);
        assert_eq!(
            cover.cost(),
            Cost {
                cubes: 3,
                literals: 4
            }
        );
    }

    #[test]
    fn test_duplicate_cubes_cancel() {
        let cover = Cover::from_numeric([([1, 0, 2], [4, 3]), ([1, 0, 2], [4, 3])]).unwrap();
        assert_eq!(cover.cube_count(), 2);
        assert_eq!(cover.check_logically_equivalent(&Cover::new([])), Ok(()));
        assert_eq!(cover.minimize(&MinimizerConfig::new()).unwrap(), Cover::new([]));
    }

    #[test]
    fn test_check_logically_equivalent() {
        let xor = Cover::from_numeric([([1, 0, 2], [4]), ([0, 1, 2], [4])]).unwrap();
        let xor2 = Cover::from_numeric([([1, 2, 2], [4]), ([2, 1, 2], [4])]).unwrap();
        let or = Cover::from_numeric([([1, 2, 2], [4]), ([0, 1, 2], [4])]).unwrap();
        assert_eq!(xor.check_logically_equivalent(&xor2), Ok(()));
        assert_eq!(
            xor.check_logically_equivalent(&or),
            Err([true, true, false])
        );
        assert_eq!(xor.meaningful_input_count(), 2);
        assert_eq!(xor.column_use(0), ColumnUse::Mixed);
        assert_eq!(or.column_use(1), ColumnUse::Positive);
        assert_eq!(or.column_use(2), ColumnUse::Unused);
    }

    #[test]
    fn test_elements_mut_invalidates_cache() {
        let mut cover = Cover::from_numeric([([1, 0], [4])]).unwrap();
        assert_eq!(cover.literal_count(), 2);
        cover
            .elements_mut()
            .push(Cube::from_numeric([2, 2], [4]).unwrap());
        assert_eq!(
            cover.cost(),
            Cost {
                cubes: 2,
                literals: 2
            }
        );
    }

    #[test]
    fn test_minimize_xor() {
        // The two minterms of a ⊕ b become two single-literal cubes.
        let cover = Cover::from_numeric([([1, 0], [4]), ([0, 1], [4])]).unwrap();
        let (minimized, summary) = cover
            .minimize_with_summary(&MinimizerConfig::new())
            .unwrap();
        assert_eq!(
            minimized.cost(),
            Cost {
                cubes: 2,
                literals: 2
            }
        );
        assert_eq!(summary.final_cost, minimized.cost());
        assert!(summary.stats.rewrites[0] >= 1);
        assert_eq!(minimized.check_logically_equivalent(&cover), Ok(()));
    }

    #[test]
    fn test_minimize_full_adder() {
        // Sum and carry of a full adder, as minterms.
        let cover = Cover::from_numeric([
            ([1, 0, 0], [4, 3]),
            ([0, 1, 0], [4, 3]),
            ([0, 0, 1], [4, 3]),
            ([1, 1, 1], [4, 4]),
            ([1, 1, 0], [3, 4]),
            ([1, 0, 1], [3, 4]),
            ([0, 1, 1], [3, 4]),
        ])
        .unwrap();
        let minimized = cover
            .minimize(&MinimizerConfig::new().with_quality(2))
            .unwrap();
        assert_eq!(minimized.check_logically_equivalent(&cover), Ok(()));
        assert!(
            minimized.cost() < cover.cost(),
            "minimized cover:\n{}",
            minimized.matrix_display()
        );
    }

    proptest! {
        #[test]
        fn proptest_minimize_equivalent(
            cover in any::<Cover<5, 3>>(),
            config in any::<MinimizerConfig>(),
        ) {
            let minimized = cover.minimize(&config).unwrap();
            prop_assert_eq!(minimized.check_logically_equivalent(&cover), Ok(()));
            prop_assert!(minimized.cost() <= cover.cost());
        }

        #[test]
        fn proptest_cover_roundtrip_through_exorcism(cover in any::<Cover<4, 2>>()) {
            // Seeding alone folds duplicates and neighbors but never changes the function.
            let exorcism = Exorcism::new(
                4,
                2,
                cover.elements().iter().map(|elem| (elem.input, elem.output)),
                MinimizerConfig::new(),
            )
            .unwrap();
            let seeded = Cover::from_exorcism(&exorcism);
            prop_assert_eq!(seeded.check_logically_equivalent(&cover), Ok(()));
            prop_assert_eq!(seeded.cost(), exorcism.cost());
        }
    }
}
