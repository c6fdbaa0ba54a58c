// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{config::MinimizerConfig, cover::Cover, cube::Cube};
use proptest::prelude::*;
use std::array;

impl<const IL: usize, const OL: usize> Arbitrary for Cube<IL, OL> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        // Generate IL input values and OL output values.
        let input_strategy = prop::collection::vec(any::<Option<bool>>(), IL);
        let output_strategy = prop::collection::vec(any::<bool>(), OL);
        (input_strategy, output_strategy)
            .prop_map(|(input_vec, output_vec)| Self {
                input: array::from_fn(|ix| input_vec[ix]),
                output: array::from_fn(|ix| output_vec[ix]),
            })
            .boxed()
    }
}

impl<const IL: usize, const OL: usize> Arbitrary for Cover<IL, OL> {
    /// Minimum and maximum cube count.
    type Parameters = Option<(usize, usize)>;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(params: Self::Parameters) -> Self::Strategy {
        let (min_size, max_size) = params.unwrap_or((0, IL * OL * IL));
        // Duplicate cubes are meaningful in an ESOP, so generate a list rather than a set.
        prop::collection::vec(any::<Cube<IL, OL>>(), min_size..=max_size)
            .prop_map(Self::new)
            .boxed()
    }
}

impl Arbitrary for MinimizerConfig {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0u32..4, any::<bool>(), 1usize..8, 1usize..4)
            .prop_map(|(quality, decrease_literals, improvement_sweeps, cleanup_rounds)| {
                MinimizerConfig::new()
                    .with_quality(quality)
                    .with_decrease_literals(decrease_literals)
                    .with_improvement_sweeps(improvement_sweeps)
                    .with_cleanup_rounds(cleanup_rounds)
            })
            .boxed()
    }
}
