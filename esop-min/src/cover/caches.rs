// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{cube::Cube, engine::Cost};
use once_cell::sync::OnceCell;
use std::marker::PhantomData;

/// Cache for cover data.
#[derive(Clone, Debug, Default)]
pub(super) struct CoverCache<const IL: usize, const OL: usize> {
    summary: OnceCell<CoverSummary<IL>>,
    _marker: PhantomData<[(); OL]>,
}

impl<const IL: usize, const OL: usize> CoverCache<IL, OL> {
    pub(super) fn invalidate(&mut self) {
        self.summary = OnceCell::new();
    }

    pub(super) fn get_or_init_summary(&self, elements: &[Cube<IL, OL>]) -> &CoverSummary<IL> {
        self.summary.get_or_init(|| CoverSummary::new(elements))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct CoverSummary<const IL: usize> {
    pub(super) cost: Cost,
    pub(super) columns: [ColumnUse; IL],
    pub(super) meaningful_input_count: usize,
}

impl<const IL: usize> CoverSummary<IL> {
    fn new<const OL: usize>(elements: &[Cube<IL, OL>]) -> Self {
        let mut columns = [ColumnUse::Unused; IL];
        let mut literals = 0;

        for element in elements {
            for (column, &literal) in columns.iter_mut().zip(&element.input) {
                *column = column.with(literal);
            }
            literals += element.literal_count();
        }

        let meaningful_input_count = columns.iter().filter(|c| c.is_meaningful()).count();
        Self {
            cost: Cost {
                cubes: elements.len(),
                literals,
            },
            columns,
            meaningful_input_count,
        }
    }
}

/// How an input variable appears across the cubes of a cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnUse {
    /// The variable appears in no cube (or the cover is empty).
    Unused,
    /// Only as `x'`.
    Negative,
    /// Only as `x`.
    Positive,
    /// Both as `x` and as `x'`.
    Mixed,
}

impl ColumnUse {
    fn with(self, literal: Option<bool>) -> Self {
        match (self, literal) {
            (column, None) => column,
            (Self::Unused | Self::Negative, Some(false)) => Self::Negative,
            (Self::Unused | Self::Positive, Some(true)) => Self::Positive,
            _ => Self::Mixed,
        }
    }

    /// Returns true if the cover's value can depend on this input.
    #[inline]
    pub fn is_meaningful(self) -> bool {
        !matches!(self, Self::Unused)
    }
}
