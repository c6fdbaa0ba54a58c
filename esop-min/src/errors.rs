// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::engine::Distance;
use thiserror::Error;

/// A numeric cube representation contained a value outside the Espresso book encoding.
///
/// Inputs must be `0`, `1` or `2` and outputs must be `3` or `4`.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("invalid numeric cube value")]
pub struct InvalidCubeNumeric;

/// Fatal conditions that abort a minimization run.
///
/// None of these are retried by the engine. Each carries the counts and limits involved so that
/// the caller can decide whether to re-run with a larger configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExorcismError {
    #[error("cube arena exhausted: all {capacity} slots are in use")]
    OutOfCubes { capacity: usize },

    #[error(
        "adjacency queue for {distance} overflowed its capacity of {capacity} pairs \
         while seeding {cube_count} cubes"
    )]
    QueueCapacityExceeded {
        distance: Distance,
        capacity: usize,
        cube_count: usize,
    },

    #[error("starting cover has {count} cubes, which exceeds the limit of {limit}")]
    StartingCoverTooLarge { count: usize, limit: usize },

    #[error("starting cube {index} has {actual} {part} values, expected {expected}")]
    WidthMismatch {
        index: usize,
        part: CubePart,
        actual: usize,
        expected: usize,
    },

    #[error("invalid minimizer configuration: {0}")]
    InvalidConfig(&'static str),
}

/// The half of a cube a [`ExorcismError::WidthMismatch`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubePart {
    Input,
    Output,
}

impl std::fmt::Display for CubePart {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}
