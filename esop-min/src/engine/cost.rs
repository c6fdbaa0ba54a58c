// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

/// Size of a cover. Compares cube count first, then literal count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost {
    pub cubes: usize,
    pub literals: usize,
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} cubes, {} literals", self.cubes, self.literals)
    }
}

/// Reduction in cost. Positive values are improvements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Gain {
    pub cubes: isize,
    pub literals: isize,
}

impl Gain {
    pub const ZERO: Gain = Gain {
        cubes: 0,
        literals: 0,
    };

    /// Returns the gain of going from `before` to `after`.
    pub fn between(before: Cost, after: Cost) -> Self {
        Self {
            cubes: before.cubes as isize - after.cubes as isize,
            literals: before.literals as isize - after.literals as isize,
        }
    }

    /// True if the cube count dropped, or it held and the literal count dropped.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.cubes > 0 || (self.cubes == 0 && self.literals > 0)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Add for Gain {
    type Output = Gain;

    fn add(self, rhs: Self) -> Self::Output {
        Gain {
            cubes: self.cubes + rhs.cubes,
            literals: self.literals + rhs.literals,
        }
    }
}

impl AddAssign for Gain {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Gain {
    fn sum<I: Iterator<Item = Gain>>(iter: I) -> Self {
        iter.fold(Gain::ZERO, Add::add)
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:+} cubes, {:+} literals", -self.cubes, -self.literals)
    }
}

/// The cost component that governs whether a rewrite is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Cube count first, literal count second.
    Cubes,
    /// Literal count first, cube count second. The cube count is never allowed to grow.
    Literals,
}

/// Acceptance policy for one ExorLink sweep.
///
/// A rewrite is accepted when it strictly improves the primary metric. With `accept_on_tie`, a
/// rewrite that leaves the primary metric unchanged is accepted if it strictly improves the
/// secondary one. Rewrites that change neither metric are never accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LinkMode {
    /// Accept a primary-metric tie when the secondary metric improves.
    pub accept_on_tie: bool,
    pub metric: Metric,
    /// Allow rewrites of pairs whose output masks differ.
    pub cross_output: bool,
}

impl LinkMode {
    /// Strict cube-count improvement, same-output pairs only.
    pub const STRICT: LinkMode = LinkMode {
        accept_on_tie: false,
        metric: Metric::Cubes,
        cross_output: false,
    };

    pub const fn with_accept_on_tie(mut self, accept_on_tie: bool) -> Self {
        self.accept_on_tie = accept_on_tie;
        self
    }

    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub const fn with_cross_output(mut self, cross_output: bool) -> Self {
        self.cross_output = cross_output;
        self
    }

    /// Orders gains under this mode's metric, best last.
    #[inline]
    pub fn rank(self, gain: Gain) -> (isize, isize) {
        match self.metric {
            Metric::Cubes => (gain.cubes, gain.literals),
            Metric::Literals => (gain.literals, gain.cubes),
        }
    }

    pub fn accepts(self, gain: Gain) -> bool {
        if self.metric == Metric::Literals && gain.cubes < 0 {
            return false;
        }
        match self.rank(gain) {
            (primary, _) if primary > 0 => true,
            (0, secondary) => self.accept_on_tie && secondary > 0,
            _ => false,
        }
    }
}

impl Default for LinkMode {
    fn default() -> Self {
        Self::STRICT
    }
}
