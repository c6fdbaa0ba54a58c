// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exclusive-or sum-of-products minimization.
//!
//! A [`cover::Cover`] is an ESOP: every output is the XOR of the product terms that feed it.
//! [`cover::Cover::minimize`] rewrites a cover into a logically equivalent one with fewer cubes
//! and then fewer literals, using the iterative ExorLink engine in [`engine`].

pub mod config;
pub mod cover;
pub mod cube;
pub mod engine;
pub mod errors;
#[cfg(any(test, feature = "proptest1"))]
mod proptest_helpers;
