// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod caches;
mod cover_impl;
mod display;

pub use caches::ColumnUse;
pub use cover_impl::*;
pub use display::*;
