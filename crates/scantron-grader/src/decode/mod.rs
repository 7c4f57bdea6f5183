// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble decoding: contour classification, grid mapping and the card reader
// that drives both.

pub mod grid;
pub mod hierarchy;
pub mod reader;

pub use grid::{GridDecode, decode, decode_grouped_bar, decode_single_group};
pub use hierarchy::{Classification, boxes_larger_than, classify, classify_where};
pub use reader::{CardReader, CardReading};
