// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF operations — single-page generation from captured images and ordered
// multi-file concatenation.

pub mod merge;
pub mod page;
