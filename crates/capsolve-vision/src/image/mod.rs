// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding raw bytes and flattening transparency onto white.

pub mod decode;

pub use decode::{decode_image, flatten_alpha};
