// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line remover: strips long horizontal rule lines drawn across captchas
// without touching glyph strokes.

use image::GrayImage;
use tracing::debug;

use super::binarize::foreground_count;
use super::morphology::{StructuringElement, open, subtract};

/// Isolate horizontal runs at least `kernel_width` pixels long by opening the
/// mask with a `kernel_width x 1` element, `iterations` times in succession.
pub fn detect_horizontal_lines(mask: &GrayImage, kernel_width: u32, iterations: u32) -> GrayImage {
    let element = StructuringElement::rect(kernel_width, 1);
    let mut detected = mask.clone();
    for _ in 0..iterations.max(1) {
        detected = open(&detected, &element);
    }
    detected
}

/// Remove the runs found by [`detect_horizontal_lines`] from `mask`.
///
/// Glyphs are rarely `kernel_width` pixels wide in a single row, so only the
/// rule lines are subtracted.
pub fn remove_horizontal_lines(mask: &GrayImage, kernel_width: u32, iterations: u32) -> GrayImage {
    let lines = detect_horizontal_lines(mask, kernel_width, iterations);
    let line_pixels = foreground_count(&lines);
    debug!(kernel_width, iterations, line_pixels, "Horizontal lines detected");
    subtract(mask, &lines)
}
