// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectangular binary morphology: erosion, dilation, opening, closing, plus
// the pixel-wise subtract and invert used around them.
//
// Erosion and dilation run on imageproc's mask-based grayscale operators.
// The line remover needs a wide, 1-pixel-tall rectangle anchored at
// (width / 2, height / 2), which the norm-shaped `erode`/`dilate` helpers
// cannot express.

use capsolve_core::config::MAX_KERNEL_SIDE;
use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

/// An all-ones rectangular structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    anchor_x: u32,
    anchor_y: u32,
}

impl StructuringElement {
    /// A `width x height` rectangle anchored at its centre (rounded down for
    /// even sizes). Sides are clamped to `1..=MAX_KERNEL_SIDE`.
    pub fn rect(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_KERNEL_SIDE);
        let height = height.clamp(1, MAX_KERNEL_SIDE);
        Self {
            width,
            height,
            anchor_x: width / 2,
            anchor_y: height / 2,
        }
    }

    /// A `side x side` square.
    pub fn square(side: u32) -> Self {
        Self::rect(side, side)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The rectangle as an imageproc mask centred on `(center_x, center_y)`.
    fn footprint(&self, center_x: u32, center_y: u32) -> Mask {
        let ones = GrayImage::from_pixel(self.width, self.height, Luma([u8::MAX]));
        // Sides are at most 511, so both centres fit in a u8.
        Mask::from_image(&ones, center_x as u8, center_y as u8)
    }
}

/// Erosion: each pixel becomes the minimum over the element's footprint.
/// Positions outside the image are ignored.
pub fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(image, &element.footprint(element.anchor_x, element.anchor_y))
}

/// Dilation: each pixel becomes the maximum over the reflected footprint.
/// Positions outside the image are ignored.
///
/// Reflecting keeps `dilate(erode(x))` inside the original foreground for
/// elements with an even side, so an opening never grows a shape.
pub fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    let reflected = element.footprint(
        element.width - 1 - element.anchor_x,
        element.height - 1 - element.anchor_y,
    );
    grayscale_dilate(image, &reflected)
}

/// Opening: erosion followed by dilation. Removes everything the element
/// does not fit inside.
pub fn open(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(image, element), element)
}

/// Closing: dilation followed by erosion. Bridges gaps narrower than the
/// element.
pub fn close(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(image, element), element)
}

/// Pixel-wise `a - b`, clamped at zero.
///
/// # Panics
///
/// Panics if the two images differ in size.
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    assert_eq!(a.dimensions(), b.dimensions(), "subtract: size mismatch");
    let mut output = a.clone();
    for (out, sub) in output.pixels_mut().zip(b.pixels()) {
        out.0[0] = out.0[0].saturating_sub(sub.0[0]);
    }
    output
}

/// Bitwise complement of every pixel.
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = !pixel.0[0];
    }
    output
}
