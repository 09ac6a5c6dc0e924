// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarizer: luminance conversion and fixed global thresholding.

use image::{GrayImage, Luma, RgbImage};

/// Foreground (ink) value of a binary mask.
pub const FOREGROUND: u8 = 255;

/// Background value of a binary mask.
pub const BACKGROUND: u8 = 0;

/// Convert to single-channel intensity, `Y = 0.299 R + 0.587 G + 0.114 B`.
///
/// Uses 14-bit fixed point with rounding so the result is reproducible
/// bit-for-bit across platforms.
pub fn to_intensity(rgb: &RgbImage) -> GrayImage {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const SHIFT: u32 = 14;

    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let y_val = (r as u32 * R_WEIGHT
            + g as u32 * G_WEIGHT
            + b as u32 * B_WEIGHT
            + (1 << (SHIFT - 1)))
            >> SHIFT;
        gray.put_pixel(x, y, Luma([y_val.min(255) as u8]));
    }
    gray
}

/// Inverted global threshold: intensities strictly below `threshold` become
/// [`FOREGROUND`], everything else [`BACKGROUND`].
pub fn binarize_inverted(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel.0[0] < threshold {
            FOREGROUND
        } else {
            BACKGROUND
        };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

/// Number of foreground pixels in a mask.
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] == FOREGROUND).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn intensity_of_primaries() {
        let mut rgb = RgbImage::new(5, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 255]));
        rgb.put_pixel(3, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(4, 0, Rgb([0, 0, 0]));

        let gray = to_intensity(&rgb);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
        assert_eq!(gray.get_pixel(3, 0).0[0], 255);
        assert_eq!(gray.get_pixel(4, 0).0[0], 0);
    }

    #[test]
    fn threshold_boundary_is_strict() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, Luma([127]));
        gray.put_pixel(1, 0, Luma([128]));
        gray.put_pixel(2, 0, Luma([129]));

        let mask = binarize_inverted(&gray, 128);
        assert_eq!(mask.get_pixel(0, 0).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(1, 0).0[0], BACKGROUND);
        assert_eq!(mask.get_pixel(2, 0).0[0], BACKGROUND);
    }

    #[test]
    fn output_is_strictly_binary() {
        let mut gray = GrayImage::new(16, 16);
        for (x, y, p) in gray.enumerate_pixels_mut() {
            *p = Luma([(x * 16 + y) as u8]);
        }
        let mask = binarize_inverted(&gray, 128);
        assert!(mask.pixels().all(|p| p.0[0] == FOREGROUND || p.0[0] == BACKGROUND));
        assert_eq!(foreground_count(&mask), 128);
    }
}
