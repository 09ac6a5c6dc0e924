// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cleanup pipeline: turns an arbitrary captcha image into a clean
// black-on-white binary image for the recognizer.
//
//   bytes -> decode -> flatten alpha -> binarize (inverted) -> remove lines
//         -> filter noise -> repair (closing) -> finalize (invert back)

pub mod binarize;
pub mod lines;
pub mod morphology;
pub mod noise;

use capsolve_core::config::PipelineConfig;
use capsolve_core::error::{CapsolveError, Result};
use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument};

use crate::image::decode::{decode_image, flatten_alpha};
use binarize::{binarize_inverted, foreground_count, to_intensity};
use lines::remove_horizontal_lines;
use morphology::{StructuringElement, close, invert};
use noise::filter_noise;

/// Close small gaps in strokes with a `kernel x kernel` square.
pub fn repair_shapes(mask: &GrayImage, kernel: u32) -> GrayImage {
    close(mask, &StructuringElement::square(kernel))
}

/// Flip the mask back to dark ink on a light background.
pub fn finalize(mask: &GrayImage) -> GrayImage {
    invert(mask)
}

/// Working state of the cleanup pipeline.
///
/// Each stage consumes `self` and returns the next state, so stages chain:
///
/// ```ignore
/// let cleaned = CaptchaCleaner::from_bytes(&png, PipelineConfig::default())?
///     .binarize()
///     .remove_lines()
///     .remove_noise()
///     .repair()
///     .finalize()
///     .into_mask()?;
/// ```
pub struct CaptchaCleaner {
    /// Colour image until binarization, binary mask afterwards.
    stage: Stage,
    config: PipelineConfig,
}

enum Stage {
    Color(DynamicImage),
    Mask(GrayImage),
}

impl CaptchaCleaner {
    // -- Construction ---------------------------------------------------------

    /// Decode raw image bytes.
    pub fn from_bytes(data: &[u8], config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let image = decode_image(data)?;
        Ok(Self::from_dynamic(image, config))
    }

    /// Wrap an already-decoded image.
    pub fn from_dynamic(image: DynamicImage, config: PipelineConfig) -> Self {
        Self {
            stage: Stage::Color(image),
            config,
        }
    }

    // -- Stages ---------------------------------------------------------------

    /// Composite transparency onto white, leaving a 3-channel image.
    pub fn flatten_alpha(self) -> Self {
        match self.stage {
            Stage::Color(image) => Self {
                stage: Stage::Color(DynamicImage::ImageRgb8(flatten_alpha(&image))),
                config: self.config,
            },
            Stage::Mask(_) => self,
        }
    }

    /// Luminance + inverted threshold. Ink becomes 255.
    ///
    /// Flattens alpha first if that has not happened yet.
    pub fn binarize(self) -> Self {
        let rgb = match self.stage {
            Stage::Color(image) => flatten_alpha(&image),
            Stage::Mask(_) => return self,
        };
        let mask = binarize_inverted(&to_intensity(&rgb), self.config.threshold);
        debug!(
            threshold = self.config.threshold,
            foreground = foreground_count(&mask),
            "Binarized"
        );
        Self {
            stage: Stage::Mask(mask),
            config: self.config,
        }
    }

    /// Subtract horizontal rule lines.
    pub fn remove_lines(self) -> Self {
        let (width, iterations) = (self.config.line_kernel_width, self.config.line_iterations);
        self.map_mask(|mask| remove_horizontal_lines(mask, width, iterations), "Lines removed")
    }

    /// Drop regions at or below the minimum area.
    pub fn remove_noise(self) -> Self {
        let min_area = self.config.min_region_area;
        self.map_mask(|mask| filter_noise(mask, min_area), "Noise removed")
    }

    /// Morphological closing to reconnect broken strokes.
    pub fn repair(self) -> Self {
        let kernel = self.config.repair_kernel;
        self.map_mask(|mask| repair_shapes(mask, kernel), "Strokes repaired")
    }

    /// Invert to dark ink on white.
    pub fn finalize(self) -> Self {
        self.map_mask(finalize, "Finalized")
    }

    // -- Accessors ------------------------------------------------------------

    /// Return the binary mask.
    ///
    /// # Errors
    ///
    /// Returns [`CapsolveError::Pipeline`] if [`binarize`](Self::binarize) was
    /// never run.
    pub fn into_mask(self) -> Result<GrayImage> {
        match self.stage {
            Stage::Mask(mask) => Ok(mask),
            Stage::Color(_) => Err(CapsolveError::Pipeline(
                "image was never binarized".into(),
            )),
        }
    }

    fn map_mask(self, op: impl FnOnce(&GrayImage) -> GrayImage, label: &'static str) -> Self {
        let binarized = self.binarize();
        let Stage::Mask(mask) = &binarized.stage else {
            return binarized;
        };
        let next = op(mask);
        debug!(foreground = foreground_count(&next), "{}", label);
        Self {
            stage: Stage::Mask(next),
            config: binarized.config,
        }
    }
}

/// Run the full cleanup pipeline over raw image bytes.
///
/// # Errors
///
/// [`CapsolveError::Decode`] when the bytes are not an image,
/// [`CapsolveError::Config`] when `config` is invalid.
#[instrument(skip(data, config), fields(data_len = data.len()))]
pub fn preprocess(data: &[u8], config: &PipelineConfig) -> Result<GrayImage> {
    let cleaned = CaptchaCleaner::from_bytes(data, config.clone())?
        .flatten_alpha()
        .binarize()
        .remove_lines()
        .remove_noise()
        .repair()
        .finalize()
        .into_mask()?;

    info!(
        width = cleaned.width(),
        height = cleaned.height(),
        "Captcha preprocessed"
    );
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// White canvas with dark 6x10 "glyphs" spaced along a row.
    fn clean_glyphs() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 20, Luma([255]));
        for glyph in 0..4u32 {
            let x0 = 5 + glyph * 14;
            for y in 5..15 {
                for x in x0..x0 + 6 {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn clean_text_round_trips() {
        let original = clean_glyphs();
        let png = encode_png(&DynamicImage::ImageLuma8(original.clone()));

        let cleaned = preprocess(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(cleaned, original);
    }

    #[test]
    fn glyph_on_left_edge_and_its_neighbour_survive() {
        let mut img = GrayImage::from_pixel(60, 20, Luma([255]));
        for y in 5..15 {
            for x in (0..6).chain(20..26) {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        let png = encode_png(&DynamicImage::ImageLuma8(img.clone()));

        let cleaned = preprocess(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(cleaned, img);
    }

    #[test]
    fn rule_line_and_speckles_are_removed() {
        let mut img = clean_glyphs();
        // Rule line across the top margin and some isolated specks.
        for x in 0..60 {
            img.put_pixel(x, 2, Luma([10]));
        }
        img.put_pixel(2, 17, Luma([0]));
        img.put_pixel(50, 18, Luma([0]));
        img.put_pixel(51, 18, Luma([0]));

        let png = encode_png(&DynamicImage::ImageLuma8(img));
        let cleaned = preprocess(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(cleaned, clean_glyphs());
    }

    #[test]
    fn transparent_background_is_treated_as_white() {
        let mut rgba = RgbaImage::from_pixel(60, 20, Rgba([0, 0, 0, 0]));
        for y in 5..15 {
            for x in 5..11 {
                rgba.put_pixel(x, y, Rgba([20, 20, 20, 255]));
            }
        }
        let png = encode_png(&DynamicImage::ImageRgba8(rgba));
        let cleaned = preprocess(&png, &PipelineConfig::default()).unwrap();

        assert_eq!(cleaned.get_pixel(0, 0).0[0], 255);
        assert_eq!(cleaned.get_pixel(7, 9).0[0], 0);
        assert_eq!(foreground_count(&invert(&cleaned)), 60);
    }

    #[test]
    fn output_is_strictly_binary() {
        let mut img = GrayImage::new(40, 30);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Luma([((x * 7 + y * 13) % 256) as u8]);
        }
        let png = encode_png(&DynamicImage::ImageLuma8(img));
        let cleaned = preprocess(&png, &PipelineConfig::default()).unwrap();
        assert!(cleaned.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let err = preprocess(b"\x89PNG but not really", &PipelineConfig::default()).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let cfg = PipelineConfig {
            repair_kernel: 0,
            ..Default::default()
        };
        let err = preprocess(b"garbage", &cfg).unwrap_err();
        assert!(matches!(err, CapsolveError::Config(_)));
    }

    #[test]
    fn unbinarized_cleaner_has_no_mask() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        let result = CaptchaCleaner::from_dynamic(img, PipelineConfig::default()).into_mask();
        assert!(matches!(result, Err(CapsolveError::Pipeline(_))));
    }

    #[test]
    fn stages_after_binarize_binarize_implicitly() {
        let img = DynamicImage::ImageLuma8(clean_glyphs());
        let mask = CaptchaCleaner::from_dynamic(img, PipelineConfig::default())
            .remove_noise()
            .into_mask()
            .unwrap();
        assert_eq!(foreground_count(&mask), 4 * 60);
    }
}
