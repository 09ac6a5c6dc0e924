// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoder and alpha flattener. Turns raw encoded bytes into a pixel grid and
// composites any transparency onto an opaque white canvas.

use capsolve_core::error::{CapsolveError, Result};
use image::{DynamicImage, Rgb, RgbImage};
use tracing::{debug, instrument};

/// Decode raw encoded bytes (PNG, JPEG, GIF, BMP, ...) into a pixel grid.
///
/// The channel layout is kept as decoded: grayscale, RGB, or RGBA.
///
/// # Errors
///
/// Returns [`CapsolveError::Decode`] for empty input, bytes in no supported
/// format, truncated or corrupt data, and images with a zero dimension.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    if data.is_empty() {
        return Err(CapsolveError::Decode("image data is empty".into()));
    }

    let image = image::load_from_memory(data)
        .map_err(|err| CapsolveError::Decode(format!("failed to decode image: {}", err)))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(CapsolveError::Decode(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }

    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Image decoded from bytes"
    );
    Ok(image)
}

/// Composite an image with transparency onto solid white.
///
/// For every pixel `out = a * fg + (1 - a) * 255` with `a = alpha / 255`,
/// truncated to `u8`. Images without an alpha channel are only converted to
/// three channels.
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut output = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let blend = |fg: u8| (alpha * fg as f32 + (1.0 - alpha) * 255.0) as u8;
        output.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    debug!(width, height, "Alpha channel flattened onto white");
    output
}
