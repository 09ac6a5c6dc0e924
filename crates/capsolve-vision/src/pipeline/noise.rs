// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Noise filter: drops speckles by the area of the region they belong to,
// then redraws the survivors onto a fresh canvas.
//
// Regions are the outermost contours of the mask (an outer border with no
// parent hole). A region's area is the polygon area enclosed by its traced
// border, so single pixels and 1-pixel-wide strokes have area 0 and a 2x2
// block has area 1. Survivors are drawn as their filled shape: the
// 8-connected foreground plus any holes it encloses.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::contour_area;
use tracing::debug;

use super::binarize::{BACKGROUND, FOREGROUND};

/// One external connected region of a binary mask.
#[derive(Debug, Clone)]
pub struct Region {
    /// Every pixel of the filled shape.
    pub pixels: Vec<(u32, u32)>,
    area: f64,
}

impl Region {
    /// Polygon area enclosed by the region's outer border.
    pub fn area(&self) -> f64 {
        self.area
    }
}

/// Find every external region of `mask`.
pub fn find_regions(mask: &GrayImage) -> Vec<Region> {
    let (width, height) = mask.dimensions();
    let solid = fill_enclosed(mask);
    let mut visited = vec![false; width as usize * height as usize];
    let mut regions = Vec::new();

    // Border following only opens an outer border on a background-to-ink
    // transition, so ink in column 0 needs a background column before it.
    for contour in find_contours::<u32>(&pad_with_background(mask)) {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let Some(seed) = contour.points.first() else {
            continue;
        };
        let (x, y) = (seed.x - 1, seed.y - 1);
        let idx = y as usize * width as usize + x as usize;
        if visited[idx] {
            continue;
        }
        let pixels = collect_component(&solid, &mut visited, x, y);
        regions.push(Region {
            pixels,
            area: contour_area(&contour.points),
        });
    }

    regions
}

/// Keep only regions whose area is strictly greater than `min_area`, drawn
/// filled onto a zeroed mask of the same size.
///
/// Detection runs to completion before anything is drawn, so overlapping or
/// adjacent regions never influence each other.
pub fn filter_noise(mask: &GrayImage, min_area: u32) -> GrayImage {
    let regions = find_regions(mask);
    let total = regions.len();

    let mut output = GrayImage::new(mask.width(), mask.height());
    let mut kept = 0usize;
    for region in regions.iter().filter(|r| r.area() > f64::from(min_area)) {
        for &(x, y) in &region.pixels {
            output.put_pixel(x, y, Luma([FOREGROUND]));
        }
        kept += 1;
    }

    debug!(regions = total, kept, dropped = total - kept, min_area, "Noise regions filtered");
    output
}

/// `mask` surrounded by a 1-pixel background frame.
fn pad_with_background(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Mark every pixel that is not reachable from the image border through
/// 4-connected background. The result is the foreground with its holes
/// filled.
fn fill_enclosed(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }
    let mut exterior = vec![false; width as usize * height as usize];
    let mut stack = Vec::new();

    let is_background = |x: u32, y: u32| mask.get_pixel(x, y).0[0] == BACKGROUND;

    for x in 0..width {
        stack.push((x, 0));
        stack.push((x, height - 1));
    }
    for y in 0..height {
        stack.push((0, y));
        stack.push((width - 1, y));
    }

    while let Some((x, y)) = stack.pop() {
        let idx = y as usize * width as usize + x as usize;
        if exterior[idx] || !is_background(x, y) {
            continue;
        }
        exterior[idx] = true;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        if exterior[y as usize * width as usize + x as usize] {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    })
}

/// Gather the 8-connected foreground component of `solid` containing the
/// seed.
fn collect_component(
    solid: &GrayImage,
    visited: &mut [bool],
    seed_x: u32,
    seed_y: u32,
) -> Vec<(u32, u32)> {
    let (width, height) = solid.dimensions();
    let mut pixels = Vec::new();
    let mut stack = vec![(seed_x, seed_y)];

    while let Some((x, y)) = stack.pop() {
        let idx = y as usize * width as usize + x as usize;
        if visited[idx] || solid.get_pixel(x, y).0[0] != FOREGROUND {
            continue;
        }
        visited[idx] = true;
        pixels.push((x, y));

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                    stack.push((nx as u32, ny as u32));
                }
            }
        }
    }

    pixels
}
