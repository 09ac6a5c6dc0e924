// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the capsolve-vision cleanup pipeline. Runs the full
// preprocess (decode through finalize) on a synthetic captcha-sized PNG.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use capsolve_core::PipelineConfig;
use capsolve_vision::preprocess;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Build a 200x60 captcha-like image: six dark glyph blocks, a rule line
/// through the middle, and a sprinkling of single-pixel speckles.
fn synthetic_captcha() -> Vec<u8> {
    let (width, height) = (200u32, 60u32);
    let mut img = GrayImage::from_pixel(width, height, Luma([235u8]));

    for glyph in 0..6u32 {
        let x0 = 12 + glyph * 30;
        for y in 15..45 {
            for x in x0..x0 + 14 {
                img.put_pixel(x, y, Luma([40u8]));
            }
        }
    }
    for x in 0..width {
        img.put_pixel(x, 30, Luma([20u8]));
    }
    for i in 0..80u32 {
        img.put_pixel((i * 37) % width, (i * 13) % height, Luma([0u8]));
    }

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .expect("encode synthetic captcha");
    png
}

fn bench_preprocess(c: &mut Criterion) {
    let png = synthetic_captcha();
    let config = PipelineConfig::default();

    c.bench_function("preprocess (200x60)", |b| {
        b.iter(|| {
            let cleaned = preprocess(black_box(&png), &config).expect("preprocess");
            black_box(cleaned);
        });
    });
}

criterion_group!(benches, bench_preprocess);
criterion_main!(benches);
