//! Criterion benchmarks for spriteforge critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Compositor: multi-layer alpha compositing with blend modes
//! - Quantizer: palette extraction, mapping and Floyd-Steinberg dithering
//! - Transform: nearest-neighbor affine resampling
//! - Spritesheet: frame packing
//! - Patch: buffer diffing and application

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spriteforge::blend::BlendMode;
use spriteforge::buffer::{Canvas, PixelBuffer};
use spriteforge::compositor::composite_layers;
use spriteforge::model::{Layer, LayerId};
use spriteforge::patch::{apply_patch, diff_buffers};
use spriteforge::quantize::{build_quantized_palette, dither_floyd_steinberg, map_to_palette};
use spriteforge::spritesheet::{pack_spritesheet, SheetSettings};
use spriteforge::transform::{resample_nearest, Affine};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Deterministic pseudo-noise buffer; varied enough to defeat branch shortcuts.
fn make_noise_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let seed = x.wrapping_mul(31).wrapping_add(y.wrapping_mul(17));
            buffer.set_pixel(
                x,
                y,
                [
                    (seed % 256) as u8,
                    (seed.wrapping_mul(7) % 256) as u8,
                    (seed.wrapping_mul(13) % 256) as u8,
                    if seed % 5 == 0 { 0 } else { 255 },
                ],
            );
        }
    }
    buffer
}

/// Build a layer stack of `count` layers cycling through blend modes.
fn make_layer_stack(count: usize, width: u32, height: u32) -> Vec<Layer> {
    let canvas = Canvas::new(width, height).unwrap();
    let modes = [BlendMode::Normal, BlendMode::Multiply, BlendMode::Screen, BlendMode::Overlay];
    (0..count)
        .map(|i| {
            let mut layer = Layer::new(LayerId(i as u32), format!("layer_{}", i), canvas);
            layer.pixels = make_noise_buffer(width, height);
            layer.blend_mode = modes[i % modes.len()];
            layer.set_opacity(0.9);
            layer
        })
        .collect()
}

// =============================================================================
// Compositor Benchmarks
// =============================================================================

fn bench_compositor(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositor");

    for size in [16, 64, 128, 256].iter() {
        let layers = make_layer_stack(4, *size, *size);
        let refs: Vec<&Layer> = layers.iter().collect();

        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(
            BenchmarkId::new("composite_4_layers", format!("{}x{}", size, size)),
            &refs,
            |b, refs| b.iter(|| composite_layers(black_box(refs), *size, *size)),
        );
    }

    for count in [2, 8, 16].iter() {
        let layers = make_layer_stack(*count, 64, 64);
        let refs: Vec<&Layer> = layers.iter().collect();

        group.bench_with_input(BenchmarkId::new("composite_64x64", count), &refs, |b, refs| {
            b.iter(|| composite_layers(black_box(refs), 64, 64))
        });
    }

    group.finish();
}

// =============================================================================
// Quantizer Benchmarks
// =============================================================================

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize");

    for size in [64, 128, 256].iter() {
        let buffer = make_noise_buffer(*size, *size);

        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(
            BenchmarkId::new("build_palette_16", format!("{}x{}", size, size)),
            &buffer,
            |b, buffer| b.iter(|| build_quantized_palette(black_box(buffer), 16)),
        );
    }

    let source = make_noise_buffer(128, 128);
    let palette = build_quantized_palette(&source, 16);

    group.bench_function("map_to_palette_128x128", |b| {
        b.iter_batched(
            || source.clone(),
            |mut buffer| map_to_palette(&mut buffer, black_box(&palette)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("dither_128x128", |b| {
        b.iter_batched(
            || source.clone(),
            |mut buffer| dither_floyd_steinberg(&mut buffer, black_box(&palette)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// =============================================================================
// Transform Benchmarks
// =============================================================================

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    let buffer = make_noise_buffer(128, 128);

    group.bench_function("rotate90_128x128", |b| {
        let matrix = Affine::rotate90_cw(buffer.height());
        b.iter(|| resample_nearest(black_box(&buffer), black_box(&matrix)))
    });

    group.bench_function("flip_horizontal_128x128", |b| {
        let matrix = Affine::flip_horizontal(buffer.width());
        b.iter(|| resample_nearest(black_box(&buffer), black_box(&matrix)))
    });

    for factor in [0.5, 2.0, 4.0].iter() {
        let matrix = Affine::scale(*factor, *factor);
        group.bench_with_input(BenchmarkId::new("scale_128x128", factor), &matrix, |b, matrix| {
            b.iter(|| resample_nearest(black_box(&buffer), black_box(matrix)))
        });
    }

    group.finish();
}

// =============================================================================
// Spritesheet Benchmarks
// =============================================================================

fn bench_spritesheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("spritesheet");

    for count in [8, 32, 64].iter() {
        let frames: Vec<PixelBuffer> = (0..*count).map(|_| make_noise_buffer(32, 32)).collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("pack_32x32", count), &frames, |b, frames| {
            b.iter(|| pack_spritesheet(black_box(frames), &SheetSettings::default()))
        });
    }

    let frames: Vec<PixelBuffer> = (0..16).map(|_| make_noise_buffer(32, 32)).collect();
    let scaled = SheetSettings { scale: 2, ..Default::default() };
    group.bench_function("pack_16_frames_2x_scale", |b| {
        b.iter(|| pack_spritesheet(black_box(&frames), &scaled))
    });

    group.finish();
}

// =============================================================================
// Patch Benchmarks
// =============================================================================

fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch");

    let before = make_noise_buffer(128, 128);
    let mut after = before.clone();
    // Touch every 16th pixel
    for i in (0..after.pixel_count()).step_by(16) {
        after.set_pixel_at(i, [1, 2, 3, 255]);
    }

    group.bench_function("diff_128x128_sparse", |b| {
        b.iter(|| diff_buffers(black_box(&before), black_box(&after)))
    });

    let patch = diff_buffers(&before, &after);
    group.throughput(Throughput::Elements((patch.len() / 5) as u64));
    group.bench_function("apply_128x128_sparse", |b| {
        b.iter_batched(
            || before.clone(),
            |mut buffer| apply_patch(&mut buffer, black_box(&patch)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_compositor,
    bench_quantize,
    bench_transform,
    bench_spritesheet,
    bench_patch
);

criterion_main!(benches);
