//! Palette quantization and error-diffusion dithering
//!
//! Reduces an image's color set to a bounded palette and optionally diffuses
//! the quantization error with the classic Floyd-Steinberg weights. These
//! passes are the engine's heaviest per-pixel loops and are what the worker
//! thread offloads; [`map_to_palette`] parallelizes across rows with rayon.

use crate::buffer::PixelBuffer;
use rayon::prelude::*;
use std::collections::HashMap;

/// Format an RGB triple as an uppercase `#RRGGBB` string.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Parse a `#RRGGBB` hex string; returns None for anything else.
pub fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Count exact RGB triples among non-transparent pixels and return up to
/// `max_colors` hex strings, most frequent first. Ties break on the darker
/// color so the order is deterministic.
pub fn extract_palette(buffer: &PixelBuffer, max_colors: usize) -> Vec<String> {
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for i in 0..buffer.pixel_count() {
        let px = buffer.pixel_at(i);
        if px[3] == 0 {
            continue;
        }
        *counts.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
    }

    let mut colors: Vec<([u8; 3], usize)> = counts.into_iter().collect();
    colors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    colors.into_iter().take(max_colors).map(|(rgb, _)| rgb_to_hex(rgb)).collect()
}

/// Build a working palette by bucketing each channel into
/// `ceil(cbrt(palette_size))` evenly spaced levels and keeping the most
/// frequent bucket centers.
pub fn build_quantized_palette(buffer: &PixelBuffer, palette_size: usize) -> Vec<[u8; 3]> {
    if palette_size == 0 {
        return Vec::new();
    }
    let levels = (palette_size as f64).cbrt().ceil() as u32;
    let levels = levels.max(1);

    let bucket_of = |v: u8| -> u32 { (v as u32 * levels / 256).min(levels - 1) };
    let center_of = |bucket: u32| -> u8 {
        (((bucket as f64 + 0.5) * 256.0 / levels as f64).round() as u32).min(255) as u8
    };

    let mut counts: HashMap<(u32, u32, u32), usize> = HashMap::new();
    for i in 0..buffer.pixel_count() {
        let px = buffer.pixel_at(i);
        if px[3] == 0 {
            continue;
        }
        let key = (bucket_of(px[0]), bucket_of(px[1]), bucket_of(px[2]));
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut buckets: Vec<((u32, u32, u32), usize)> = counts.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    buckets
        .into_iter()
        .take(palette_size)
        .map(|((r, g, b), _)| [center_of(r), center_of(g), center_of(b)])
        .collect()
}

#[inline]
fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// Nearest palette entry by squared Euclidean RGB distance.
fn nearest(palette: &[[u8; 3]], rgb: [u8; 3]) -> [u8; 3] {
    let mut best = palette[0];
    let mut best_dist = squared_distance(best, rgb);
    for &candidate in &palette[1..] {
        let dist = squared_distance(candidate, rgb);
        if dist < best_dist {
            best = candidate;
            best_dist = dist;
        }
    }
    best
}

/// Replace every non-transparent pixel's color with its nearest palette
/// entry. Alpha is untouched. No-op on an empty palette.
pub fn map_to_palette(buffer: &mut PixelBuffer, palette: &[[u8; 3]]) {
    if palette.is_empty() {
        return;
    }
    let row_bytes = buffer.width() as usize * 4;
    if row_bytes == 0 {
        return;
    }
    buffer.as_bytes_mut().par_chunks_mut(row_bytes).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let mapped = nearest(palette, [px[0], px[1], px[2]]);
            px[0] = mapped[0];
            px[1] = mapped[1];
            px[2] = mapped[2];
        }
    });
}

/// Classic Floyd-Steinberg error diffusion against a fixed palette.
///
/// Pixels are processed row-major. Each pixel is palette-mapped from its
/// original color plus accumulated error; the residual error spreads to the
/// four forward/below neighbors with weights 7/16, 3/16, 5/16, 1/16. Fully
/// transparent pixels neither consume nor propagate error. No-op on an
/// empty palette.
pub fn dither_floyd_steinberg(buffer: &mut PixelBuffer, palette: &[[u8; 3]]) {
    if palette.is_empty() {
        return;
    }
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let mut error = vec![[0f32; 3]; width * height];

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let px = buffer.pixel_at(i);
            if px[3] == 0 {
                continue;
            }

            let adjusted = [
                (px[0] as f32 + error[i][0]).round().clamp(0.0, 255.0) as u8,
                (px[1] as f32 + error[i][1]).round().clamp(0.0, 255.0) as u8,
                (px[2] as f32 + error[i][2]).round().clamp(0.0, 255.0) as u8,
            ];
            let mapped = nearest(palette, adjusted);
            buffer.set_pixel_at(i, [mapped[0], mapped[1], mapped[2], px[3]]);

            let residual = [
                adjusted[0] as f32 - mapped[0] as f32,
                adjusted[1] as f32 - mapped[1] as f32,
                adjusted[2] as f32 - mapped[2] as f32,
            ];

            let mut spread = |nx: isize, ny: isize, weight: f32, error: &mut Vec<[f32; 3]>| {
                if nx < 0 || nx >= width as isize || ny >= height as isize {
                    return;
                }
                let n = ny as usize * width + nx as usize;
                for ch in 0..3 {
                    error[n][ch] += residual[ch] * weight;
                }
            };

            let (xi, yi) = (x as isize, y as isize);
            spread(xi + 1, yi, 7.0 / 16.0, &mut error);
            spread(xi - 1, yi + 1, 3.0 / 16.0, &mut error);
            spread(xi, yi + 1, 5.0 / 16.0, &mut error);
            spread(xi + 1, yi + 1, 1.0 / 16.0, &mut error);
        }
    }
}
