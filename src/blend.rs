//! Per-pixel blend math
//!
//! All compositing in the engine funnels through two functions: a per-channel
//! color transform selected by [`BlendMode`], and the un-premultiplied over
//! operator. Channel math rounds to nearest and clamps to 0..=255.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The per-pixel color-combination function used when compositing a layer
/// onto the result beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Add,
    Subtract,
    Darken,
    Lighten,
    Difference,
    Exclusion,
}

impl BlendMode {
    /// All modes, in UI/menu order.
    pub const ALL: [BlendMode; 10] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::Difference,
        BlendMode::Exclusion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Add => "add",
            BlendMode::Subtract => "subtract",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(BlendMode::Normal),
            "multiply" => Ok(BlendMode::Multiply),
            "screen" => Ok(BlendMode::Screen),
            "overlay" => Ok(BlendMode::Overlay),
            "add" => Ok(BlendMode::Add),
            "subtract" => Ok(BlendMode::Subtract),
            "darken" => Ok(BlendMode::Darken),
            "lighten" => Ok(BlendMode::Lighten),
            "difference" => Ok(BlendMode::Difference),
            "exclusion" => Ok(BlendMode::Exclusion),
            _ => Err(format!("unknown blend mode: {}", s)),
        }
    }
}

/// Combine one foreground channel with one background channel.
///
/// Pure function of two 0-255 values; the over operator is applied
/// separately by [`composite_over`].
#[inline]
pub fn blend_channel(mode: BlendMode, fg: u8, bg: u8) -> u8 {
    let f = fg as i32;
    let b = bg as i32;
    // Rounded x/255 for non-negative channel products
    let div = |x: i32| (x + 127) / 255;
    let out = match mode {
        BlendMode::Normal => f,
        BlendMode::Multiply => div(f * b),
        BlendMode::Screen => 255 - div((255 - f) * (255 - b)),
        BlendMode::Overlay => {
            // Conditioned on the backdrop, per the conventional formula
            if b < 128 {
                div(2 * f * b)
            } else {
                255 - div(2 * (255 - f) * (255 - b))
            }
        }
        BlendMode::Add => f + b,
        BlendMode::Subtract => b - f,
        BlendMode::Darken => f.min(b),
        BlendMode::Lighten => f.max(b),
        BlendMode::Difference => (b - f).abs(),
        BlendMode::Exclusion => f + b - div(2 * f * b),
    };
    out.clamp(0, 255) as u8
}

/// Alpha-composite a foreground pixel over a background pixel.
///
/// The standard un-premultiplied over operator:
/// `outA = fgA + bgA*(1-fgA)`, `outC = (fgC*fgA + bgC*bgA*(1-fgA)) / outA`,
/// with fully transparent output when `outA == 0`.
#[inline]
pub fn composite_over(fg: [u8; 4], bg: [u8; 4]) -> [u8; 4] {
    let fg_a = fg[3] as f32 / 255.0;
    let bg_a = bg[3] as f32 / 255.0;
    let out_a = fg_a + bg_a * (1.0 - fg_a);

    if out_a == 0.0 {
        return [0, 0, 0, 0];
    }

    let channel = |f: u8, b: u8| -> u8 {
        let f = f as f32 / 255.0;
        let b = b as f32 / 255.0;
        let out = (f * fg_a + b * bg_a * (1.0 - fg_a)) / out_a;
        (out * 255.0).round().clamp(0.0, 255.0) as u8
    };

    [
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_a * 255.0).round() as u8,
    ]
}

/// Blend one layer pixel onto the running composite.
///
/// The foreground color is first transformed by `mode` against the backdrop
/// color, its alpha scaled by the layer `opacity`, then composited with the
/// over operator.
#[inline]
pub fn blend_pixel(mode: BlendMode, fg: [u8; 4], bg: [u8; 4], opacity: f32) -> [u8; 4] {
    let effective_a = (fg[3] as f32 * opacity.clamp(0.0, 1.0)).round().clamp(0.0, 255.0) as u8;
    if effective_a == 0 {
        return bg;
    }

    let blended = match mode {
        BlendMode::Normal => [fg[0], fg[1], fg[2], effective_a],
        _ => [
            blend_channel(mode, fg[0], bg[0]),
            blend_channel(mode, fg[1], bg[1]),
            blend_channel(mode, fg[2], bg[2]),
            effective_a,
        ],
    };

    composite_over(blended, bg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    #[test]
    fn test_over_opaque_wins() {
        assert_eq!(composite_over(RED, WHITE), RED);
    }

    #[test]
    fn test_over_transparent_passes_through() {
        assert_eq!(composite_over(CLEAR, RED), RED);
    }

    #[test]
    fn test_over_both_transparent() {
        assert_eq!(composite_over(CLEAR, CLEAR), [0, 0, 0, 0]);
    }

    #[test]
    fn test_over_half_alpha() {
        // 50% red over opaque white: outA = 1, channels halfway-ish
        let half_red = [255, 0, 0, 128];
        let out = composite_over(half_red, WHITE);
        assert_eq!(out[3], 255);
        assert_eq!(out[0], 255);
        // green/blue pulled down by ~alpha fraction
        assert!(out[1] > 120 && out[1] < 135, "green was {}", out[1]);
    }

    #[test]
    fn test_multiply_formula() {
        assert_eq!(blend_channel(BlendMode::Multiply, 255, 100), 100);
        assert_eq!(blend_channel(BlendMode::Multiply, 0, 100), 0);
        assert_eq!(blend_channel(BlendMode::Multiply, 128, 128), 64);
    }

    #[test]
    fn test_screen_formula() {
        assert_eq!(blend_channel(BlendMode::Screen, 0, 100), 100);
        assert_eq!(blend_channel(BlendMode::Screen, 255, 100), 255);
    }

    #[test]
    fn test_overlay_branches_on_backdrop() {
        // Dark backdrop: multiply-like. 2*128*64/255 = 64.25 -> 64
        assert_eq!(blend_channel(BlendMode::Overlay, 128, 64), 64);
        // Light backdrop: screen-like. 255 - round(2*127*55/255) = 255 - 55
        assert_eq!(blend_channel(BlendMode::Overlay, 128, 200), 200);
    }

    #[test]
    fn test_channel_math_rounds_to_nearest() {
        // 200*2/255 = 1.57: truncation would give 1
        assert_eq!(blend_channel(BlendMode::Multiply, 200, 2), 2);
        // 255 - 253*55/255 = 255 - 54.57: truncation would give 201
        assert_eq!(blend_channel(BlendMode::Screen, 2, 200), 200);
        // 255 + 0 - 2*255*0/255 stays exact
        assert_eq!(blend_channel(BlendMode::Exclusion, 255, 0), 255);
    }

    #[test]
    fn test_add_subtract_clamp() {
        assert_eq!(blend_channel(BlendMode::Add, 200, 100), 255);
        assert_eq!(blend_channel(BlendMode::Subtract, 200, 100), 0);
        assert_eq!(blend_channel(BlendMode::Subtract, 50, 200), 150);
    }

    #[test]
    fn test_darken_lighten_difference_exclusion() {
        assert_eq!(blend_channel(BlendMode::Darken, 30, 200), 30);
        assert_eq!(blend_channel(BlendMode::Lighten, 30, 200), 200);
        assert_eq!(blend_channel(BlendMode::Difference, 30, 200), 170);
        assert_eq!(blend_channel(BlendMode::Exclusion, 255, 255), 0);
        assert_eq!(blend_channel(BlendMode::Exclusion, 0, 200), 200);
    }

    #[test]
    fn test_blend_pixel_zero_opacity_is_noop() {
        assert_eq!(blend_pixel(BlendMode::Normal, RED, WHITE, 0.0), WHITE);
    }

    #[test]
    fn test_blend_pixel_normal_full_opacity() {
        assert_eq!(blend_pixel(BlendMode::Normal, RED, WHITE, 1.0), RED);
    }

    #[test]
    fn test_blend_mode_round_trips_through_str() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.as_str().parse::<BlendMode>(), Ok(mode));
        }
        assert!("plasma".parse::<BlendMode>().is_err());
    }
}
