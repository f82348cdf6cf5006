// src/raster/mod.rs

//! Chord rasterization, scoring, and compositing.
//!
//! These are the three pure kernels the solver is built on. They operate on
//! raw RGBA byte slices so that the coordinator and every evaluator worker
//! produce bit-identical results from identical inputs: rasterization is
//! integer-only, scoring reads buffers without writing, and compositing is
//! the single code path through which ink reaches a buffer.

use crate::color::Rgba;
use crate::geometry::PixelPoint;

/// Divisor applied to score contributions from pixels a chord makes worse.
/// Keeps a chord with mild collateral damage viable when most of its pixels
/// improve.
const WORSENING_PENALTY_DIVISOR: f64 = 5.0;

/// Rasterizes the segment from `a` to `b` into a list of pixels.
///
/// Integer Bresenham stepping: the list contains both endpoints, walks from
/// `a` to `b`, and holds exactly `max(|dx|, |dy|) + 1` pixels. The covered
/// pixel set depends only on the unordered endpoint pair, never on the
/// direction of the request. Bresenham's tie-breaking is direction
/// sensitive, so the walk always runs from the lexicographically smaller
/// endpoint and is reversed on return when the caller asked the other way;
/// without this, two replicas rasterizing the same chord from opposite
/// ends would ink slightly different pixels.
pub fn line_pixels(a: PixelPoint, b: PixelPoint) -> Vec<PixelPoint> {
    let flipped = (b.x, b.y) < (a.x, a.y);
    let (start, end) = if flipped { (b, a) } else { (a, b) };

    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (start.x, start.y);
    let mut pixels = Vec::with_capacity(dx.max(dy) as usize + 1);
    loop {
        pixels.push(PixelPoint { x, y });
        if x == end.x && y == end.y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
    if flipped {
        pixels.reverse();
    }
    pixels
}

/// Scores laying one chord of `color` ink at `fade` opacity over `working`,
/// judged against `target`. Negative means the chord moves the canvas
/// toward the target; lower is better.
///
/// Per pixel, per channel, the contribution is
/// `|target - blended| - |working - target|` where `blended` is the
/// unquantized composite `color * fade + working * (1 - fade)`. A pixel's
/// channel sum counts in full when it improves (negative) and at one fifth
/// when it worsens. The per-pixel mean is then cubed, which preserves sign
/// and stretches the scale so that strong chords dominate.
///
/// Neither buffer is written. Both must be RGBA rasters of `width` columns
/// holding every pixel in `pixels`.
pub fn score_line(
    pixels: &[PixelPoint],
    fade: f64,
    color: Rgba,
    target: &[u8],
    working: &[u8],
    width: u32,
) -> f64 {
    debug_assert!(!pixels.is_empty());
    let ink = color.channels().map(f64::from);
    let mut total = 0.0;
    for p in pixels {
        let base = 4 * (p.y as usize * width as usize + p.x as usize);
        let mut pixel_diff = 0.0;
        for c in 0..4 {
            let current = f64::from(working[base + c]);
            let wanted = f64::from(target[base + c]);
            let blended = ink[c] * fade + current * (1.0 - fade);
            pixel_diff += (wanted - blended).abs() - (current - wanted).abs();
        }
        if pixel_diff < 0.0 {
            total += pixel_diff;
        } else if pixel_diff > 0.0 {
            total += pixel_diff / WORSENING_PENALTY_DIVISOR;
        }
    }
    (total / pixels.len() as f64).powi(3)
}

/// Composites one chord of `color` ink at `fade` opacity into `buffer`.
///
/// Each covered channel becomes `color * fade + existing * (1 - fade)`,
/// quantized with round-half-to-even. This is the only write path for ink;
/// the scorer's `blended` term models exactly this blend before
/// quantization.
pub fn blend_line(pixels: &[PixelPoint], fade: f64, color: Rgba, buffer: &mut [u8], width: u32) {
    let ink = color.channels().map(f64::from);
    for p in pixels {
        let base = 4 * (p.y as usize * width as usize + p.x as usize);
        for c in 0..4 {
            let existing = f64::from(buffer[base + c]);
            let blended = ink[c] * fade + existing * (1.0 - fade);
            buffer[base + c] = blended.round_ties_even() as u8;
        }
    }
}

#[cfg(test)]
mod tests;
