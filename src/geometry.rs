// src/geometry.rs

//! Nail placement around the circular frame.
//!
//! Nails live in two coordinate systems at once: continuous frame units
//! (used by the vector exports) and integer canvas pixels (used by the
//! rasterizer). Both are computed here, from the same angles, so a chord
//! drawn in either system lands in the same place.

use crate::config::RunConfig;

/// A position in continuous frame units, origin at the frame center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePoint {
    pub x: f64,
    pub y: f64,
}

/// A position in integer canvas pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// The full nail table for one run: every nail's frame-unit position and
/// its canvas pixel position.
#[derive(Debug, Clone)]
pub struct NailLayout {
    frame: Vec<FramePoint>,
    pixel: Vec<PixelPoint>,
    radius: f64,
    frame_width: f64,
}

impl NailLayout {
    /// Places `config.solver.nails` nails evenly around the circular frame.
    ///
    /// Nail 0 sits at the 3 o'clock position and indices advance clockwise
    /// when the y axis points down, matching the path direction of an SVG
    /// circle. Pixel positions map the circle's bounding box onto the
    /// canvas: a frame coordinate of `-radius` lands on pixel 0 and
    /// `+radius` on pixel `resolution - 1`, truncated toward zero. Every
    /// pixel position therefore lies inside the canvas.
    pub fn circular(config: &RunConfig) -> Self {
        let count = config.solver.nails as usize;
        let radius = config.frame.radius();
        let resolution = config.frame.resolution();
        let mut frame = Vec::with_capacity(count);
        let mut pixel = Vec::with_capacity(count);
        for i in 0..count {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / count as f64;
            let point = FramePoint {
                x: radius * theta.cos(),
                y: radius * theta.sin(),
            };
            frame.push(point);
            pixel.push(frame_to_pixel(point, radius, resolution));
        }
        NailLayout {
            frame,
            pixel,
            radius,
            frame_width: config.frame.frame_width,
        }
    }

    /// Number of nails.
    pub fn len(&self) -> usize {
        self.pixel.len()
    }

    /// True when the layout holds no nails.
    pub fn is_empty(&self) -> bool {
        self.pixel.is_empty()
    }

    /// Nail positions in frame units.
    pub fn frame_points(&self) -> &[FramePoint] {
        &self.frame
    }

    /// Nail positions in canvas pixels.
    pub fn pixel_points(&self) -> &[PixelPoint] {
        &self.pixel
    }

    /// Radius of the circular frame, in frame units.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Width of the square frame viewport, in frame units.
    pub fn frame_width(&self) -> f64 {
        self.frame_width
    }
}

/// Maps a frame-unit point inside the circle's bounding box onto the canvas.
fn frame_to_pixel(point: FramePoint, radius: f64, resolution: u32) -> PixelPoint {
    let span = (resolution - 1) as f64;
    let x = ((point.x + radius) / (2.0 * radius) * span).floor() as i32;
    let y = ((point.y + radius) / (2.0 * radius) * span).floor() as i32;
    debug_assert!(x >= 0 && x < resolution as i32);
    debug_assert!(y >= 0 && y < resolution as i32);
    PixelPoint { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_with(nails: u32, canvas_px: u32) -> NailLayout {
        let mut config = RunConfig::default();
        config.solver.nails = nails;
        config.frame.canvas_px = Some(canvas_px);
        NailLayout::circular(&config)
    }

    #[test]
    fn nail_zero_sits_at_three_oclock() {
        let layout = layout_with(8, 101);
        let first = layout.pixel_points()[0];
        // Rightmost column, vertical center.
        assert_eq!(first.x, 100);
        assert_eq!(first.y, 50);
    }

    #[test]
    fn every_nail_lies_inside_the_canvas() {
        for &(nails, px) in &[(8u32, 16u32), (300, 625), (37, 91), (2000, 625)] {
            let layout = layout_with(nails, px);
            assert_eq!(layout.len(), nails as usize);
            for p in layout.pixel_points() {
                assert!(p.x >= 0 && p.x < px as i32, "x {} out of {}", p.x, px);
                assert!(p.y >= 0 && p.y < px as i32, "y {} out of {}", p.y, px);
            }
        }
    }

    #[test]
    fn quarter_turn_reaches_the_bottom() {
        // With a multiple of 4, nail count/4 sits at 6 o'clock (y down).
        let layout = layout_with(4, 101);
        let quarter = layout.pixel_points()[1];
        assert_eq!(quarter.x, 50);
        assert_eq!(quarter.y, 100);
    }

    #[test]
    fn frame_points_sit_on_the_circle() {
        let layout = layout_with(12, 625);
        for p in layout.frame_points() {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - layout.radius()).abs() < 1e-9);
        }
    }
}
