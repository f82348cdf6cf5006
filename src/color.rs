// src/color.rs

//! Defines the `Rgba` color type used for pixel buffers and strand inks.

use serde::{Deserialize, Serialize};

/// An 8-bit-per-channel RGBA color.
///
/// This is the only color representation in the pipeline: target buffers,
/// working buffers, strand inks, and the canvas background all use it.
/// Channel order matches the in-memory byte order of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Fully opaque black.
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    /// Fully opaque white.
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    /// Fully opaque mid grey, the default canvas background.
    pub const GREY: Rgba = Rgba::new(128, 128, 128, 255);

    /// Creates a color from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    /// Returns the channels in buffer byte order.
    pub const fn channels(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Rgba {
    /// Returns opaque black.
    fn default() -> Self {
        Rgba::BLACK
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_match_field_order() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!(c.channels(), [1, 2, 3, 4]);
    }

    #[test]
    fn constants_are_opaque() {
        assert_eq!(Rgba::BLACK.a, 255);
        assert_eq!(Rgba::WHITE.a, 255);
        assert_eq!(Rgba::GREY, Rgba::new(128, 128, 128, 255));
    }

    #[test]
    fn display_formats_as_css_rgba() {
        assert_eq!(
            Rgba::new(10, 20, 30, 255).to_string(),
            "rgba(10, 20, 30, 255)"
        );
    }
}
