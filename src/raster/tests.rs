// src/raster/tests.rs

use super::*;
use std::collections::HashSet;

fn p(x: i32, y: i32) -> PixelPoint {
    PixelPoint { x, y }
}

fn uniform(width: u32, height: u32, value: u8) -> Vec<u8> {
    vec![value; (width * height * 4) as usize]
}

#[test]
fn line_covers_endpoints_in_request_order() {
    let cases = [
        (p(0, 0), p(4, 2)),
        (p(4, 2), p(0, 0)),
        (p(7, 7), p(7, 7)),
        (p(9, 0), p(0, 3)),
    ];
    for (a, b) in cases {
        let pixels = line_pixels(a, b);
        assert_eq!(*pixels.first().unwrap(), a);
        assert_eq!(*pixels.last().unwrap(), b);
    }
}

#[test]
fn line_emits_one_pixel_per_dominant_axis_unit() {
    let cases = [
        (p(0, 0), p(0, 0), 1usize),
        (p(0, 0), p(5, 0), 6),
        (p(0, 0), p(0, 7), 8),
        (p(3, 3), p(0, 0), 4),
        (p(0, 0), p(4, 2), 5),
        (p(10, 1), p(2, 6), 9),
    ];
    for (a, b, expected) in cases {
        assert_eq!(line_pixels(a, b).len(), expected, "{:?} -> {:?}", a, b);
    }
}

#[test]
fn line_pixel_set_ignores_direction() {
    // Raw Bresenham tie-breaking differs per direction; the canonicalized
    // walk must not.
    let cases = [
        (p(0, 0), p(4, 2)),
        (p(0, 0), p(2, 4)),
        (p(5, 1), p(0, 9)),
        (p(12, 3), p(1, 3)),
        (p(6, 0), p(6, 11)),
    ];
    for (a, b) in cases {
        let forward: HashSet<_> = line_pixels(a, b).into_iter().collect();
        let backward: HashSet<_> = line_pixels(b, a).into_iter().collect();
        assert_eq!(forward, backward, "{:?} <-> {:?}", a, b);
    }
}

#[test]
fn line_steps_are_adjacent() {
    let pixels = line_pixels(p(0, 0), p(13, 5));
    for pair in pixels.windows(2) {
        let dx = (pair[1].x - pair[0].x).abs();
        let dy = (pair[1].y - pair[0].y).abs();
        assert!(dx <= 1 && dy <= 1);
        assert!(dx + dy > 0, "duplicate pixel {:?}", pair[0]);
    }
}

#[test]
fn blend_with_full_fade_stamps_the_color() {
    let mut buffer = uniform(4, 1, 77);
    let ink = Rgba::new(9, 8, 7, 6);
    blend_line(&[p(1, 0), p(2, 0)], 1.0, ink, &mut buffer, 4);
    assert_eq!(&buffer[0..4], &[77, 77, 77, 77]);
    assert_eq!(&buffer[4..8], &ink.channels());
    assert_eq!(&buffer[8..12], &ink.channels());
    assert_eq!(&buffer[12..16], &[77, 77, 77, 77]);
}

#[test]
fn blend_with_vanishing_fade_changes_nothing() {
    let mut buffer = uniform(3, 3, 200);
    let before = buffer.clone();
    blend_line(&[p(0, 0), p(1, 1), p(2, 2)], 1e-9, Rgba::BLACK, &mut buffer, 3);
    assert_eq!(buffer, before);
}

#[test]
fn blend_rounds_half_to_even() {
    // ink 0 at fade 0.5 lands exactly on .5 boundaries: 1 -> 0.5 -> 0,
    // 3 -> 1.5 -> 2.
    let mut buffer = vec![1, 1, 1, 1, 3, 3, 3, 3];
    blend_line(
        &[p(0, 0), p(1, 0)],
        0.5,
        Rgba::new(0, 0, 0, 0),
        &mut buffer,
        2,
    );
    assert_eq!(buffer, vec![0, 0, 0, 0, 2, 2, 2, 2]);
}

#[test]
fn score_is_negative_when_every_channel_improves() {
    // target 0, working 200, ink 0 at fade 0.5: blended 100, each channel
    // moves 100 closer. delta per channel = 100 - 200 = -100, pixel sum
    // -400, mean -400, cubed -6.4e7.
    let target = uniform(2, 1, 0);
    let working = uniform(2, 1, 200);
    let score = score_line(
        &[p(0, 0)],
        0.5,
        Rgba::new(0, 0, 0, 0),
        &target,
        &working,
        2,
    );
    assert_eq!(score, -64_000_000.0);
}

#[test]
fn score_is_positive_and_discounted_when_every_channel_worsens() {
    // target == working == 100, ink 255 at fade 0.5: blended 177.5, delta
    // per channel +77.5, pixel sum +310, discounted to 62, cubed 238328.
    let target = uniform(2, 1, 100);
    let working = uniform(2, 1, 100);
    let score = score_line(
        &[p(0, 0)],
        0.5,
        Rgba::new(255, 255, 255, 255),
        &target,
        &working,
        2,
    );
    assert_eq!(score, 238_328.0);
}

#[test]
fn score_averages_over_the_pixel_list() {
    // One improving pixel and one already-perfect pixel: the perfect pixel
    // contributes zero but still divides the mean.
    let target = uniform(2, 1, 0);
    let mut working = uniform(2, 1, 0);
    // Pixel 1: working 200 against target 0.
    for c in 4..8 {
        working[c] = 200;
    }
    let ink = Rgba::new(0, 0, 0, 0);
    let one = score_line(&[p(1, 0)], 0.5, ink, &target, &working, 2);
    let both = score_line(&[p(0, 0), p(1, 0)], 0.5, ink, &target, &working, 2);
    assert_eq!(one, -64_000_000.0);
    // Mean halves, cube scales by 1/8.
    assert_eq!(both, -8_000_000.0);
}

#[test]
fn score_zero_when_ink_matches_background_and_target() {
    // Blending a color into pixels already at that color, with the target
    // agreeing, moves nothing.
    let target = uniform(2, 1, 50);
    let working = uniform(2, 1, 50);
    let score = score_line(
        &[p(0, 0), p(1, 0)],
        0.25,
        Rgba::new(50, 50, 50, 50),
        &target,
        &working,
        2,
    );
    assert_eq!(score, 0.0);
}
