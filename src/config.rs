// src/config.rs

//! Defines the configuration structures for a string-art run.
//!
//! This module provides a set of structs that can be deserialized from a
//! JSON configuration file to customize the physical frame, the solver
//! parameters, and the strand roster. Default values reproduce the classic
//! setup: a 30-unit circular frame, 300 nails, 10000 connections, and a
//! black-plus-white strand pair on a mid-grey canvas.

// Serde is used for deserializing the configuration from a file.
// The `Serialize` trait is also derived for convenience, allowing the current
// configuration to be exported if needed.
use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{ensure, Context, Result};

// Import the color definition from the main color module.
use crate::color::Rgba;

/// Smallest nail count the solver accepts. A chord needs two distinct nails.
pub const MIN_NAILS: u32 = 2;
/// Largest nail count the solver accepts, bounding the chord cache size.
pub const MAX_NAILS: u32 = 4096;
/// Largest iteration bound the solver accepts.
pub const MAX_CONNECTIONS: u32 = 1_000_000;
/// Largest canvas side length the solver accepts. Keeps every buffer
/// length and pixel index comfortably inside `u32` arithmetic.
pub const MAX_RESOLUTION: u32 = 16_384;
/// Hard ceiling on the evaluator pool size.
pub const MAX_WORKERS: usize = 8;

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration for one generation run.
///
/// This struct is the root of the configuration and is intended to be
/// deserialized from a configuration file. It groups settings into logical
/// categories: the physical frame, the solver, and the strand roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)] // Apply default values for the entire struct if a field is missing.
pub struct RunConfig {
    /// Physical frame and canvas derivation settings.
    pub frame: FrameConfig,
    /// Solver parameters.
    pub solver: SolverConfig,
    /// The strand roster: which colored threads participate in the run.
    pub strands: Vec<StrandSpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            frame: FrameConfig::default(),
            solver: SolverConfig::default(),
            strands: vec![
                StrandSpec::new(Rgba::BLACK, 0),
                StrandSpec::new(Rgba::WHITE, 0),
            ],
        }
    }
}

// --- Frame Configuration ---

/// Defines the physical frame and how the raster canvas is derived from it.
///
/// The frame is a circle inscribed in a square viewport of `frame_width`
/// units. Its radius is `frame_width / 3`, matching the classic layout, so
/// the circle's bounding box spans two thirds of the viewport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Width (and height) of the square frame viewport, in frame units.
    pub frame_width: f64,
    /// Thread width in the frame's units (0.004 corresponds to 60WT thread
    /// on an inch-based frame).
    pub thread_diameter: f64,
    /// Nail head diameter in frame units, used only for rendering exports.
    pub nail_diameter: f64,
    /// Factor by which the full-detail resolution is divided before
    /// rasterizing. Higher values trade fidelity for speed.
    pub downscale_factor: u32,
    /// Explicit canvas resolution in pixels. When set, overrides the
    /// resolution derived from the frame dimensions.
    pub canvas_px: Option<u32>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            frame_width: 30.0,
            thread_diameter: 0.004,
            nail_diameter: 0.1,
            downscale_factor: 4,
            canvas_px: None,
        }
    }
}

impl FrameConfig {
    /// Radius of the circular frame, in frame units.
    pub fn radius(&self) -> f64 {
        self.frame_width / 3.0
    }

    /// Side length of the square canvas, in pixels.
    ///
    /// Derived as `((bb / thread_diameter) / 2) / downscale_factor`, where
    /// `bb` is the frame circle's bounding-box width: one pixel per two
    /// thread widths at full detail, then downscaled. An explicit
    /// `canvas_px` overrides the derivation.
    pub fn resolution(&self) -> u32 {
        if let Some(px) = self.canvas_px {
            return px;
        }
        let bb = 2.0 * self.radius();
        (bb / self.thread_diameter / 2.0 / self.downscale_factor as f64).floor() as u32
    }
}

// --- Solver Configuration ---

/// Defines the parameters of the greedy chord search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of nails spaced evenly around the frame.
    pub nails: u32,
    /// Maximum number of chords committed before the run stops.
    pub max_connections: u32,
    /// Per-chord ink opacity in `(0, 1]`. When unset, derived as
    /// `1 / (downscale_factor * 1.8)` so that thinner effective threads
    /// deposit proportionally less ink.
    pub fade: Option<f64>,
    /// Size of the evaluator worker pool. When unset, uses the available
    /// hardware parallelism, capped at [`MAX_WORKERS`].
    pub workers: Option<usize>,
    /// Canvas background color, also the initial working buffer fill.
    pub background: Rgba,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            nails: 300,
            max_connections: 10_000,
            fade: None,
            workers: None,
            background: Rgba::GREY,
        }
    }
}

// --- Strand Roster ---

/// One colored thread participating in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrandSpec {
    /// Ink color of the thread.
    pub color: Rgba,
    /// Nail index the thread is tied to before the first chord.
    pub start_nail: u32,
}

impl StrandSpec {
    /// Creates a strand of the given color anchored at `start_nail`.
    pub const fn new(color: Rgba, start_nail: u32) -> Self {
        StrandSpec { color, start_nail }
    }
}

impl Default for StrandSpec {
    fn default() -> Self {
        StrandSpec::new(Rgba::BLACK, 0)
    }
}

impl RunConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Effective per-chord ink opacity.
    pub fn fade(&self) -> f64 {
        self.solver
            .fade
            .unwrap_or(1.0 / (self.frame.downscale_factor as f64 * 1.8))
    }

    /// Effective evaluator pool size.
    pub fn pool_size(&self) -> usize {
        let hardware = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);
        self.solver.workers.unwrap_or(hardware).min(MAX_WORKERS)
    }

    /// Checks that every parameter is within the supported range.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error for the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame.frame_width > 0.0,
            "frame_width must be positive, got {}",
            self.frame.frame_width
        );
        ensure!(
            self.frame.thread_diameter > 0.0,
            "thread_diameter must be positive, got {}",
            self.frame.thread_diameter
        );
        ensure!(
            self.frame.nail_diameter > 0.0,
            "nail_diameter must be positive, got {}",
            self.frame.nail_diameter
        );
        ensure!(
            self.frame.downscale_factor >= 1,
            "downscale_factor must be at least 1, got {}",
            self.frame.downscale_factor
        );
        let resolution = self.frame.resolution();
        ensure!(
            (16..=MAX_RESOLUTION).contains(&resolution),
            "canvas resolution must be in 16..={} pixels, got {}",
            MAX_RESOLUTION,
            resolution
        );
        ensure!(
            (MIN_NAILS..=MAX_NAILS).contains(&self.solver.nails),
            "nail count must be in {}..={}, got {}",
            MIN_NAILS,
            MAX_NAILS,
            self.solver.nails
        );
        ensure!(
            (1..=MAX_CONNECTIONS).contains(&self.solver.max_connections),
            "max_connections must be in 1..={}, got {}",
            MAX_CONNECTIONS,
            self.solver.max_connections
        );
        let fade = self.fade();
        ensure!(
            fade > 0.0 && fade <= 1.0,
            "fade must be in (0, 1], got {}",
            fade
        );
        if let Some(workers) = self.solver.workers {
            ensure!(
                (1..=MAX_WORKERS).contains(&workers),
                "workers must be in 1..={}, got {}",
                MAX_WORKERS,
                workers
            );
        }
        ensure!(!self.strands.is_empty(), "strand roster must not be empty");
        ensure!(
            self.strands.len() <= 2,
            "at most 2 strands are supported, got {}",
            self.strands.len()
        );
        for (i, strand) in self.strands.iter().enumerate() {
            ensure!(
                strand.start_nail < self.solver.nails,
                "strand {} starts at nail {} but only {} nails exist",
                i,
                strand.start_nail,
                self.solver.nails
            );
        }
        if self.strands.len() == 2 {
            ensure!(
                self.strands[0].color != self.strands[1].color,
                "strand colors must be distinct"
            );
        }
        Ok(())
    }
}
