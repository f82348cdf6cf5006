// src/main.rs

// Declare modules
pub mod canvas;
pub mod color;
pub mod config;
pub mod export;
pub mod geometry;
pub mod raster;
pub mod solver;

use std::path::PathBuf;

use crate::{canvas::PixelBuffer, config::RunConfig, geometry::NailLayout, solver::Session};

use anyhow::{bail, ensure, Context};
use log::info;

/// How often progress is reported, in committed chords.
const PROGRESS_LOG_INTERVAL: usize = 50;

const USAGE: &str = "Usage: chordal [--config FILE] [--out DIR] IMAGE";

struct CliArgs {
    config: Option<PathBuf>,
    out: PathBuf,
    image: PathBuf,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut config = None;
    let mut out = None;
    let mut image = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config requires a file path")?;
                config = Some(PathBuf::from(value));
            }
            "--out" => {
                let value = args.next().context("--out requires a directory")?;
                out = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("Unknown option '{}'. {}", arg, USAGE),
            _ => {
                ensure!(image.is_none(), "More than one image given. {}", USAGE);
                image = Some(PathBuf::from(arg));
            }
        }
    }
    Ok(CliArgs {
        config,
        out: out.unwrap_or_else(|| PathBuf::from(".")),
        image: image.with_context(|| format!("No input image given. {}", USAGE))?,
    })
}

/// Main entry point for the `chordal` application.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting chordal...");

    let args = parse_args()?;

    // --- Configuration ---
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            info!("No config file given, using defaults.");
            RunConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;
    let resolution = config.frame.resolution();
    info!(
        "Configuration loaded: {} nails, at most {} connections, {}x{} px canvas.",
        config.solver.nails, config.solver.max_connections, resolution, resolution
    );

    // --- Load the target image ---
    let target = PixelBuffer::open(&args.image, resolution, resolution)?;
    info!("Target image loaded from {}.", args.image.display());

    // --- Nail layout ---
    let layout = NailLayout::circular(&config);
    info!("Placed {} nails around the frame.", layout.len());

    // --- Run the solver ---
    let mut session = Session::new();
    session
        .start(&config, &layout, target)
        .context("Failed to start the solver")?;
    if let Some(rx) = session.progress() {
        for event in rx.iter() {
            let done = event.iteration + 1;
            if done % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "Progress: {}/{} chords ({:.1}%).",
                    done,
                    event.max_iterations,
                    done as f64 / event.max_iterations as f64 * 100.0
                );
            }
        }
    }
    let output = session
        .join()
        .context("Solver run failed")?
        .context("No active run to join")?;
    info!(
        "Run stopped ({:?}) after {} chords.",
        output.stop_reason, output.iterations
    );
    for (i, strand) in output.strands.iter().enumerate() {
        info!(
            "Strand {} ({}): {} chords.",
            i,
            strand.color(),
            strand.path().len() - 1
        );
    }

    // --- Export the artifacts ---
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create output directory {}", args.out.display()))?;
    export::write_nail_sequence(&args.out.join("nail_sequence.txt"), &output)?;
    export::write_frame_svg(&args.out.join("frame.svg"), &config, &layout, &output)?;
    output.canvas.save_png(&args.out.join("preview.png"))?;
    info!("Artifacts written to {}.", args.out.display());

    Ok(())
}
