// src/export.rs

//! Run output exporters: the nail sequence as plain text and the frame
//! (with the committed strings) as an SVG document.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::RunConfig;
use crate::geometry::NailLayout;
use crate::solver::RunOutput;

/// Renders the committed chord order as a step-by-step stringing guide.
///
/// The header names the tool and the total connection count. Consecutive
/// commits by the same strand are grouped into a segment opened by a
/// `Thread: [r, g, b]` line; the segment lists the nail the strand sits on
/// followed by each destination, one nail index per line, so every segment
/// can be strung without looking back at the previous one.
pub fn render_nail_sequence(output: &RunOutput) -> String {
    let mut text = format!(
        "Generated using chordal\n{} connections in total\n\n",
        output.iterations
    );
    let mut i = 0;
    while i < output.order.len() {
        let step = output.order[i];
        let color = output.strands[step.strand].color();
        text.push_str(&format!(
            "\nThread: [{}, {}, {}]\n{}\n",
            color.r, color.g, color.b, step.from
        ));
        while i < output.order.len() && output.order[i].strand == step.strand {
            text.push_str(&format!("{}\n", output.order[i].to));
            i += 1;
        }
    }
    text
}

/// Writes the nail sequence next to the other run artifacts.
pub fn write_nail_sequence(path: &Path, output: &RunOutput) -> Result<()> {
    std::fs::write(path, render_nail_sequence(output))
        .with_context(|| format!("Failed to write nail sequence to {}", path.display()))
}

/// Renders the frame as a standalone SVG document: the circular frame, the
/// committed strings in commit order, and on top of them the nail heads
/// with their index labels, all in frame coordinates.
pub fn render_frame_svg(config: &RunConfig, layout: &NailLayout, output: &RunOutput) -> String {
    let width = layout.frame_width();
    let half = width / 2.0;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\" \
         desc=\"Created using chordal\">\n",
        -half, -half, width, width
    );
    svg.push_str("  <g>\n");
    svg.push_str(&format!(
        "    <circle r=\"{}\" fill=\"grey\" stroke=\"#ffbe5700\" stroke-width=\"10\"/>\n",
        layout.radius()
    ));

    let nails = layout.frame_points();
    for step in &output.order {
        let color = output.strands[step.strand].color();
        let a = nails[step.from];
        let b = nails[step.to];
        svg.push_str(&format!(
            "    <path class=\"string\" d=\"M {:.4},{:.4} L {:.4},{:.4}\" \
             stroke=\"rgba({},{},{},{})\" stroke-width=\"{}\" fill=\"none\"/>\n",
            a.x,
            a.y,
            b.x,
            b.y,
            color.r,
            color.g,
            color.b,
            f64::from(color.a) / 255.0,
            config.frame.thread_diameter
        ));
    }

    // Nail heads last so they stay visible above the strings.
    let nail_diameter = config.frame.nail_diameter;
    for (i, nail) in nails.iter().enumerate() {
        svg.push_str(&format!(
            "    <g transform=\"translate({:.4}, {:.4})\">\n",
            nail.x, nail.y
        ));
        svg.push_str(&format!(
            "      <circle class=\"nail\" r=\"{}\" fill=\"aqua\"/>\n",
            nail_diameter / 2.0
        ));
        svg.push_str(&format!(
            "      <text fill=\"black\" stroke=\"white\" stroke-width=\"{}\" dy=\"{:.4}\" \
             font-size=\"{}px\" text-anchor=\"middle\">{}</text>\n",
            nail_diameter / 100.0,
            nail_diameter / 2.0 * 0.7,
            nail_diameter,
            i
        ));
        svg.push_str("    </g>\n");
    }

    svg.push_str("  </g>\n</svg>\n");
    svg
}

/// Writes the frame SVG next to the other run artifacts.
pub fn write_frame_svg(
    path: &Path,
    config: &RunConfig,
    layout: &NailLayout,
    output: &RunOutput,
) -> Result<()> {
    std::fs::write(path, render_frame_svg(config, layout, output))
        .with_context(|| format!("Failed to write frame SVG to {}", path.display()))
}
