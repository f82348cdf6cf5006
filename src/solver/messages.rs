// src/solver/messages.rs
//! Message types for communication between the coordinator and evaluators.
//!
//! This module defines the command/reply protocol the solver runs on.
//! All state crosses thread boundaries by value over these messages; no
//! buffer is ever shared, which is what lets every evaluator keep a
//! replica that is provably identical to the coordinator's canvas.

use std::ops::Range;

use crate::color::Rgba;

/// Commands sent from the coordinator to an evaluator worker.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Scan a nail sub-range for one strand.
    /// Worker responds with Evaluated carrying the request's slot.
    Evaluate(EvalRequest),

    /// Composite a committed chord into the worker's canvas replica.
    /// Worker responds with Committed once the blend has been applied.
    Commit { src: usize, dst: usize, color: Rgba },

    /// Mark the directed edge (strand, src) -> dst as used.
    /// Worker responds with ForbiddenRecorded.
    RecordForbidden {
        strand: usize,
        src: usize,
        dst: usize,
    },
}

/// One evaluation assignment: find the best destination for `strand`,
/// currently parked at `src`, among the nails in `range`.
#[derive(Debug, Clone)]
pub struct EvalRequest {
    /// Dispatch slot. Replies are filed under this index so the reduce
    /// sees candidates in dispatch order, not arrival order.
    pub slot: usize,
    /// Index of the strand being extended.
    pub strand: usize,
    /// The strand's current nail.
    pub src: usize,
    /// The strand's ink color.
    pub color: Rgba,
    /// Half-open range of candidate destination nails.
    pub range: Range<usize>,
}

/// Replies sent from an evaluator worker to the coordinator.
#[derive(Debug, Clone)]
pub enum WorkerReply {
    /// The worker holds its state snapshot and is ready for commands.
    Ready { worker: usize },

    /// Result of one Evaluate: the best improving candidate in the
    /// assigned range, or `None` when nothing there improves the canvas.
    Evaluated {
        worker: usize,
        slot: usize,
        best: Option<Candidate>,
    },

    /// A Commit was applied to the replica.
    Committed { worker: usize },

    /// A RecordForbidden was applied.
    ForbiddenRecorded { worker: usize },
}

/// A candidate destination nail and its score.
///
/// Only improving candidates travel in replies, so `score` is always
/// strictly negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub nail: usize,
    pub score: f64,
}
