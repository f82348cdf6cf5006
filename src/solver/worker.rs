// src/solver/worker.rs
//! Evaluator worker - one replica of the solver state on its own thread.
//!
//! Each worker is seeded at spawn with a full snapshot (target buffer,
//! canvas, nail table, fade) and from then on changes state only by
//! applying the commands it receives, in order. As long as every worker
//! sees the same committed chords, every replica stays byte-identical to
//! the coordinator's canvas without ever sharing memory with it.
//!
//! Threading model:
//! - Owns: target and canvas replicas, line cache, forbidden-edge sets
//! - One reply per command: the coordinator's barriers count
//!   acknowledgements, so a worker never answers out of protocol

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::*;

use crate::canvas::PixelBuffer;
use crate::color::Rgba;
use crate::geometry::PixelPoint;
use crate::raster;

use super::messages::{Candidate, EvalRequest, WorkerCommand, WorkerReply};

/// Memoizes rasterized chords per unordered nail pair.
///
/// Keys are canonical `(min, max)` pairs and the stored walk runs from the
/// lower-numbered nail, so both traversal directions of a chord share one
/// entry and every replica stores the identical pixel list.
#[derive(Debug, Default)]
pub(crate) struct LineCache {
    lines: HashMap<(usize, usize), Vec<PixelPoint>>,
}

impl LineCache {
    /// Returns the pixels of the chord between nails `a` and `b`,
    /// rasterizing on first use.
    fn get_or_rasterize(&mut self, nails: &[PixelPoint], a: usize, b: usize) -> &[PixelPoint] {
        let key = (a.min(b), a.max(b));
        self.lines
            .entry(key)
            .or_insert_with(|| raster::line_pixels(nails[key.0], nails[key.1]))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lines.len()
    }
}

/// One evaluator replica.
#[derive(Debug)]
pub(crate) struct EvalWorker {
    index: usize,
    target: PixelBuffer,
    canvas: PixelBuffer,
    nails: Vec<PixelPoint>,
    fade: f64,
    cache: LineCache,
    forbidden: HashMap<(usize, usize), HashSet<usize>>,
}

impl EvalWorker {
    /// Creates a worker from its state snapshot.
    pub(crate) fn new(
        index: usize,
        target: PixelBuffer,
        canvas: PixelBuffer,
        nails: Vec<PixelPoint>,
        fade: f64,
    ) -> Self {
        EvalWorker {
            index,
            target,
            canvas,
            nails,
            fade,
            cache: LineCache::default(),
            forbidden: HashMap::new(),
        }
    }

    /// Scans the request's nail range and returns the best improving
    /// candidate, or `None` when no chord in the range scores below zero.
    ///
    /// The strand's current nail is skipped, a forbidden
    /// `(strand, src) -> dst` edge has its score forced to zero, and ties
    /// keep the earliest nail, so the result is a pure function of the
    /// replica state and the request.
    pub(crate) fn evaluate(&mut self, request: &EvalRequest) -> Option<Candidate> {
        let forbidden = self.forbidden.get(&(request.strand, request.src));
        let width = self.target.width();
        let mut best_score = f64::INFINITY;
        let mut best_nail = None;
        for nail in request.range.clone() {
            if nail == request.src {
                continue;
            }
            let pixels = self.cache.get_or_rasterize(&self.nails, request.src, nail);
            let mut score = raster::score_line(
                pixels,
                self.fade,
                request.color,
                self.target.data(),
                self.canvas.data(),
                width,
            );
            if forbidden.map_or(false, |set| set.contains(&nail)) {
                score = 0.0;
            }
            if score < best_score {
                best_score = score;
                best_nail = Some(nail);
            }
        }
        match best_nail {
            Some(nail) if best_score < 0.0 => Some(Candidate {
                nail,
                score: best_score,
            }),
            _ => None,
        }
    }

    /// Composites a committed chord into the canvas replica.
    pub(crate) fn apply_commit(&mut self, src: usize, dst: usize, color: Rgba) {
        let width = self.canvas.width();
        let pixels = self.cache.get_or_rasterize(&self.nails, src, dst);
        raster::blend_line(pixels, self.fade, color, self.canvas.data_mut(), width);
    }

    /// Records a used directed edge.
    pub(crate) fn record_forbidden(&mut self, strand: usize, src: usize, dst: usize) {
        self.forbidden.entry((strand, src)).or_default().insert(dst);
    }

    #[cfg(test)]
    pub(crate) fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Runs the worker loop: announce readiness, then apply and
    /// acknowledge commands until the command channel closes.
    fn run(mut self, commands: Receiver<WorkerCommand>, replies: Sender<WorkerReply>) {
        debug!("EvalWorker {}: thread started", self.index);

        if replies.send(WorkerReply::Ready { worker: self.index }).is_err() {
            warn!("EvalWorker {}: coordinator gone before ready", self.index);
            return;
        }

        loop {
            match commands.recv() {
                Ok(WorkerCommand::Evaluate(request)) => {
                    trace!(
                        "EvalWorker {}: evaluating strand {} over {:?}",
                        self.index,
                        request.strand,
                        request.range
                    );
                    let best = self.evaluate(&request);
                    let reply = WorkerReply::Evaluated {
                        worker: self.index,
                        slot: request.slot,
                        best,
                    };
                    if replies.send(reply).is_err() {
                        break;
                    }
                }
                Ok(WorkerCommand::Commit { src, dst, color }) => {
                    trace!("EvalWorker {}: commit {} -> {}", self.index, src, dst);
                    self.apply_commit(src, dst, color);
                    if replies
                        .send(WorkerReply::Committed { worker: self.index })
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(WorkerCommand::RecordForbidden { strand, src, dst }) => {
                    self.record_forbidden(strand, src, dst);
                    if replies
                        .send(WorkerReply::ForbiddenRecorded { worker: self.index })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(_) => {
                    debug!("EvalWorker {}: command channel closed, exiting", self.index);
                    break;
                }
            }
        }

        debug!("EvalWorker {}: thread stopped", self.index);
    }
}

/// Channels and join handles for a running evaluator pool.
///
/// Dropping the pool closes every command channel, which is the workers'
/// shutdown signal, then joins their threads.
pub(crate) struct WorkerPool {
    pub(crate) command_txs: Vec<Sender<WorkerCommand>>,
    pub(crate) reply_rx: Receiver<WorkerReply>,
    handles: Vec<JoinHandle<()>>,
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.command_txs.clear();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                error!("evaluator worker panicked: {:?}", e);
            }
        }
    }
}

/// Spawns `pool_size` evaluator threads, each seeded with its own copy of
/// the solver state. Each worker announces itself with a Ready reply once
/// it is running.
pub(crate) fn spawn_pool(
    pool_size: usize,
    target: &PixelBuffer,
    canvas: &PixelBuffer,
    nails: &[PixelPoint],
    fade: f64,
) -> Result<WorkerPool> {
    debug!("spawn_pool: starting {} evaluator workers", pool_size);

    let (reply_tx, reply_rx) = channel();
    let mut command_txs = Vec::with_capacity(pool_size);
    let mut handles = Vec::with_capacity(pool_size);
    for index in 0..pool_size {
        let (command_tx, command_rx) = channel();
        let worker = EvalWorker::new(
            index,
            target.clone(),
            canvas.clone(),
            nails.to_vec(),
            fade,
        );
        let replies = reply_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("evaluator-{}", index))
            .spawn(move || worker.run(command_rx, replies))
            .with_context(|| format!("Failed to spawn evaluator worker {}", index))?;
        command_txs.push(command_tx);
        handles.push(handle);
    }

    Ok(WorkerPool {
        command_txs,
        reply_rx,
        handles,
    })
}
