// src/solver/coordinator.rs
//! The coordinator: owns the authoritative canvas and drives the search.
//!
//! Each iteration runs four phases in lockstep with the evaluator pool:
//! dispatch (one Evaluate per strand per worker), collect (file every
//! reply under its dispatch slot), reduce (pick the single best candidate
//! across all strands and ranges), and commit (composite the winner into
//! the authoritative canvas, broadcast Commit and RecordForbidden to every
//! worker, and wait for both acknowledgements from each). Nothing is
//! dispatched for iteration n+1 until every worker has acknowledged
//! iteration n, so between iterations every replica is byte-identical to
//! the coordinator's canvas.

use std::mem;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, ensure, Context, Result};
use log::*;

use crate::canvas::PixelBuffer;
use crate::color::Rgba;
use crate::config::RunConfig;
use crate::geometry::{NailLayout, PixelPoint};
use crate::raster;

use super::messages::{Candidate, EvalRequest, WorkerCommand, WorkerReply};
use super::worker::{spawn_pool, WorkerPool};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured connection budget was spent.
    MaxIterations,
    /// No candidate chord anywhere improved the canvas.
    Exhausted,
    /// The run was cancelled before it finished on its own.
    Cancelled,
}

/// One committed chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Index of the strand that drew the chord.
    pub strand: usize,
    /// Nail the chord left from.
    pub from: usize,
    /// Nail the chord arrived at.
    pub to: usize,
}

/// Progress notification, sent once per committed chord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// 0-based index of the committed iteration.
    pub iteration: usize,
    /// The configured iteration budget.
    pub max_iterations: usize,
    /// The committed chord.
    pub step: Step,
    /// Ink color of the committing strand.
    pub color: Rgba,
}

/// Per-strand solver state: ink color, current nail, and path history.
#[derive(Debug, Clone)]
pub struct StrandState {
    color: Rgba,
    current: usize,
    path: Vec<usize>,
}

impl StrandState {
    pub(crate) fn new(color: Rgba, start_nail: usize) -> Self {
        StrandState {
            color,
            current: start_nail,
            path: vec![start_nail],
        }
    }

    /// Ink color of the strand.
    pub fn color(&self) -> Rgba {
        self.color
    }

    /// The nail the strand is parked at, always the last path entry.
    pub fn current_nail(&self) -> usize {
        self.current
    }

    /// Every nail visited in order, starting nail included.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Consumes the record and returns its successor, extended to `dst`.
    fn advanced(mut self, dst: usize) -> Self {
        self.path.push(dst);
        self.current = dst;
        self
    }
}

impl Default for StrandState {
    fn default() -> Self {
        StrandState::new(Rgba::BLACK, 0)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Final state of every strand, in roster order.
    pub strands: Vec<StrandState>,
    /// Every committed chord, in commit order.
    pub order: Vec<Step>,
    /// Number of committed iterations, equal to `order.len()`.
    pub iterations: usize,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// The final canvas.
    pub canvas: PixelBuffer,
}

/// The coordinator state machine. Runs on its own thread; owns the
/// evaluator pool for its whole lifetime.
struct Coordinator {
    canvas: PixelBuffer,
    nails: Vec<PixelPoint>,
    fade: f64,
    max_iterations: usize,
    strands: Vec<StrandState>,
    ranges: Vec<Range<usize>>,
    pool: WorkerPool,
    cancel: Arc<AtomicBool>,
    progress_tx: Sender<ProgressEvent>,
    order: Vec<Step>,
}

impl Coordinator {
    /// Validates the setup and spawns the evaluator pool.
    ///
    /// Every nail must lie inside the target buffer; the working canvas is
    /// created here with the target's dimensions and the configured
    /// background fill.
    fn new(
        config: &RunConfig,
        layout: &NailLayout,
        target: PixelBuffer,
        cancel: Arc<AtomicBool>,
        progress_tx: Sender<ProgressEvent>,
    ) -> Result<Self> {
        config.validate()?;
        ensure!(
            layout.len() == config.solver.nails as usize,
            "nail layout holds {} nails but the config asks for {}",
            layout.len(),
            config.solver.nails
        );
        let nails = layout.pixel_points().to_vec();
        for (i, p) in nails.iter().enumerate() {
            ensure!(
                p.x >= 0
                    && (p.x as u32) < target.width()
                    && p.y >= 0
                    && (p.y as u32) < target.height(),
                "nail {} at ({}, {}) lies outside the {}x{} target buffer",
                i,
                p.x,
                p.y,
                target.width(),
                target.height()
            );
        }

        let canvas = PixelBuffer::filled(target.width(), target.height(), config.solver.background);
        let fade = config.fade();
        let pool_size = config.pool_size();
        let pool = spawn_pool(pool_size, &target, &canvas, &nails, fade)?;
        let strands = config
            .strands
            .iter()
            .map(|s| StrandState::new(s.color, s.start_nail as usize))
            .collect();
        let ranges = partition_ranges(nails.len(), pool_size);

        Ok(Coordinator {
            canvas,
            nails,
            fade,
            max_iterations: config.solver.max_connections as usize,
            strands,
            ranges,
            pool,
            cancel,
            progress_tx,
            order: Vec::new(),
        })
    }

    /// Runs the search to completion, cancellation, or exhaustion.
    fn run(mut self) -> Result<RunOutput> {
        self.wait_ready()?;
        info!(
            "Coordinator: pool ready, searching with {} strands, {} workers, {} nails",
            self.strands.len(),
            self.pool.command_txs.len(),
            self.nails.len()
        );

        let mut iterations = 0;
        let stop_reason = loop {
            if iterations == self.max_iterations {
                info!("Coordinator: iteration budget of {} spent", iterations);
                break StopReason::MaxIterations;
            }
            if self.cancelled() {
                info!("Coordinator: cancelled after {} iterations", iterations);
                break StopReason::Cancelled;
            }

            self.dispatch()?;
            let slots = self.collect()?;
            if self.cancelled() {
                // Collected candidates are discarded, never applied.
                info!("Coordinator: cancelled after {} iterations", iterations);
                break StopReason::Cancelled;
            }

            let Some(winner) = reduce(&slots, self.pool.command_txs.len()) else {
                info!(
                    "Coordinator: no improving chord anywhere, stopping after {} iterations",
                    iterations
                );
                break StopReason::Exhausted;
            };

            self.commit(winner, iterations)?;
            iterations += 1;
        };

        debug!("Coordinator: shutting down evaluator pool");
        Ok(RunOutput {
            strands: self.strands,
            order: self.order,
            iterations,
            stop_reason,
            canvas: self.canvas,
        })
    }

    /// Waits for every worker's Ready announcement.
    fn wait_ready(&self) -> Result<()> {
        for _ in 0..self.pool.command_txs.len() {
            match self
                .pool
                .reply_rx
                .recv()
                .context("evaluator pool disconnected during startup")?
            {
                WorkerReply::Ready { worker } => trace!("Coordinator: worker {} ready", worker),
                other => bail!("expected Ready during startup, got {:?}", other),
            }
        }
        Ok(())
    }

    /// Sends one Evaluate per (strand, worker) pair.
    ///
    /// Slots are numbered strand-major, worker-minor, which fixes the
    /// order the reduce scans candidates in.
    fn dispatch(&self) -> Result<()> {
        let pool_size = self.pool.command_txs.len();
        for (strand_index, strand) in self.strands.iter().enumerate() {
            for (worker_index, tx) in self.pool.command_txs.iter().enumerate() {
                let request = EvalRequest {
                    slot: strand_index * pool_size + worker_index,
                    strand: strand_index,
                    src: strand.current_nail(),
                    color: strand.color(),
                    range: self.ranges[worker_index].clone(),
                };
                tx.send(WorkerCommand::Evaluate(request))
                    .context("evaluator worker disconnected during dispatch")?;
            }
        }
        Ok(())
    }

    /// Gathers every Evaluated reply into its dispatch slot, regardless of
    /// arrival order.
    fn collect(&self) -> Result<Vec<Option<Candidate>>> {
        let expected = self.strands.len() * self.pool.command_txs.len();
        let mut slots: Vec<Option<Option<Candidate>>> = vec![None; expected];
        for _ in 0..expected {
            match self
                .pool
                .reply_rx
                .recv()
                .context("evaluator pool disconnected during evaluation")?
            {
                WorkerReply::Evaluated { worker, slot, best } => {
                    trace!("Coordinator: slot {} answered by worker {}", slot, worker);
                    ensure!(slot < expected, "evaluation reply for unknown slot {}", slot);
                    ensure!(
                        slots[slot].is_none(),
                        "duplicate evaluation reply for slot {}",
                        slot
                    );
                    slots[slot] = Some(best);
                }
                other => bail!("expected Evaluated during evaluation, got {:?}", other),
            }
        }
        Ok(slots.into_iter().map(|slot| slot.flatten()).collect())
    }

    /// Applies the winning chord to the authoritative canvas, broadcasts
    /// it to the pool, and waits for both acknowledgements from every
    /// worker before advancing strand state.
    fn commit(&mut self, winner: Winner, iteration: usize) -> Result<()> {
        let src = self.strands[winner.strand].current_nail();
        let dst = winner.candidate.nail;
        let color = self.strands[winner.strand].color();
        debug!(
            "Coordinator: iteration {}: strand {} chord {} -> {} (score {:.3})",
            iteration, winner.strand, src, dst, winner.candidate.score
        );

        let width = self.canvas.width();
        let pixels = raster::line_pixels(self.nails[src], self.nails[dst]);
        raster::blend_line(&pixels, self.fade, color, self.canvas.data_mut(), width);

        for tx in &self.pool.command_txs {
            tx.send(WorkerCommand::Commit { src, dst, color })
                .context("evaluator worker disconnected during commit broadcast")?;
            tx.send(WorkerCommand::RecordForbidden {
                strand: winner.strand,
                src,
                dst,
            })
            .context("evaluator worker disconnected during commit broadcast")?;
        }
        let pool_size = self.pool.command_txs.len();
        let mut committed = 0;
        let mut recorded = 0;
        while committed < pool_size || recorded < pool_size {
            match self
                .pool
                .reply_rx
                .recv()
                .context("evaluator pool disconnected during commit barrier")?
            {
                WorkerReply::Committed { .. } => committed += 1,
                WorkerReply::ForbiddenRecorded { .. } => recorded += 1,
                other => bail!("expected commit acknowledgement, got {:?}", other),
            }
        }

        let state = mem::take(&mut self.strands[winner.strand]);
        self.strands[winner.strand] = state.advanced(dst);
        let step = Step {
            strand: winner.strand,
            from: src,
            to: dst,
        };
        self.order.push(step);
        // The progress receiver may already be gone; that is not an error.
        let _ = self.progress_tx.send(ProgressEvent {
            iteration,
            max_iterations: self.max_iterations,
            step,
            color,
        });
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// The globally best candidate of one iteration.
#[derive(Debug, Clone, Copy)]
struct Winner {
    strand: usize,
    candidate: Candidate,
}

/// Scans collected slots in dispatch order and returns the candidate with
/// the strictly lowest score. Earlier slots win ties, so the outcome never
/// depends on reply arrival order.
fn reduce(slots: &[Option<Candidate>], pool_size: usize) -> Option<Winner> {
    let mut winner: Option<Winner> = None;
    for (slot, candidate) in slots.iter().enumerate() {
        let Some(candidate) = candidate else {
            continue;
        };
        if winner
            .as_ref()
            .map_or(true, |w| candidate.score < w.candidate.score)
        {
            winner = Some(Winner {
                strand: slot / pool_size,
                candidate: *candidate,
            });
        }
    }
    winner
}

/// Splits `0..nail_count` into `pool_size` contiguous ranges of
/// `ceil(nail_count / pool_size)` nails each. Trailing ranges may be short
/// or empty when the division is uneven.
fn partition_ranges(nail_count: usize, pool_size: usize) -> Vec<Range<usize>> {
    let per_worker = nail_count.div_ceil(pool_size);
    (0..pool_size)
        .map(|w| {
            let start = (w * per_worker).min(nail_count);
            let end = ((w + 1) * per_worker).min(nail_count);
            start..end
        })
        .collect()
}

/// Handle to a run executing on background threads.
///
/// Dropping the handle cancels the run and joins the coordinator thread.
pub struct RunHandle {
    cancel: Arc<AtomicBool>,
    progress_rx: Receiver<ProgressEvent>,
    thread: Option<JoinHandle<Result<RunOutput>>>,
}

impl RunHandle {
    /// Requests cancellation. Safe to call at any time; a run that has
    /// already finished ignores it.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Progress events, one per committed chord.
    pub fn progress(&self) -> &Receiver<ProgressEvent> {
        &self.progress_rx
    }

    /// True once the coordinator thread has finished.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the run to finish and returns its output.
    pub fn join(mut self) -> Result<RunOutput> {
        let thread = self.thread.take().context("run already joined")?;
        match thread.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("coordinator thread panicked")),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel.store(true, Ordering::Relaxed);
            if thread.join().is_err() {
                error!("coordinator thread panicked during shutdown");
            }
        }
    }
}

/// Starts a run on background threads.
///
/// The evaluator pool is spawned and seeded here, synchronously, so
/// configuration and setup errors surface immediately; errors inside the
/// search loop surface on [`RunHandle::join`].
///
/// # Arguments
///
/// * `config` - Validated against the supported parameter ranges
/// * `layout` - Nail table; every nail must lie inside `target`
/// * `target` - The image the canvas is pulled toward (takes ownership)
pub fn start(config: &RunConfig, layout: &NailLayout, target: PixelBuffer) -> Result<RunHandle> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (progress_tx, progress_rx) = channel();
    let coordinator = Coordinator::new(config, layout, target, Arc::clone(&cancel), progress_tx)?;
    let thread = thread::Builder::new()
        .name("coordinator".to_string())
        .spawn(move || coordinator.run())
        .context("Failed to spawn coordinator thread")?;

    info!("Run started");
    Ok(RunHandle {
        cancel,
        progress_rx,
        thread: Some(thread),
    })
}

/// Owns at most one active run.
///
/// Starting a run while another is active cancels and joins the active one
/// first, so two coordinators never race for the caller's attention.
#[derive(Default)]
pub struct Session {
    active: Option<RunHandle>,
}

impl Session {
    /// Creates an idle session.
    pub fn new() -> Self {
        Session { active: None }
    }

    /// Starts a run, superseding any run already active.
    pub fn start(
        &mut self,
        config: &RunConfig,
        layout: &NailLayout,
        target: PixelBuffer,
    ) -> Result<()> {
        if let Some(previous) = self.active.take() {
            info!("Session: superseding active run");
            drop(previous);
        }
        self.active = Some(start(config, layout, target)?);
        Ok(())
    }

    /// Cancels the active run. A no-op on an idle session.
    pub fn cancel(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    /// Progress receiver of the active run, if any.
    pub fn progress(&self) -> Option<&Receiver<ProgressEvent>> {
        self.active.as_ref().map(RunHandle::progress)
    }

    /// Waits for the active run and returns its output, or `None` when the
    /// session is idle.
    pub fn join(&mut self) -> Result<Option<RunOutput>> {
        match self.active.take() {
            Some(handle) => handle.join().map(Some),
            None => Ok(None),
        }
    }
}
