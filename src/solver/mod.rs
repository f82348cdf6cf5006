// src/solver/mod.rs
//! The greedy chord solver: a coordinator thread, a pool of evaluator
//! workers, and the message protocol between them.
//!
//! - Coordinator: owns the authoritative canvas and the iteration loop
//! - EvalWorker: scores candidate chords against its own state replica
//! - Messages: command/acknowledgement protocol; all state moves by value
//!
//! The public surface is [`start`] (one run) and [`Session`] (serialized
//! runs with supersede-on-start).

pub mod coordinator;
mod messages;
mod worker;

pub use coordinator::{
    start, ProgressEvent, RunHandle, RunOutput, Session, Step, StopReason, StrandState,
};
