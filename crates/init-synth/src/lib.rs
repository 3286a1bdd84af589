//! Initialization-code synthesis
//!
//! Given the desired contents of every memory cell above the preinitialized
//! boundary, this crate produces a prefix of machine code that writes those
//! cells at run time and then jumps to the program's entry point. The
//! machine only offers a rotate and a ternary combine instruction, so every
//! value has to be built from a handful of known constants kept in four small
//! constant-generation modules that the bootstrap image sets up.
//!
//! # Pipeline
//!
//! - [`planner`] picks the constant to combine with and how to build it
//! - [`state`] mirrors the machine while code is being emitted
//! - [`emitter`] appends mnemonics and steers the data pointer
//! - [`cell`] writes one cell and manages the destination pointer
//! - [`image`] drives the whole run and produces the final bytes
//! - [`denormalize`] turns mnemonics into position-dependent bytes

pub mod bootstrap;
pub mod cell;
pub mod denormalize;
pub mod emitter;
pub mod image;
pub mod planner;
pub mod state;

use thiserror::Error;
use trit_vm::Word;

pub use emitter::Emitter;
pub use image::{is_marker_position, synthesize, Diagnostics, SynthOptions, Synthesized};
pub use planner::{best_source_for_combine, plan_constant, ConstantPlan};
pub use state::{CellKind, DataPointer, Location, MachineState, Module, ModuleCell};

/// Errors raised while synthesizing initialization code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// The emitted code no longer fits into the space it was given
    #[error("initialization code exceeds the available space")]
    OutOfSpace,

    /// A program cell collides with the initialization code or its end marker
    #[error("program cell {0} overlaps the initialization code")]
    Overlap(Word),

    /// The data pointer reached a state the module layout does not allow
    #[error("addressing inconsistency: {0}")]
    Addressing(String),

    /// A step that must succeed by construction did not
    #[error("internal inconsistency: {0}")]
    Inconsistency(String),

    /// The caller handed over a request that cannot be honoured
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SynthError {
    /// Whether a larger initialization budget could make the attempt succeed.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, SynthError::OutOfSpace | SynthError::Overlap(_))
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
