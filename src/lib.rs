//! Back end of an assembler for a ternary, self-modifying virtual machine.
//!
//! A resolved [`Program`] is laid out in memory, every cell's target value
//! is computed, and [`init_synth`] generates the code that writes those
//! values at run time before jumping to the entry point.
//!
//! ```no_run
//! use trit_forge::{compile, CompileOptions, Program};
//!
//! let program = Program::from_json(&std::fs::read_to_string("prog.json")?)?;
//! let compiled = compile(&program, &CompileOptions::default())?;
//! std::fs::write("prog.mb", &compiled.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cycle;
pub mod debug_info;
pub mod driver;
mod error;
pub mod eval;
pub mod layout;
pub mod program;

pub use cycle::{start_symbol, XlatCycle};
pub use debug_info::DebugInfo;
pub use driver::{compile, CompileOptions, CompiledProgram};
pub use error::{CompileError, Result};
pub use program::{Element, Program, Section, SourceSpan};

pub use init_synth::Diagnostics;
