//! Whole-image synthesis
//!
//! Lays out the final program image below the preinitialized boundary:
//! the bootstrap code, the generated initialization code, the jump to the
//! entry point, filler, and the two-byte marker that shapes the memory fill
//! above the image.

use trit_vm::{
    constants::{MEMORY_SIZE, OPCODE_PERIOD},
    is_valid_initial_byte, Mnemonic, Word,
};

use crate::{
    bootstrap::{BOOTSTRAP_IMAGE, SKIPPED_STEPS},
    denormalize::denormalize,
    emitter::Emitter,
    state::MachineState,
    Result, SynthError,
};

/// Marker written at `last_preinitialized - 1` and `last_preinitialized`
pub const END_MARKER: [u8; 2] = *b"RQ";

/// Residues modulo 94 at which the marker decodes to valid instructions
pub const MARKER_RESIDUES: [usize; 8] = [16, 17, 35, 51, 52, 74, 80, 93];

/// Whether the marker may start at `address`
pub fn is_marker_position(address: usize) -> bool {
    MARKER_RESIDUES.contains(&(address % OPCODE_PERIOD as usize))
}

/// Whether failures are reported or only traced at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Diagnostics {
    #[default]
    Report,
    /// Used for speculative attempts whose failure is expected
    Silent,
}

impl Diagnostics {
    pub fn report(self, context: &str, err: &SynthError) {
        match self {
            Diagnostics::Report => tracing::warn!(%err, "{context}"),
            Diagnostics::Silent => tracing::debug!(%err, "{context}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthOptions {
    pub diagnostics: Diagnostics,
}

/// A finished program image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    /// Bytes for addresses `0..=last_preinitialized`
    pub bytes: Vec<u8>,
    /// Instructions executed before the entry point is reached
    pub steps_until_entry: usize,
    /// First address after the jump to the entry point
    pub init_code_end: usize,
}

/// Build the program image.
///
/// `program` holds the wanted value for every address (`None` where the
/// value does not matter). Cells up to `last_preinitialized` are written
/// directly into the image; the rest are produced by generated code.
pub fn synthesize(
    program: &[Option<Word>],
    last_preinitialized: Word,
    entry: Word,
    options: &SynthOptions,
) -> Result<Synthesized> {
    build(program, last_preinitialized, entry).inspect_err(|err| {
        options
            .diagnostics
            .report("initialization code could not be generated", err)
    })
}

fn build(program: &[Option<Word>], last_preinitialized: Word, entry: Word) -> Result<Synthesized> {
    if program.len() != MEMORY_SIZE {
        return Err(SynthError::InvalidRequest(format!(
            "program image has {} cells",
            program.len()
        )));
    }
    let last = last_preinitialized as usize;
    let bootstrap_len = BOOTSTRAP_IMAGE.len();
    if last <= bootstrap_len || last >= MEMORY_SIZE - 1 {
        return Err(SynthError::InvalidRequest(format!(
            "preinitialized boundary {last} out of range"
        )));
    }
    if !is_marker_position(last - 1) {
        return Err(SynthError::InvalidRequest(format!(
            "end marker cannot be placed at {}",
            last - 1
        )));
    }

    let mut emitter = Emitter::new(
        MachineState::bootstrap(last_preinitialized),
        MEMORY_SIZE - bootstrap_len,
    );

    for (address, value) in program.iter().enumerate().skip(last + 1) {
        if let Some(value) = *value {
            emitter.init_cell(address as Word, value)?;
        }
    }
    emitter.jump_to_entry(entry)?;

    let mut code = emitter.into_code();
    let jump_at = bootstrap_len + code.len();
    code.push(Mnemonic::Jmp);
    let init_code_end = jump_at + 1;

    if init_code_end > last - 1 {
        return Err(SynthError::OutOfSpace);
    }

    if let Some(address) = (2..init_code_end)
        .chain(last - 1..=last)
        .find(|&i| program[i].is_some())
    {
        return Err(SynthError::Overlap(address as Word));
    }

    code.resize(last - 1 - bootstrap_len, Mnemonic::Nop);

    let mut bytes = Vec::with_capacity(last + 1);
    bytes.extend_from_slice(BOOTSTRAP_IMAGE);
    bytes.extend(denormalize(&code, bootstrap_len));
    bytes.extend_from_slice(&END_MARKER);

    for (address, byte) in bytes.iter().enumerate().take(2) {
        if let Some(value) = program[address] {
            if value != *byte as Word {
                return Err(SynthError::Overlap(address as Word));
            }
        }
    }

    for address in init_code_end..last - 1 {
        if let Some(value) = program[address] {
            if !is_valid_initial_byte(address as u32, value) {
                return Err(SynthError::Inconsistency(format!(
                    "value {value} cannot be placed at {address}"
                )));
            }
            bytes[address] = value as u8;
        }
    }

    Ok(Synthesized {
        bytes,
        steps_until_entry: jump_at - SKIPPED_STEPS,
        init_code_end,
    })
}
