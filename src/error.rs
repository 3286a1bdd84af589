use init_synth::SynthError;
use thiserror::Error;
use trit_vm::{VmError, Word};

use crate::program::{Element, SourceSpan};

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("malformed program: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("unknown label {0}")]
    UnknownLabel(String),

    #[error("label {label} points to {target:?}, which does not exist")]
    DanglingLabel { label: String, target: Element },

    #[error("cannot find entry point (label {0}) in data section")]
    MissingEntry(String),

    #[error("label {0} points to a block without placed words")]
    UnplacedLabel(String),

    #[error("offset {0} lies outside the address space")]
    InvalidOffset(Word),

    #[error("literal {0} lies outside the word range")]
    LiteralOutOfRange(Word),

    #[error("forced translation cycle doesn't exist at {}", span.map_or("code block".to_string(), |s| s.to_string()))]
    NoCycle { block: usize, span: Option<SourceSpan> },

    #[error("overlapping offsets in code section")]
    OverlappingCode,

    #[error("overlapping offsets in data section or between code and data section")]
    OverlappingData,

    #[error("code and data sections exceed the address space")]
    SectionsTooBig,

    #[error("not enough memory in the virtual machine or fixed offsets in reserved area")]
    NoMemory,

    #[error("invalid symbol in preinitialized code at {0}")]
    InvalidPreinitializedCode(Word),

    #[error("data word at {0} lies in the preinitialized area")]
    DataInPreinitialized(Word),

    #[error("division by zero")]
    DivisionByZero,

    #[error("operand {0} lies outside the word range")]
    OperandOutOfRange(i64),

    #[error("program too large or fixed offsets conflict with the initialization code")]
    Exhausted,
}

pub type Result<T> = std::result::Result<T, CompileError>;
