//! Ternary virtual machine primitives
//!
//! This crate provides the building blocks shared by the initialization-code
//! synthesizer and the assembler front end. Machine words are ten trits wide,
//! so every value and every address lives in `0..59049`.
//!
//! # Components
//!
//! - **Trinary algebra**: the combine ("crazy") operator, rotation and trit distance
//! - **Opcodes**: positional decoding, the post-execution substitution table and
//!   the normalized mnemonic alphabet
//! - **Machine**: a reference interpreter used to check generated programs
//!
//! # Example
//!
//! ```rust
//! use trit_vm::{combine, rotate_right, constants::C1};
//!
//! assert_eq!(combine(0, 0), C1);
//! assert_eq!(rotate_right(1), 19683);
//! ```

pub mod machine;
pub mod opcode;
pub mod trit;

pub use machine::{Machine, Outcome, VmError};
pub use opcode::{
    is_nop, is_valid_initial_byte, translate, Mnemonic, Opcode, IMMUTABLE_NOPS, SUBSTITUTION,
};
pub use trit::{combine, normalize, rotate_left, rotate_right, trit_distance, Word};

/// Machine-wide constants
pub mod constants {
    use crate::trit::Word;

    /// Number of trits in a machine word
    pub const TRITS: u32 = 10;

    /// Number of addressable cells (3^10)
    pub const MEMORY_SIZE: usize = 59049;

    /// The all-zero word
    pub const C0: Word = 0;

    /// The all-ones word (0t1111111111)
    pub const C1: Word = 29524;

    /// The all-twos word (0t2222222222), also the highest address
    pub const C2: Word = 59048;

    /// Positional opcodes repeat with this period
    pub const OPCODE_PERIOD: u32 = 94;

    /// Lowest byte a program file may contain
    pub const FIRST_PRINTABLE: u8 = 33;

    /// Highest byte a program file may contain
    pub const LAST_PRINTABLE: u8 = 126;
}
