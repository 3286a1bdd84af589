//! Opcodes, positional decoding and the substitution table

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::constants::{FIRST_PRINTABLE, LAST_PRINTABLE, OPCODE_PERIOD};

/// Bytes written back to a cell after it has been executed, indexed by `byte - 33`.
#[rustfmt::skip]
pub const SUBSTITUTION: &[u8; 94] = b"5z]&gqtyfr$(we4{WP)H-Zn,[%\\3dL+Q;>U!pJS72FhOA1CB6v^=I_0/8|jsb9m<.TVac`uY*MK'X~xDl}REokN:#?G\"i@";

/// For every position modulo 94, a byte whose substitution chain never
/// decodes to anything but a no-op at that position.
#[rustfmt::skip]
pub const IMMUTABLE_NOPS: &[u8; 94] = b"FFFFFF>><<::FFFFF3FFFFFF***)))FFFFFFF}FFFFxxFFFrroooFFFFFFF**FF**FFFFFFFFFFFFFFFFPPF**LJJFFFFF";

/// Instructions the machine distinguishes. Every other decoded value behaves
/// like [`Opcode::Nop`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Opcode {
    /// `c = [d]`
    Jmp = 4,
    /// Write `a % 256` to the output
    Out = 5,
    /// Read one byte into `a`
    In = 23,
    /// `a = [d] = rotate_right([d])`
    Rot = 39,
    /// `d = [d]`
    MovD = 40,
    /// `a = [d] = combine(a, [d])`
    Opr = 62,
    Nop = 68,
    Halt = 81,
}

impl Opcode {
    /// Map a decoded instruction value (`0..94`) to an opcode.
    pub fn from_instruction(value: u32) -> Option<Opcode> {
        Opcode::iter().find(|op| *op as u32 == value)
    }

    /// Decode the byte stored at `position`.
    pub fn decode(byte: u32, position: u32) -> Option<Opcode> {
        Opcode::from_instruction((byte + position) % OPCODE_PERIOD)
    }

    pub fn is_nop(self) -> bool {
        self == Opcode::Nop
    }

    /// The printable byte that decodes to this opcode at `position`.
    pub fn byte_at(self, position: u32) -> u8 {
        let mut byte = (self as u32 + OPCODE_PERIOD - position % OPCODE_PERIOD) % OPCODE_PERIOD;
        if byte < FIRST_PRINTABLE as u32 {
            byte += OPCODE_PERIOD;
        }
        byte as u8
    }
}

/// `true` unless `instruction` is one of the seven opcodes with an effect.
pub fn is_nop(instruction: u32) -> bool {
    !matches!(
        Opcode::from_instruction(instruction),
        Some(op) if op != Opcode::Nop
    )
}

/// Apply the post-execution substitution to a printable byte.
pub fn translate(byte: u8) -> Option<u8> {
    if (FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&byte) {
        Some(SUBSTITUTION[(byte - FIRST_PRINTABLE) as usize])
    } else {
        None
    }
}

/// Whether `byte` may appear at `position` in a program file.
///
/// The loader rejects anything outside `33..=126` or anything that does not
/// decode to one of the eight opcodes.
pub fn is_valid_initial_byte(position: u32, byte: u32) -> bool {
    if byte < FIRST_PRINTABLE as u32 || byte > LAST_PRINTABLE as u32 {
        return false;
    }
    Opcode::decode(byte, position).is_some()
}

/// Position-independent spelling of an opcode.
///
/// Generated code is first written as mnemonics and only later turned into
/// bytes for the addresses it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Mnemonic {
    Nop,
    MovD,
    Opr,
    Rot,
    Jmp,
    Out,
    In,
    Halt,
}

impl Mnemonic {
    pub fn as_char(self) -> char {
        match self {
            Mnemonic::Nop => 'o',
            Mnemonic::MovD => 'j',
            Mnemonic::Opr => 'p',
            Mnemonic::Rot => '*',
            Mnemonic::Jmp => 'i',
            Mnemonic::Out => '<',
            Mnemonic::In => '/',
            Mnemonic::Halt => 'v',
        }
    }

    pub fn from_char(c: char) -> Option<Mnemonic> {
        Mnemonic::iter().find(|m| m.as_char() == c)
    }

    pub fn opcode(self) -> Opcode {
        match self {
            Mnemonic::Nop => Opcode::Nop,
            Mnemonic::MovD => Opcode::MovD,
            Mnemonic::Opr => Opcode::Opr,
            Mnemonic::Rot => Opcode::Rot,
            Mnemonic::Jmp => Opcode::Jmp,
            Mnemonic::Out => Opcode::Out,
            Mnemonic::In => Opcode::In,
            Mnemonic::Halt => Opcode::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_is_a_permutation() {
        let mut seen = [false; 94];
        for &b in SUBSTITUTION.iter() {
            assert!((33..=126).contains(&b));
            assert!(!seen[(b - 33) as usize], "duplicate byte {b}");
            seen[(b - 33) as usize] = true;
        }
    }

    #[test]
    fn test_translate_rejects_unprintable() {
        assert_eq!(translate(32), None);
        assert_eq!(translate(127), None);
        assert_eq!(translate(b'!'), Some(b'5'));
        assert_eq!(translate(b'~'), Some(b'@'));
    }

    #[test]
    fn test_byte_at_round_trips_through_decode() {
        for op in Opcode::iter() {
            for position in [0, 1, 2, 93, 94, 500, 59048] {
                let byte = op.byte_at(position);
                assert!((33..=126).contains(&byte));
                assert_eq!(Opcode::decode(byte as u32, position), Some(op));
                assert!(is_valid_initial_byte(position, byte as u32));
            }
        }
    }

    #[test]
    fn test_valid_initial_byte() {
        // 'b' at position 0 decodes to 98 % 94 = 4 (jmp)
        assert!(is_valid_initial_byte(0, b'b' as u32));
        // 'a' at position 0 decodes to 3, not an opcode
        assert!(!is_valid_initial_byte(0, b'a' as u32));
        assert!(!is_valid_initial_byte(0, 200));
        assert!(!is_valid_initial_byte(0, 10));
    }

    #[test]
    fn test_is_nop() {
        assert!(is_nop(68));
        assert!(is_nop(0));
        assert!(is_nop(93));
        assert!(!is_nop(4));
        assert!(!is_nop(81));
    }

    #[test]
    fn test_immutable_nops_stay_nops() {
        for position in 0..94u32 {
            let mut byte = IMMUTABLE_NOPS[position as usize];
            for _ in 0..94 {
                assert!(is_nop((byte as u32 + position) % 94), "position {position}");
                byte = translate(byte).unwrap();
            }
        }
    }

    #[test]
    fn test_mnemonic_chars() {
        for m in Mnemonic::iter() {
            assert_eq!(Mnemonic::from_char(m.as_char()), Some(m));
        }
        assert_eq!(Mnemonic::from_char('x'), None);
        assert_eq!(Mnemonic::Rot.opcode(), Opcode::Rot);
    }
}
