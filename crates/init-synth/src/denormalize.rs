//! Conversion between mnemonics and position-dependent bytes

use trit_vm::{Mnemonic, Opcode};

/// Bytes for `code` placed at consecutive addresses starting at `offset`.
pub fn denormalize(code: &[Mnemonic], offset: usize) -> Vec<u8> {
    code.iter()
        .enumerate()
        .map(|(i, m)| m.opcode().byte_at((offset + i) as u32))
        .collect()
}

/// Recover mnemonics from bytes placed at `offset`. Returns `None` if some
/// byte does not decode to an opcode at its address.
pub fn normalize(bytes: &[u8], offset: usize) -> Option<Vec<Mnemonic>> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            let op = Opcode::decode(b as u32, (offset + i) as u32)?;
            Some(match op {
                Opcode::Jmp => Mnemonic::Jmp,
                Opcode::Out => Mnemonic::Out,
                Opcode::In => Mnemonic::In,
                Opcode::Rot => Mnemonic::Rot,
                Opcode::MovD => Mnemonic::MovD,
                Opcode::Opr => Mnemonic::Opr,
                Opcode::Nop => Mnemonic::Nop,
                Opcode::Halt => Mnemonic::Halt,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trit_vm::is_valid_initial_byte;

    #[test]
    fn test_denormalized_bytes_are_loadable() {
        let code = [
            Mnemonic::Nop,
            Mnemonic::MovD,
            Mnemonic::Opr,
            Mnemonic::Rot,
            Mnemonic::Jmp,
            Mnemonic::Halt,
        ];
        for offset in [0, 1433, 59000] {
            let bytes = denormalize(&code, offset);
            for (i, &b) in bytes.iter().enumerate() {
                assert!(is_valid_initial_byte((offset + i) as u32, b as u32));
            }
            assert_eq!(normalize(&bytes, offset).unwrap(), code);
        }
    }

    #[test]
    fn test_known_bytes() {
        // jmp at address 0 is 'b', movd at address 1 is '\''
        assert_eq!(denormalize(&[Mnemonic::Jmp, Mnemonic::MovD], 0), b"b'");
        // below 33 the byte wraps up by 94
        assert_eq!(denormalize(&[Mnemonic::Jmp], 4), vec![94]);
    }

    #[test]
    fn test_normalize_rejects_non_opcodes() {
        assert_eq!(normalize(b"a", 0), None);
    }
}
