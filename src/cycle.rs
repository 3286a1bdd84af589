//! Translation cycles
//!
//! Every executed cell is rewritten through the substitution table, so a
//! code word that runs more than once has to describe the whole sequence of
//! instructions it passes through. This module finds the byte that starts
//! such a sequence at a given address.

use serde::{Deserialize, Serialize};
use trit_vm::{
    constants::OPCODE_PERIOD,
    is_nop, translate, Opcode, IMMUTABLE_NOPS,
};

/// The instructions a code word must decode to on successive executions.
///
/// A [`Opcode::Nop`] inside a cycle matches any instruction without effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XlatCycle {
    /// Executed at most once; later contents do not matter
    Once(Opcode),
    /// Repeats forever in the given order
    Cycle(Vec<Opcode>),
}

/// The byte that realizes `cycle` at `position`, if one exists.
pub fn start_symbol(cycle: &XlatCycle, position: u32) -> Option<u8> {
    let position = position % OPCODE_PERIOD;

    let ops = match cycle {
        XlatCycle::Once(op) => return Some(op.byte_at(position)),
        XlatCycle::Cycle(ops) => ops,
    };

    let leading_nops = ops.iter().take_while(|op| op.is_nop()).count();
    let Some((first, rest)) = ops[leading_nops..].split_first() else {
        return Some(IMMUTABLE_NOPS[position as usize]);
    };

    let decodes_to = |byte: u8| (byte as u32 + position) % OPCODE_PERIOD;

    let first_byte = first.byte_at(position);
    let mut current = first_byte;
    for op in rest {
        current = translate(current)?;
        let instruction = decodes_to(current);
        if is_nop(instruction) != op.is_nop() {
            return None;
        }
        if !op.is_nop() && instruction != *op as u32 {
            return None;
        }
    }

    let start = translate(current)?;

    for _ in 0..leading_nops {
        current = translate(current)?;
        if !is_nop(decodes_to(current)) {
            return None;
        }
    }

    (translate(current)? == first_byte).then_some(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_is_direct_encoding() {
        for position in [0, 5, 93, 40000] {
            let byte = start_symbol(&XlatCycle::Once(Opcode::Halt), position).unwrap();
            assert_eq!(Opcode::decode(byte as u32, position), Some(Opcode::Halt));
        }
    }

    #[test]
    fn test_nop_cycles_use_immutable_nops() {
        let cycle = XlatCycle::Cycle(vec![Opcode::Nop, Opcode::Nop]);
        assert_eq!(start_symbol(&cycle, 100), Some(IMMUTABLE_NOPS[6]));
        assert_eq!(
            start_symbol(&XlatCycle::Cycle(vec![Opcode::Nop]), 0),
            Some(b'F')
        );
    }

    #[test]
    fn test_found_cycles_replay() {
        let candidates = [
            vec![Opcode::Jmp],
            vec![Opcode::MovD, Opcode::Nop],
            vec![Opcode::Nop, Opcode::Opr],
            vec![Opcode::Rot, Opcode::Nop, Opcode::Nop],
            vec![Opcode::Opr, Opcode::Nop, Opcode::Opr, Opcode::Nop],
        ];
        let mut found = 0;

        for ops in candidates {
            let cycle = XlatCycle::Cycle(ops.clone());
            for position in 0..OPCODE_PERIOD {
                let Some(start) = start_symbol(&cycle, position) else {
                    continue;
                };
                found += 1;

                // replay two full rounds through the substitution table
                let mut byte = start;
                for op in ops.iter().chain(ops.iter()) {
                    let instruction = (byte as u32 + position) % OPCODE_PERIOD;
                    if op.is_nop() {
                        assert!(is_nop(instruction));
                    } else {
                        assert_eq!(instruction, *op as u32);
                    }
                    byte = translate(byte).unwrap();
                }
                assert_eq!(byte, start);
            }
        }
        assert!(found > 0);
    }

    #[test]
    fn test_missing_cycle() {
        let cycle = XlatCycle::Cycle(vec![Opcode::Jmp]);
        assert!((0..OPCODE_PERIOD).all(|p| start_symbol(&cycle, p).is_none()));
    }
}
