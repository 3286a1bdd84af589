//! Constant-generation planning
//!
//! Writing `destination` into a cell that holds `source` takes a single
//! combine with the right accumulator value. The planner finds that value and
//! estimates how cheaply it can be built from what the work cell of a
//! constant-generation module currently holds.

use trit_vm::{
    combine,
    constants::{C0, C1, C2, TRITS},
    rotate_right,
    trit::combine_trit,
    trit_distance, Word,
};

/// Constants that can be produced without touching a work cell
pub const FREE_CONSTANTS: [Word; 5] = [C0, C1, C2, C2 - 1, C2 - 2];

/// Rotation count reported for a free constant
pub const FULL_ROTATION: u32 = TRITS;

/// How to produce the accumulator value for a combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantPlan {
    /// Accumulator value that combines `source` into `destination`
    pub value: Word,
    /// Rotations of the work cell before trits are fixed; above ten means a
    /// full wrap is needed
    pub rotations: u32,
    /// Combine the work cell with C2 before fixing trits
    pub c2_first: bool,
}

pub fn is_free_constant(value: Word) -> bool {
    FREE_CONSTANTS.contains(&value)
}

/// Find `v` with `combine(v, source) == destination`.
///
/// Free constants are tried first. Otherwise every trit is solved on its own,
/// keeping the trit of `current` whenever it already works. Returns `None`
/// when some trit pair has no preimage.
pub fn best_source_for_combine(source: Word, destination: Word, current: Word) -> Option<Word> {
    if let Some(free) = FREE_CONSTANTS
        .iter()
        .copied()
        .find(|&c| combine(c, source) == destination)
    {
        return Some(free);
    }

    let (mut source, mut destination, mut current) = (source, destination, current);
    let mut result = 0;
    let mut weight = 1;

    for _ in 0..TRITS {
        let (s, d, c) = (source % 3, destination % 3, current % 3);
        let trit = if combine_trit(c, s) == d {
            c
        } else {
            (0..3).find(|&k| combine_trit(k, s) == d)?
        };
        result += trit * weight;
        weight *= 3;
        source /= 3;
        destination /= 3;
        current /= 3;
    }

    Some(result)
}

/// Choose the cheapest way to turn `source` into `destination`, given that
/// the work cell currently holds `current`.
///
/// Each of the ten rotations of the work cell is tried, both directly and
/// after a combine with C2. The estimated cost is nine per trit that still
/// has to be fixed plus three per rotation (ten extra when the rotation has
/// to wrap), and two more for the C2 pre-combine. The first minimum wins.
pub fn plan_constant(source: Word, destination: Word, current: Word) -> Option<ConstantPlan> {
    let value = best_source_for_combine(source, destination, current)?;
    if is_free_constant(value) {
        return Some(ConstantPlan {
            value,
            rotations: FULL_ROTATION,
            c2_first: false,
        });
    }

    let mut best = ConstantPlan {
        value,
        rotations: FULL_ROTATION,
        c2_first: false,
    };
    let mut min_cost = u32::MAX;
    let mut current = current;
    let mut mask = C1 - 1;

    for i in 0..TRITS {
        let constant = best_source_for_combine(source, destination, current)?;
        let through_c2 = combine(C2, current);

        let diff = trit_distance(constant, current, C1);
        let diff_c2 = trit_distance(constant, through_c2, C1);
        let wraps = trit_distance(constant, current, mask) != 0;
        let wraps_c2 = trit_distance(constant, through_c2, mask) != 0;

        let rotations = i + if wraps { TRITS } else { 0 };
        let rotations_c2 = i + if wraps_c2 { TRITS } else { 0 };

        let mut cost = diff * 9 + rotations * 3;
        let cost_c2 = diff_c2 * 9 + rotations_c2 * 3 + 2;

        // nothing to fix still needs the twofold C2 combine
        if cost == 0 {
            cost = 6;
        }

        if cost < min_cost {
            min_cost = cost;
            best = ConstantPlan {
                value: constant,
                rotations,
                c2_first: false,
            };
        }
        if cost_c2 < min_cost {
            min_cost = cost_c2;
            best = ConstantPlan {
                value: constant,
                rotations: rotations_c2,
                c2_first: true,
            };
        }

        current = rotate_right(current);
        if mask > 0 {
            mask = rotate_right(mask) - 1;
        }
    }

    Some(best)
}
