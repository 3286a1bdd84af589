//! Trinary algebra over ten-trit words
//!
//! Words are stored as plain integers; trit `k` is `(w / 3^k) % 3`.

use crate::constants::{MEMORY_SIZE, TRITS};

/// A ten-trit machine word in `0..59049`
pub type Word = u32;

/// Weight of the most significant trit (3^9)
const HIGH_TRIT: Word = 19683;

/// Result trit of the combine operator, indexed by `a_trit + 3 * d_trit`
const COMBINE_TABLE: [Word; 9] = [1, 0, 0, 1, 0, 2, 2, 2, 1];

/// Combine the accumulator `a` with the memory operand `d`, trit by trit.
///
/// This is the machine's only arithmetic operator. It is neither commutative
/// nor idempotent.
pub fn combine(a: Word, d: Word) -> Word {
    let (mut a, mut d) = (a, d);
    let mut out = 0;
    let mut weight = 1;

    for _ in 0..TRITS {
        out += weight * COMBINE_TABLE[(a % 3 + 3 * (d % 3)) as usize];
        a /= 3;
        d /= 3;
        weight *= 3;
    }

    out
}

/// Look up a single trit of the combine operator.
pub fn combine_trit(a: Word, d: Word) -> Word {
    COMBINE_TABLE[(a + 3 * d) as usize]
}

/// Rotate a word one trit to the right; the lowest trit becomes the highest.
pub fn rotate_right(x: Word) -> Word {
    x / 3 + (x % 3) * HIGH_TRIT
}

/// Rotate a word `n` trits to the left.
///
/// `n` is taken modulo ten.
pub fn rotate_left(x: Word, n: u32) -> Word {
    let n = n % TRITS;
    if n == 0 {
        return x;
    }
    (n..TRITS).fold(x, |acc, _| rotate_right(acc))
}

/// Count the trit positions where `a` and `b` differ, restricted to positions
/// where `mask` has a non-zero trit.
pub fn trit_distance(a: Word, b: Word, mask: Word) -> u32 {
    let (mut a, mut b, mut mask) = (a, b, mask);
    let mut count = 0;

    for _ in 0..TRITS {
        if mask % 3 != 0 && a % 3 != b % 3 {
            count += 1;
        }
        a /= 3;
        b /= 3;
        mask /= 3;
    }

    count
}

/// Reduce an arbitrary signed value into the word range.
pub fn normalize(value: i64) -> Word {
    value.rem_euclid(MEMORY_SIZE as i64) as Word
}
